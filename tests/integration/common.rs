//! Shared fixtures: collaborator doubles, an engine harness and a stub HTTP server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use podium::geo::{GeocodeResult, GeocodingError, GeocodingProvider};
use podium::progress::{PointsRecord, ProgressStore, StoreError};
use podium::storage::{Database, SqliteProfileStore, SqliteProgressStore};
use podium::{AppConfig, RankingEngine};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

/// SQLite progress store that can be switched into a failing state.
pub struct FlakyProgress {
    inner: SqliteProgressStore,
    failing: AtomicBool,
}

impl FlakyProgress {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            inner: SqliteProgressStore::new(db),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_points(&self, user_id: Uuid, total_points: u32) {
        self.inner.set_points(user_id, total_points).unwrap();
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("progress service down".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ProgressStore for FlakyProgress {
    async fn all_points(&self) -> Result<Vec<PointsRecord>, StoreError> {
        self.check()?;
        self.inner.all_points().await
    }

    async fn points_for(&self, user_id: Uuid) -> Result<Option<PointsRecord>, StoreError> {
        self.check()?;
        self.inner.points_for(user_id).await
    }

    async fn points_for_many(&self, user_ids: &[Uuid]) -> Result<Vec<PointsRecord>, StoreError> {
        self.check()?;
        self.inner.points_for_many(user_ids).await
    }

    async fn add_points(&self, user_id: Uuid, delta: u32) -> Result<PointsRecord, StoreError> {
        self.check()?;
        self.inner.add_points(user_id, delta).await
    }
}

/// Geocoder that always answers with the same subdivision code.
pub struct StaticGeocoder(pub Option<&'static str>);

impl GeocodingProvider for StaticGeocoder {
    async fn reverse(&self, _lat: f64, _lon: f64) -> Result<GeocodeResult, GeocodingError> {
        Ok(GeocodeResult {
            subdivision_name: None,
            subdivision_code: self.0.map(str::to_string),
            locality: Some("Belo Horizonte".to_string()),
            postal_code: Some("30130-010".to_string()),
        })
    }
}

pub struct Harness {
    pub engine: RankingEngine<FlakyProgress, SqliteProfileStore, StaticGeocoder>,
    pub progress: Arc<FlakyProgress>,
    pub profiles: Arc<SqliteProfileStore>,
}

pub fn harness(geocoder: StaticGeocoder) -> Harness {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let progress = Arc::new(FlakyProgress::new(db.clone()));
    let profiles = Arc::new(SqliteProfileStore::new(db.clone()));
    let engine = RankingEngine::new(
        db,
        progress.clone(),
        profiles.clone(),
        geocoder,
        &AppConfig::default(),
    )
    .unwrap();

    Harness {
        engine,
        progress,
        profiles,
    }
}

/// Start a one-response-per-connection HTTP server. Returns its base URL
/// and the request lines it has received.
pub async fn serve(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let mut read = 0;
            while read < buf.len() {
                let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                read += n;
                if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }

            let request = String::from_utf8_lossy(&buf[..read]).to_string();
            let request_line = request.lines().next().unwrap_or_default().to_string();
            seen.lock().unwrap().push(request_line);

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), requests)
}
