//! Engine facade wiring location, ranking and achievement components over one
//! database.

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::achievements::{
    AchievementError, AchievementEvaluator, RegionalAchievement, UserRegionalAchievement,
};
use crate::clock::{Clock, SystemClock};
use crate::geo::{
    GeocodingError, GeocodingProvider, LocationError, LocationInput, LocationResolver,
    NominatimGeocoder, UserLocation,
};
use crate::progress::{CachedProgressStore, ProfileStore, ProgressStore};
use crate::rankings::{
    Period, RankedPlayer, RankingCalculator, RankingError, RankingReader, RankingScope,
    RecomputeSummary, UserStanding,
};
use crate::storage::{
    AchievementStore, AppConfig, Database, DatabaseError, LocationStore, RankingStore,
    SqliteProfileStore, SqliteProgressStore,
};

/// Clock shared by every component of one engine.
pub type SharedClock = Arc<dyn Clock>;

type Cached<P> = CachedProgressStore<Arc<P>, SharedClock>;

/// Result of a full recompute cycle.
#[derive(Debug, Clone, Serialize)]
pub struct RecomputeReport {
    pub summary: RecomputeSummary,
    /// Achievements unlocked by the evaluation that followed
    pub unlocked: Vec<UserRegionalAchievement>,
}

/// Application-level entry point.
pub struct RankingEngine<P, F, G> {
    resolver: LocationResolver<G, SharedClock>,
    progress: Arc<Cached<P>>,
    calculator: Arc<RankingCalculator<Cached<P>, SharedClock>>,
    evaluator: AchievementEvaluator<Cached<P>, SharedClock>,
    reader: RankingReader<P, F, Cached<P>, SharedClock>,
    rankings: RankingStore,
}

impl RankingEngine<SqliteProgressStore, SqliteProfileStore, NominatimGeocoder> {
    /// Open the configured database with the bundled SQLite collaborators.
    pub fn open(config: &AppConfig) -> Result<Self, EngineError> {
        let db = Arc::new(Database::open(&config.database_path())?);
        let progress = Arc::new(SqliteProgressStore::new(db.clone()));
        let profiles = Arc::new(SqliteProfileStore::new(db.clone()));
        let geocoder = NominatimGeocoder::new(&config.geocoding)?;

        Self::new(db, progress, profiles, geocoder, config)
    }
}

impl<P, F, G> RankingEngine<P, F, G>
where
    P: ProgressStore,
    F: ProfileStore,
    G: GeocodingProvider,
{
    pub fn new(
        db: Arc<Database>,
        progress: Arc<P>,
        profiles: Arc<F>,
        geocoder: G,
        config: &AppConfig,
    ) -> Result<Self, EngineError> {
        Self::with_clock(db, progress, profiles, geocoder, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: Arc<Database>,
        progress: Arc<P>,
        profiles: Arc<F>,
        geocoder: G,
        config: &AppConfig,
        clock: SharedClock,
    ) -> Result<Self, EngineError> {
        let locations = LocationStore::new(db.clone());
        let rankings = RankingStore::new(db.clone());

        let cached = Arc::new(CachedProgressStore::with_clock(
            progress.clone(),
            Duration::seconds(config.cache.points_ttl_secs),
            clock.clone(),
        ));

        let calculator = Arc::new(
            RankingCalculator::with_clock(
                cached.clone(),
                locations.clone(),
                rankings.clone(),
                clock.clone(),
            )
            .with_batch_size(config.rankings.batch_size),
        );

        let evaluator = AchievementEvaluator::with_clock(
            AchievementStore::new(db),
            rankings.clone(),
            locations.clone(),
            cached.clone(),
            clock.clone(),
        );
        evaluator.seed_defaults()?;

        let reader = RankingReader::new(
            rankings.clone(),
            locations.clone(),
            progress,
            profiles,
            calculator.clone(),
        )
        .with_top_k(config.rankings.top_k);

        let resolver = LocationResolver::with_clock(geocoder, locations, clock);

        Ok(Self {
            resolver,
            progress: cached,
            calculator,
            evaluator,
            reader,
            rankings,
        })
    }

    /// Resolve a location and store it for the user.
    pub async fn resolve_and_save_location(
        &self,
        user_id: Uuid,
        input: &LocationInput,
    ) -> Result<UserLocation, EngineError> {
        Ok(self.resolver.resolve_and_save(user_id, input).await?)
    }

    pub fn location_for(&self, user_id: Uuid) -> Result<Option<UserLocation>, EngineError> {
        Ok(self.resolver.location_for(user_id)?)
    }

    /// Recompute every partition, then evaluate achievements for every
    /// ranked user. Nothing is evaluated if the recompute fails.
    pub async fn recompute_all_rankings(&self) -> Result<RecomputeReport, EngineError> {
        let summary = self.calculator.recompute().await?;

        let users = self.rankings.ranked_users(Period::AllTime)?;
        let unlocked = self.evaluator.evaluate_all(&users).await;
        if !unlocked.is_empty() {
            tracing::info!("Unlocked {} achievements", unlocked.len());
        }

        Ok(RecomputeReport { summary, unlocked })
    }

    pub async fn get_ranking(&self, scope: &RankingScope) -> Result<Vec<RankedPlayer>, EngineError> {
        Ok(self.reader.fetch_ranking(scope).await?)
    }

    pub async fn get_user_standing(&self, user_id: Uuid) -> Result<UserStanding, EngineError> {
        Ok(self.reader.user_standing(user_id).await?)
    }

    /// Delete every stored ranking. The next read recomputes.
    pub fn clear_rankings(&self) -> Result<usize, EngineError> {
        let removed = self.rankings.clear()?;
        self.progress.invalidate_all();
        tracing::info!("Cleared {} ranking rows", removed);
        Ok(removed)
    }

    pub fn user_achievements(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserRegionalAchievement>, EngineError> {
        Ok(self.evaluator.unlocked_for(user_id)?)
    }

    pub fn achievement_catalog(&self) -> Result<Vec<RegionalAchievement>, EngineError> {
        Ok(self.evaluator.catalog()?)
    }
}

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Ranking(#[from] RankingError),

    #[error(transparent)]
    Achievement(#[from] AchievementError),

    #[error(transparent)]
    Geocoding(#[from] GeocodingError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
