//! Podium - Geographic Ranking and Achievement Engine
//!
//! Command line entry point.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use podium::geo::GpsReading;
use podium::storage::config::{get_config_path, get_data_dir, load_config, load_config_from};
use podium::{LocationInput, MacroRegion, RankingEngine, RankingScope, StateCode};

#[derive(Parser, Debug)]
#[command(name = "podium", version, about = "Regional leaderboards and achievements")]
struct Cli {
    /// Config file (defaults to config.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Resolve and store a user's location
    Locate {
        user: Uuid,
        /// Latitude of a GPS fix
        #[arg(long, requires = "lon", conflicts_with = "state", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude of a GPS fix
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Two-letter state code for manual entry
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
    },
    /// Recompute every leaderboard and evaluate achievements
    Recompute,
    /// Print one leaderboard
    Ranking {
        /// national, a macro-region name, or a state code
        #[arg(default_value = "national")]
        scope: String,
    },
    /// Print a user's standing in every tier
    Standing { user: Uuid },
    /// List a user's achievements, or the catalogue when no user is given
    Achievements { user: Option<Uuid> },
    /// Delete every stored ranking
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from(path, get_data_dir())
            .with_context(|| format!("loading {}", path.display()))?,
        None => load_config()
            .with_context(|| format!("loading {}", get_config_path().display()))?,
    };

    tracing::info!("Starting Podium v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(database = %config.database_path().display(), "Opening engine");

    let engine = RankingEngine::open(&config).context("opening engine")?;

    match cli.command {
        Commands::Locate {
            user,
            lat,
            lon,
            state,
            city,
            postal_code,
        } => {
            let input = match (lat, lon, state) {
                (Some(latitude), Some(longitude), _) => {
                    LocationInput::Gps(GpsReading::Fix { latitude, longitude })
                }
                (_, _, Some(state)) => LocationInput::Manual {
                    state,
                    city,
                    postal_code,
                },
                _ => bail!("either --lat/--lon or --state is required"),
            };

            match engine.resolve_and_save_location(user, &input).await {
                Ok(location) => print_json(&location)?,
                Err(podium::EngineError::Location(e)) if e.is_unavailable() => {
                    bail!("{} ({})", e.user_message(), e)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Recompute => {
            let report = engine.recompute_all_rankings().await?;
            print_json(&report)?;
        }
        Commands::Ranking { scope } => {
            let scope = parse_scope(&scope)?;
            let players = engine.get_ranking(&scope).await?;
            print_json(&players)?;
        }
        Commands::Standing { user } => {
            let standing = engine.get_user_standing(user).await?;
            print_json(&standing)?;
        }
        Commands::Achievements { user: Some(user) } => {
            print_json(&engine.user_achievements(user)?)?;
        }
        Commands::Achievements { user: None } => {
            print_json(&engine.achievement_catalog()?)?;
        }
        Commands::Clear => {
            let removed = engine.clear_rankings()?;
            println!("Removed {} ranking rows", removed);
        }
    }

    Ok(())
}

/// `national`, a macro-region name such as `Nordeste`, or a state code such as `PE`.
fn parse_scope(raw: &str) -> Result<RankingScope> {
    if raw.eq_ignore_ascii_case("national") || raw.eq_ignore_ascii_case("brasil") {
        return Ok(RankingScope::National);
    }
    if let Some(region) = MacroRegion::parse_known(raw) {
        return Ok(RankingScope::Regional(region));
    }
    if raw == MacroRegion::Unknown.as_str() {
        return Ok(RankingScope::Regional(MacroRegion::Unknown));
    }
    match StateCode::parse(raw) {
        Some(state) => Ok(RankingScope::Local(state)),
        None => bail!("empty ranking scope"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
