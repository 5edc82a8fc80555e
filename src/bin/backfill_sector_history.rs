use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketpulse_backend::jobs::{EngineConfig, sector_backfill};
use marketpulse_backend::services::fundamentals::FundamentalsService;
use marketpulse_backend::services::snapshot_store::{RestKvStore, SnapshotStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marketpulse_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // --force recomputes days that already have a stored sector snapshot.
    let force = env::args().any(|arg| arg == "--force");

    let base_url = env::var("KV_REST_URL").expect("KV_REST_URL must be set");
    let token = env::var("KV_REST_TOKEN").expect("KV_REST_TOKEN must be set");

    let store = SnapshotStore::new(Arc::new(RestKvStore::new(base_url, token)));
    let fundamentals = FundamentalsService::new();
    let config = EngineConfig::default();

    tracing::info!("Starting sector history backfill (force = {})", force);

    match sector_backfill::run(&store, &fundamentals, &config, force).await {
        Ok(summary) => {
            tracing::info!(
                "Backfill finished through {:?}: {} computed, {} absorbed, {} skipped, {} failed",
                summary.last_date,
                summary.computed,
                summary.absorbed,
                summary.skipped,
                summary.failed
            );
            if summary.failed > 0 {
                return Err(format!("{} days failed to write", summary.failed).into());
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Sector backfill failed: {}", e);
            Err(e.into())
        }
    }
}
