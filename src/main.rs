use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketpulse_backend::jobs::{EngineConfig, EngineError, daily_pulse_sync};
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

    let base_url = env::var("KV_REST_URL").expect("KV_REST_URL must be set");
    let token = env::var("KV_REST_TOKEN").expect("KV_REST_TOKEN must be set");

    let store = SnapshotStore::new(Arc::new(RestKvStore::new(base_url, token)));
    let fundamentals = FundamentalsService::new();

    let mut config = EngineConfig::default();
    if let Ok(days) = env::var("MAX_LOOKBACK_DAYS") {
        config.max_lookback_days = days.parse()?;
    }

    match daily_pulse_sync::run(&store, &fundamentals, &config).await {
        Ok(report) => {
            let failed = report.failed_artifacts();
            if failed.is_empty() {
                tracing::info!("Daily pulse run for {} succeeded", report.pulse.as_of_date);
                Ok(())
            } else {
                // Exit nonzero so the scheduler retries; the per-date keys
                // make the retry an idempotent overwrite.
                Err(format!("failed writes: {}", failed.join(", ")).into())
            }
        }
        Err(EngineError::NotReady(reason)) => {
            tracing::warn!("Skipping run, input not ready: {}", reason);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Daily pulse run failed: {}", e);
            Err(e.into())
        }
    }
}
