//! Daily market pulse run, invoked once per trading day by the external
//! scheduler. Reads the latest snapshot, computes the pulse and the sector
//! table, and persists both. Rerunning the same day overwrites the same keys
//! with identical content (modulo the generated-at stamp), so retries are
//! safe.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::jobs::{EngineConfig, EngineError};
use crate::models::pulse::DailyPulse;
use crate::models::sector::SectorSnapshot;
use crate::services::fundamentals::FundamentalsService;
use crate::services::market_pulse::compute_daily_pulse;
use crate::services::prev_close::resolve_previous_closes;
use crate::services::sector_index::{build_sector_snapshot, fold_levels};
use crate::services::snapshot_store::{SnapshotStore, StoreError};

/// Outcome of one write attempt, reported per artifact.
#[derive(Debug, Clone)]
pub struct ArtifactWrite {
    pub ok: bool,
    pub error: Option<String>,
}

/// What a daily run produced and which writes landed. Partial success is a
/// valid outcome; consumers read the per-artifact fields, never a single
/// collapsed boolean. Pointer and date-index writes are None when they were
/// not attempted because the sector snapshot write failed.
#[derive(Debug)]
pub struct DailyRunReport {
    pub pulse: DailyPulse,
    pub sector: SectorSnapshot,
    pub pulse_write: ArtifactWrite,
    pub sector_write: ArtifactWrite,
    pub pointer_write: Option<ArtifactWrite>,
    pub date_index_write: Option<ArtifactWrite>,
}

impl DailyRunReport {
    pub fn failed_artifacts(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.pulse_write.ok {
            failed.push("pulse");
        }
        if !self.sector_write.ok {
            failed.push("sector snapshot");
        }
        if matches!(&self.pointer_write, Some(w) if !w.ok) {
            failed.push("latest sector pointer");
        }
        if matches!(&self.date_index_write, Some(w) if !w.ok) {
            failed.push("sector date index");
        }
        failed
    }
}

pub async fn run(
    store: &SnapshotStore,
    fundamentals: &FundamentalsService,
    config: &EngineConfig,
) -> Result<DailyRunReport, EngineError> {
    let snapshot = store
        .latest_price_snapshot()
        .await?
        .ok_or_else(|| EngineError::NotReady("no latest price snapshot".to_string()))?;

    let as_of = snapshot.date.ok_or_else(|| {
        EngineError::NotReady("latest price snapshot carries no trading date".to_string())
    })?;

    if snapshot.rows.len() <= config.min_snapshot_rows {
        return Err(EngineError::NotReady(format!(
            "latest snapshot for {} has only {} rows",
            as_of,
            snapshot.rows.len()
        )));
    }

    tracing::info!(
        "Running market pulse for {} over {} rows",
        as_of,
        snapshot.rows.len()
    );

    let reference = fundamentals.load(store).await;
    if reference.is_empty() {
        tracing::warn!(
            "No fundamentals available for {}, weighted figures will be degraded",
            as_of
        );
    }

    let prev = resolve_previous_closes(
        store,
        as_of,
        config.max_lookback_days,
        config.min_snapshot_rows,
    )
    .await?;

    // Seed the rolling sector levels from the most recent sector snapshot
    // strictly before today, so rerunning today never chains onto itself.
    let mut levels = HashMap::new();
    let prior_sector_date = store
        .sector_dates()
        .await?
        .into_iter()
        .filter(|d| *d < as_of)
        .max();
    if let Some(prior_date) = prior_sector_date {
        if let Some(prior) = store.sector_snapshot(prior_date).await? {
            fold_levels(&mut levels, &prior);
            tracing::debug!(
                "Seeded {} sector levels from {}",
                levels.len(),
                prior_date
            );
        }
    }

    let pulse = compute_daily_pulse(
        as_of,
        prev.prev_date_used,
        &snapshot.rows,
        &prev.by_code,
        &reference,
    );
    let sector = build_sector_snapshot(
        as_of,
        prev.prev_date_used,
        &snapshot.rows,
        &prev.by_code,
        &reference,
        &levels,
    );

    let pulse_write = record_write(store.write_pulse(&pulse).await, "pulse", as_of);
    let sector_write = record_write(
        store.write_sector_snapshot(&sector).await,
        "sector snapshot",
        as_of,
    );

    // The pointer and the date index only move once the snapshot they point
    // at actually landed.
    let (pointer_write, date_index_write) = if sector_write.ok {
        let pointer = record_write(
            store.set_latest_sector_date(as_of).await,
            "latest sector pointer",
            as_of,
        );
        let index = record_write(
            store.add_sector_date(as_of).await,
            "sector date index",
            as_of,
        );
        (Some(pointer), Some(index))
    } else {
        tracing::warn!(
            "Skipping sector pointer and date index for {}: snapshot write failed",
            as_of
        );
        (None, None)
    };

    let report = DailyRunReport {
        pulse,
        sector,
        pulse_write,
        sector_write,
        pointer_write,
        date_index_write,
    };

    let failed = report.failed_artifacts();
    if failed.is_empty() {
        tracing::info!(
            "Market pulse for {} persisted (advancers {}, decliners {}, flat {}, {} sectors)",
            as_of,
            report.pulse.advancers,
            report.pulse.decliners,
            report.pulse.flat,
            report.sector.sectors.len()
        );
    } else {
        tracing::error!(
            "Market pulse for {} completed with failed writes: {}",
            as_of,
            failed.join(", ")
        );
    }

    Ok(report)
}

fn record_write(result: Result<(), StoreError>, artifact: &str, date: NaiveDate) -> ArtifactWrite {
    match result {
        Ok(()) => ArtifactWrite {
            ok: true,
            error: None,
        },
        Err(e) => {
            tracing::error!("Failed to write {} for {}: {}", artifact, date, e);
            ArtifactWrite {
                ok: false,
                error: Some(e.to_string()),
            }
        }
    }
}
