//! Historical re-derivation of the sector index chain.
//!
//! Walks every stored snapshot date in ascending order, threading the
//! rolling level map forward exactly as consecutive daily runs would have.
//! A day that is already computed (and not forced) is not recomputed, but
//! its stored levels are still folded into the chain so later days stay
//! consistent.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::jobs::{EngineConfig, EngineError};
use crate::services::fundamentals::FundamentalsService;
use crate::services::prev_close::resolve_previous_closes;
use crate::services::sector_index::{build_sector_snapshot, fold_levels};
use crate::services::snapshot_store::SnapshotStore;

#[derive(Debug, Default)]
pub struct BackfillSummary {
    /// Days computed and written this run.
    pub computed: u32,
    /// Days whose existing snapshot was absorbed without recomputation.
    pub absorbed: u32,
    /// Indexed days skipped because their price snapshot was missing or suspect.
    pub skipped: u32,
    /// Days whose sector snapshot write failed.
    pub failed: u32,
    pub last_date: Option<NaiveDate>,
}

pub async fn run(
    store: &SnapshotStore,
    fundamentals: &FundamentalsService,
    config: &EngineConfig,
    force: bool,
) -> Result<BackfillSummary, EngineError> {
    let mut dates = store.price_dates().await?;
    dates.sort();
    dates.dedup();

    if dates.is_empty() {
        return Err(EngineError::NotReady(
            "no stored price snapshot dates to backfill".to_string(),
        ));
    }

    tracing::info!(
        "Backfilling sector history over {} days ({} to {}), force = {}",
        dates.len(),
        dates[0],
        dates[dates.len() - 1],
        force
    );

    let reference = fundamentals.load(store).await;
    if reference.is_empty() {
        tracing::warn!("No fundamentals available, backfilled sector tables will be degraded");
    }

    let mut levels: HashMap<String, f64> = HashMap::new();
    let mut summary = BackfillSummary::default();

    for date in dates {
        if !force {
            if let Some(existing) = store.sector_snapshot(date).await? {
                fold_levels(&mut levels, &existing);
                summary.absorbed += 1;
                summary.last_date = Some(date);
                continue;
            }
        }

        let snapshot = match store.price_snapshot(date).await? {
            Some(snapshot) => snapshot,
            None => {
                tracing::warn!("Price snapshot for {} is indexed but missing, skipping", date);
                summary.skipped += 1;
                continue;
            }
        };

        if snapshot.rows.len() <= config.min_snapshot_rows {
            tracing::warn!(
                "Price snapshot for {} has only {} rows, skipping as suspect",
                date,
                snapshot.rows.len()
            );
            summary.skipped += 1;
            continue;
        }

        let prev = resolve_previous_closes(
            store,
            date,
            config.max_lookback_days,
            config.min_snapshot_rows,
        )
        .await?;

        let sector = build_sector_snapshot(
            date,
            prev.prev_date_used,
            &snapshot.rows,
            &prev.by_code,
            &reference,
            &levels,
        );
        fold_levels(&mut levels, &sector);

        match store.write_sector_snapshot(&sector).await {
            Ok(()) => {
                summary.computed += 1;
                summary.last_date = Some(date);
                if let Err(e) = store.add_sector_date(date).await {
                    tracing::error!("Failed to index sector date {}: {}", date, e);
                }
                if let Err(e) = store.set_latest_sector_date(date).await {
                    tracing::error!("Failed to update latest sector pointer to {}: {}", date, e);
                }
            }
            Err(e) => {
                // The in-memory chain has already advanced, so later days
                // still line up; only this day's document is missing.
                tracing::error!("Failed to write sector snapshot for {}: {}", date, e);
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        "Sector backfill complete: {} computed, {} absorbed, {} skipped, {} failed",
        summary.computed,
        summary.absorbed,
        summary.skipped,
        summary.failed
    );

    Ok(summary)
}
