//! Previous-close resolution.
//!
//! Walks backward from the target date one calendar day at a time until a
//! plausible snapshot turns up. Weekends and holidays have no stored
//! snapshot and fall through naturally; no exchange-calendar logic here.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::services::snapshot_store::{SnapshotStore, StoreError};

/// Default bound on the backward walk, in calendar days. Caps store round
/// trips over long holiday runs.
pub const DEFAULT_MAX_LOOKBACK_DAYS: u32 = 7;

/// A candidate snapshot must carry more rows than this before it is trusted
/// as a comparison baseline; a partially written day stays untrusted.
pub const MIN_PLAUSIBLE_ROWS: usize = 10;

/// Previous closes keyed by normalized code, plus the date they came from.
/// Both stay empty when no day within the bound qualifies, which is a valid
/// outcome: every percent change that day is simply null.
#[derive(Debug, Clone, Default)]
pub struct PrevCloses {
    pub by_code: HashMap<String, f64>,
    pub prev_date_used: Option<NaiveDate>,
}

pub async fn resolve_previous_closes(
    store: &SnapshotStore,
    as_of: NaiveDate,
    max_lookback_days: u32,
    min_rows: usize,
) -> Result<PrevCloses, StoreError> {
    for offset in 1..=max_lookback_days as i64 {
        let candidate = as_of - chrono::Duration::days(offset);

        let snapshot = match store.price_snapshot(candidate).await? {
            Some(snapshot) => snapshot,
            None => continue,
        };

        if snapshot.rows.len() <= min_rows {
            tracing::warn!(
                "Snapshot for {} has only {} rows, treating as suspect and walking past it",
                candidate,
                snapshot.rows.len()
            );
            continue;
        }

        let mut by_code = HashMap::new();
        for row in &snapshot.rows {
            if let Some(close) = row.close {
                if close > 0.0 {
                    by_code.insert(row.normalized_code(), close);
                }
            }
        }

        tracing::debug!(
            "Using {} as previous-close baseline for {} ({} instruments)",
            candidate,
            as_of,
            by_code.len()
        );
        return Ok(PrevCloses {
            by_code,
            prev_date_used: Some(candidate),
        });
    }

    tracing::info!(
        "No usable previous snapshot within {} days of {}",
        max_lookback_days,
        as_of
    );
    Ok(PrevCloses::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::snapshot_store::{MemoryKvStore, keys};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn store() -> SnapshotStore {
        SnapshotStore::new(Arc::new(MemoryKvStore::new()))
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn seed(store: &SnapshotStore, day: &str, rows: Value) {
        store
            .put_raw(&keys::prices_for(date(day)), &json!({"date": day, "rows": rows}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_walks_past_missing_days_to_nearest_snapshot() {
        let store = store();
        // Friday snapshot; Saturday/Sunday have nothing stored.
        seed(&store, "2025-07-04", json!([{"code": "AAA", "close": 100}])).await;

        let prev = resolve_previous_closes(&store, date("2025-07-07"), 7, 0)
            .await
            .unwrap();

        assert_eq!(prev.prev_date_used, Some(date("2025-07-04")));
        assert_eq!(prev.by_code["AAA"], 100.0);
    }

    #[tokio::test]
    async fn test_stops_at_first_accepted_day() {
        let store = store();
        seed(&store, "2025-07-03", json!([{"code": "AAA", "close": 90}])).await;
        seed(&store, "2025-07-04", json!([{"code": "AAA", "close": 100}])).await;

        let prev = resolve_previous_closes(&store, date("2025-07-05"), 7, 0)
            .await
            .unwrap();

        assert_eq!(prev.prev_date_used, Some(date("2025-07-04")));
        assert_eq!(prev.by_code["AAA"], 100.0);
    }

    #[tokio::test]
    async fn test_suspect_small_snapshot_is_walked_past() {
        let store = store();
        // One-row day looks like a partial write when the threshold is 1.
        seed(&store, "2025-07-04", json!([{"code": "AAA", "close": 100}])).await;
        seed(
            &store,
            "2025-07-03",
            json!([{"code": "AAA", "close": 90}, {"code": "BBB", "close": 50}]),
        )
        .await;

        let prev = resolve_previous_closes(&store, date("2025-07-05"), 7, 1)
            .await
            .unwrap();

        assert_eq!(prev.prev_date_used, Some(date("2025-07-03")));
        assert_eq!(prev.by_code["AAA"], 90.0);
    }

    #[tokio::test]
    async fn test_exhausted_lookback_is_empty_not_an_error() {
        let store = store();
        seed(&store, "2025-06-20", json!([{"code": "AAA", "close": 100}])).await;

        let prev = resolve_previous_closes(&store, date("2025-07-07"), 7, 0)
            .await
            .unwrap();

        assert!(prev.by_code.is_empty());
        assert_eq!(prev.prev_date_used, None);
    }

    #[tokio::test]
    async fn test_rows_without_positive_close_are_dropped() {
        let store = store();
        seed(
            &store,
            "2025-07-04",
            json!([
                {"code": "AAA", "close": 100},
                {"code": "BBB"},
                {"code": "CCC", "close": 0},
            ]),
        )
        .await;

        let prev = resolve_previous_closes(&store, date("2025-07-05"), 7, 0)
            .await
            .unwrap();

        assert_eq!(prev.by_code.len(), 1);
        assert!(prev.by_code.contains_key("AAA"));
    }
}
