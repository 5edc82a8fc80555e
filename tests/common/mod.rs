#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{Value, json};
use std::sync::Arc;

use marketpulse_backend::jobs::EngineConfig;
use marketpulse_backend::services::snapshot_store::{MemoryKvStore, SnapshotStore, keys};

pub fn store() -> SnapshotStore {
    SnapshotStore::new(Arc::new(MemoryKvStore::new()))
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Thresholds relaxed so small fixture snapshots pass plausibility checks.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        max_lookback_days: 7,
        min_snapshot_rows: 0,
    }
}

/// Seed a day's price snapshot, keeping the latest pointer and the date
/// index in step the way the ingestion side would.
pub async fn seed_day(store: &SnapshotStore, day: &str, rows: Value) {
    let doc = json!({"date": day, "rows": rows});
    store
        .put_raw(&keys::prices_for(date(day)), &doc)
        .await
        .unwrap();
    store.put_raw(keys::PRICES_LATEST, &doc).await.unwrap();

    let mut dates: Vec<String> = match store.get_raw(keys::PRICES_DATES).await.unwrap() {
        Some(Value::Array(entries)) => entries
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    dates.push(day.to_string());
    dates.sort();
    dates.dedup();
    store.put_raw(keys::PRICES_DATES, &json!(dates)).await.unwrap();
}

pub async fn seed_fundamentals(store: &SnapshotStore, items: Value) {
    store
        .put_raw(keys::FUNDAMENTALS_MANIFEST, &json!({"items": items}))
        .await
        .unwrap();
}

/// Strip the generated-at stamp, the only field allowed to differ between
/// reruns of the same day.
pub fn without_generated_at(mut doc: Value) -> Value {
    if let Some(object) = doc.as_object_mut() {
        object.remove("generatedAt");
    }
    doc
}
