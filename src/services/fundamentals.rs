//! Fundamentals reference loader.
//!
//! The reference table is refreshed out-of-band and may be stored either as
//! one merged document or sharded into partitions behind a manifest. Both
//! shapes resolve to a single code -> record map here so nothing downstream
//! knows about the sharding.

use moka::future::Cache;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::fundamentals::FundamentalsRecord;
use crate::models::price_row::normalize_code;
use crate::services::snapshot_store::{SnapshotStore, keys};

const CACHE_KEY: &str = "reference";

#[derive(Clone)]
pub struct FundamentalsService {
    cache: Arc<Cache<String, Arc<HashMap<String, FundamentalsRecord>>>>,
}

impl FundamentalsService {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(4)
            .time_to_live(Duration::from_secs(3600)) // upstream refresh cadence is hours
            .build();

        Self {
            cache: Arc::new(cache),
        }
    }

    /// Load the reference map through the TTL cache. Missing or partially
    /// missing reference data degrades to a smaller (possibly empty) map and
    /// is never an error; an empty result is not cached so the next run
    /// retries the fetch.
    pub async fn load(&self, store: &SnapshotStore) -> Arc<HashMap<String, FundamentalsRecord>> {
        if let Some(cached) = self.cache.get(CACHE_KEY).await {
            tracing::debug!("Fundamentals cache hit ({} records)", cached.len());
            return cached;
        }

        let loaded = Arc::new(load_fundamentals(store).await);
        if !loaded.is_empty() {
            self.cache
                .insert(CACHE_KEY.to_string(), loaded.clone())
                .await;
        }
        loaded
    }
}

impl Default for FundamentalsService {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the manifest to a flat map. If the manifest carries an `items`
/// array it is used directly; otherwise its `parts`/`partKeys` list names
/// the partitions to fetch and concatenate.
pub async fn load_fundamentals(store: &SnapshotStore) -> HashMap<String, FundamentalsRecord> {
    let manifest = match store.get_raw(keys::FUNDAMENTALS_MANIFEST).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            tracing::warn!("No fundamentals manifest found, continuing without reference data");
            return HashMap::new();
        }
        Err(e) => {
            tracing::warn!("Failed to read fundamentals manifest: {}", e);
            return HashMap::new();
        }
    };

    let mut map = HashMap::new();

    if let Some(items) = manifest.get("items").and_then(Value::as_array) {
        absorb_items(&mut map, items);
        tracing::info!("Loaded {} fundamentals records from merged document", map.len());
        return map;
    }

    let part_keys: Vec<String> = manifest
        .get("parts")
        .or_else(|| manifest.get("partKeys"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if part_keys.is_empty() {
        tracing::warn!("Fundamentals manifest has neither items nor partition keys");
        return map;
    }

    for part_key in &part_keys {
        match store.get_raw(part_key).await {
            Ok(Some(part)) => {
                let items = part
                    .get("items")
                    .and_then(Value::as_array)
                    .or_else(|| part.as_array());
                match items {
                    Some(items) => absorb_items(&mut map, items),
                    None => tracing::warn!(
                        "Fundamentals partition {} has an unexpected shape, skipping",
                        part_key
                    ),
                }
            }
            Ok(None) => tracing::warn!("Fundamentals partition {} is missing, skipping", part_key),
            Err(e) => tracing::warn!("Failed to read fundamentals partition {}: {}", part_key, e),
        }
    }

    tracing::info!(
        "Loaded {} fundamentals records from {} partitions",
        map.len(),
        part_keys.len()
    );
    map
}

fn absorb_items(map: &mut HashMap<String, FundamentalsRecord>, items: &[Value]) {
    for item in items {
        match serde_json::from_value::<FundamentalsRecord>(item.clone()) {
            Ok(record) => {
                let code = normalize_code(&record.code);
                if code.is_empty() {
                    continue;
                }
                // Last record wins if a code shows up in multiple partitions.
                map.insert(code, record);
            }
            Err(e) => tracing::debug!("Skipping malformed fundamentals item: {}", e),
        }
    }
}
