//! Key-value access to the price, pulse and sector documents.
//!
//! The hosting environment provides an Upstash-style Redis REST endpoint;
//! tests and local runs use the in-memory implementation. Everything here is
//! plain get/put on JSON documents, no business logic.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::price_row::PriceSnapshot;
use crate::models::pulse::DailyPulse;
use crate::models::sector::SectorSnapshot;

/// Key names for the documents the engine reads and writes.
pub mod keys {
    use chrono::NaiveDate;

    pub const PRICES_LATEST: &str = "prices:latest";
    pub const PRICES_DATES: &str = "prices:dates";
    pub const FUNDAMENTALS_MANIFEST: &str = "fundamentals:manifest";
    pub const SECTOR_LATEST: &str = "sector:latest";
    pub const SECTOR_DATES: &str = "sector:dates";

    pub fn prices_for(date: NaiveDate) -> String {
        format!("prices:{}", date)
    }

    pub fn pulse_for(date: NaiveDate) -> String {
        format!("pulse:{}", date)
    }

    pub fn sector_for(date: NaiveDate) -> String {
        format!("sector:{}", date)
    }
}

#[derive(Debug)]
pub enum StoreError {
    Http(String),
    Decode(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Http(msg) => write!(f, "Store request failed: {}", msg),
            StoreError::Decode(msg) => write!(f, "Stored document invalid: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Minimal get/put contract every backing store satisfies.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn put_json(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}

/// In-memory store for tests and local runs.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put_json(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// Upstash-style Redis REST client. Values are stored as stringified JSON;
/// GET responses arrive wrapped in a `{"result": ...}` envelope.
pub struct RestKvStore {
    client: Client,
    base_url: String,
    token: String,
}

impl RestKvStore {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl KvStore for RestKvStore {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let url = format!("{}/get/{}", self.base_url, key);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| StoreError::Http(format!("GET {}: {}", key, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(StoreError::Http(format!("GET {} returned {}", key, status)));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("GET {}: {}", key, e)))?;

        match envelope.get("result") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| StoreError::Decode(format!("key {}: {}", key, e))),
            Some(other) => Ok(Some(other.clone())),
        }
    }

    async fn put_json(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let url = format!("{}/set/{}", self.base_url, key);
        let body = serde_json::to_string(value)
            .map_err(|e| StoreError::Decode(format!("key {}: {}", key, e)))?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Http(format!("SET {}: {}", key, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(StoreError::Http(format!("SET {} returned {}", key, status)));
        }

        Ok(())
    }
}

/// Typed access to the engine's documents over any `KvStore`.
#[derive(Clone)]
pub struct SnapshotStore {
    kv: Arc<dyn KvStore>,
}

impl SnapshotStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.kv.get_json(key).await
    }

    pub async fn put_raw(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.kv.put_json(key, value).await
    }

    pub async fn latest_price_snapshot(&self) -> Result<Option<PriceSnapshot>, StoreError> {
        self.get_doc(keys::PRICES_LATEST).await
    }

    pub async fn price_snapshot(&self, date: NaiveDate) -> Result<Option<PriceSnapshot>, StoreError> {
        self.get_doc(&keys::prices_for(date)).await
    }

    /// Dates with a stored price snapshot, as maintained by the ingestion
    /// side. Unparseable entries are dropped with a warning.
    pub async fn price_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        self.date_list(keys::PRICES_DATES).await
    }

    pub async fn write_pulse(&self, pulse: &DailyPulse) -> Result<(), StoreError> {
        self.put_doc(&keys::pulse_for(pulse.as_of_date), pulse).await
    }

    pub async fn pulse(&self, date: NaiveDate) -> Result<Option<DailyPulse>, StoreError> {
        self.get_doc(&keys::pulse_for(date)).await
    }

    pub async fn sector_snapshot(&self, date: NaiveDate) -> Result<Option<SectorSnapshot>, StoreError> {
        self.get_doc(&keys::sector_for(date)).await
    }

    pub async fn write_sector_snapshot(&self, snapshot: &SectorSnapshot) -> Result<(), StoreError> {
        self.put_doc(&keys::sector_for(snapshot.date), snapshot).await
    }

    pub async fn latest_sector_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        match self.kv.get_json(keys::SECTOR_LATEST).await? {
            Some(Value::String(raw)) => match raw.parse::<NaiveDate>() {
                Ok(date) => Ok(Some(date)),
                Err(_) => {
                    tracing::warn!("Ignoring unparseable latest sector date {:?}", raw);
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    pub async fn set_latest_sector_date(&self, date: NaiveDate) -> Result<(), StoreError> {
        self.kv
            .put_json(keys::SECTOR_LATEST, &Value::String(date.to_string()))
            .await
    }

    pub async fn sector_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        self.date_list(keys::SECTOR_DATES).await
    }

    /// Read-modify-write upsert into the sector date set, kept sorted and
    /// deduplicated. The engine is the sole writer of this key.
    pub async fn add_sector_date(&self, date: NaiveDate) -> Result<(), StoreError> {
        let mut dates = self.sector_dates().await?;
        dates.push(date);
        dates.sort();
        dates.dedup();

        let value = Value::Array(
            dates
                .iter()
                .map(|d| Value::String(d.to_string()))
                .collect(),
        );
        self.kv.put_json(keys::SECTOR_DATES, &value).await
    }

    async fn date_list(&self, key: &str) -> Result<Vec<NaiveDate>, StoreError> {
        let entries = match self.kv.get_json(key).await? {
            Some(Value::Array(entries)) => entries,
            _ => return Ok(Vec::new()),
        };

        let mut dates = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.as_str().map(str::parse::<NaiveDate>) {
                Some(Ok(date)) => dates.push(date),
                _ => tracing::warn!("Dropping unparseable entry in {}: {:?}", key, entry),
            }
        }
        Ok(dates)
    }

    async fn get_doc<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv.get_json(key).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Decode(format!("key {}: {}", key, e))),
        }
    }

    async fn put_doc<T: Serialize>(&self, key: &str, doc: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)
            .map_err(|e| StoreError::Decode(format!("key {}: {}", key, e)))?;
        self.kv.put_json(key, &value).await
    }
}
