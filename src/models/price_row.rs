use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One instrument's end-of-day row inside a price snapshot.
///
/// Snapshots are written by an upstream fetcher whose JSON is not strictly
/// typed (numbers sometimes arrive as strings), so every numeric field is
/// parsed leniently and kept optional. A value that cannot be read becomes
/// None, never zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRow {
    pub code: String,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub close: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub volume: Option<f64>,
    /// Pre-computed 1-day percent change carried by some feeds.
    #[serde(default, alias = "change", deserialize_with = "de_lenient_f64")]
    pub change_pct: Option<f64>,
    /// Trading date on the row itself; the snapshot's date is authoritative.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl PriceRow {
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.code)
    }
}

/// A full day's snapshot as persisted: the trading date plus every row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub rows: Vec<PriceRow>,
}

/// Strip any exchange suffix ("RELIANCE.NS" -> "RELIANCE") and uppercase.
pub fn normalize_code(raw: &str) -> String {
    let base = raw.split('.').next().unwrap_or(raw);
    base.trim().to_uppercase()
}

/// Read a number that may arrive as a JSON number or a numeric string.
/// Anything else, including non-finite values, is None.
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

pub fn de_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_f64(&value))
}
