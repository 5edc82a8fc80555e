use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::price_row::lenient_f64;

/// Latest-known fundamentals for one instrument, refreshed by an external
/// batch job. The engine only ever reads this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalsRecord {
    pub code: String,
    #[serde(default = "default_sector", deserialize_with = "de_sector")]
    pub sector: String,
    #[serde(default, deserialize_with = "de_lenient_cap")]
    pub market_cap: Option<f64>,
    /// Index membership arrives as 1, "1", true or "true" depending on which
    /// upstream job wrote the record; normalized to a strict bool here.
    #[serde(default, alias = "index_member", deserialize_with = "de_boolish")]
    pub index_member: bool,
}

impl FundamentalsRecord {
    /// Market cap usable for weighting, i.e. present and strictly positive.
    pub fn usable_market_cap(&self) -> Option<f64> {
        self.market_cap.filter(|m| *m > 0.0)
    }
}

fn default_sector() -> String {
    "Other".to_string()
}

fn de_sector<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let sector = match &value {
        Value::String(s) => s.trim().to_string(),
        _ => String::new(),
    };
    if sector.is_empty() || sector.eq_ignore_ascii_case("n/a") {
        Ok(default_sector())
    } else {
        Ok(sector)
    }
}

fn de_lenient_cap<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_f64(&value))
}

fn de_boolish<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(boolish(&value))
}

pub fn boolish(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true"),
        _ => false,
    }
}
