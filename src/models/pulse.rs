use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market-cap-weighted approximate index return.
///
/// `constituents_used` is a data-quality signal: it lets a consumer tell
/// "the market was flat" apart from "we had no coverage".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexApprox {
    pub pct: Option<f64>,
    pub constituents_used: u32,
}

/// One entry in the top gainers/losers tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub code: String,
    pub pct: f64,
}

/// The daily market pulse document, one per trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPulse {
    pub as_of_date: NaiveDate,
    /// Date actually used for previous-close comparisons; may lag
    /// `as_of_date` by more than one calendar day over holidays.
    pub prev_date_used: Option<NaiveDate>,
    pub universe_count: u32,
    pub advancers: u32,
    pub decliners: u32,
    pub flat: u32,
    /// advancers / (advancers + decliners) * 100, None when nothing moved.
    pub breadth_pct: Option<f64>,
    pub index_approx: IndexApprox,
    pub total_turnover: Decimal,
    /// How many rows contributed to `total_turnover`.
    pub turnover_coverage: u32,
    pub top_gainers: Vec<Mover>,
    pub top_losers: Vec<Mover>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pulse_serializes_camel_case() {
        let pulse = DailyPulse {
            as_of_date: "2025-07-01".parse().unwrap(),
            prev_date_used: Some("2025-06-30".parse().unwrap()),
            universe_count: 2,
            advancers: 1,
            decliners: 1,
            flat: 0,
            breadth_pct: Some(50.0),
            index_approx: IndexApprox {
                pct: Some(1.25),
                constituents_used: 2,
            },
            total_turnover: dec!(125000),
            turnover_coverage: 2,
            top_gainers: vec![Mover {
                code: "AAA".to_string(),
                pct: 2.5,
            }],
            top_losers: vec![],
            generated_at: Utc::now(),
        };

        let json = serde_json::to_value(&pulse).unwrap();
        assert_eq!(json["asOfDate"], "2025-07-01");
        assert_eq!(json["prevDateUsed"], "2025-06-30");
        assert_eq!(json["breadthPct"], 50.0);
        assert_eq!(json["indexApprox"]["constituentsUsed"], 2);
        assert_eq!(json["totalTurnover"], "125000");
        assert_eq!(json["topGainers"][0]["code"], "AAA");
        assert!(json.get("generatedAt").is_some());
    }

    #[test]
    fn test_null_fields_round_trip() {
        let pulse = DailyPulse {
            as_of_date: "2025-07-01".parse().unwrap(),
            prev_date_used: None,
            universe_count: 0,
            advancers: 0,
            decliners: 0,
            flat: 0,
            breadth_pct: None,
            index_approx: IndexApprox {
                pct: None,
                constituents_used: 0,
            },
            total_turnover: Decimal::ZERO,
            turnover_coverage: 0,
            top_gainers: vec![],
            top_losers: vec![],
            generated_at: Utc::now(),
        };

        let json = serde_json::to_value(&pulse).unwrap();
        assert!(json["breadthPct"].is_null());
        assert!(json["prevDateUsed"].is_null());

        let back: DailyPulse = serde_json::from_value(json).unwrap();
        assert_eq!(back.breadth_pct, None);
        assert_eq!(back.index_approx.pct, None);
    }
}
