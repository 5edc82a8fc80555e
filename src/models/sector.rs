use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How much of a sector actually backed its aggregate that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorCoverage {
    pub stocks: u32,
    pub mcap: f64,
}

/// One sector's daily entry.
///
/// `level` is a chained total-return-style index: the nearest prior level
/// times (1 + ret1d), base 100 on first observation. It is carried, never
/// recomputed from two arbitrary days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRow {
    pub sector: String,
    pub ret_1d: Option<f64>,
    pub level: f64,
    pub coverage: SectorCoverage,
}

/// The per-day sector table, one document per trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorSnapshot {
    pub date: NaiveDate,
    pub prev_date: Option<NaiveDate>,
    pub sectors: Vec<SectorRow>,
    pub generated_at: DateTime<Utc>,
}

impl SectorSnapshot {
    pub fn sector(&self, name: &str) -> Option<&SectorRow> {
        self.sectors.iter().find(|row| row.sector == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_row_serializes_ret1d() {
        let row = SectorRow {
            sector: "Tech".to_string(),
            ret_1d: Some(0.1),
            level: 110.0,
            coverage: SectorCoverage {
                stocks: 3,
                mcap: 5000.0,
            },
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["ret1d"], 0.1);
        assert_eq!(json["level"], 110.0);
        assert_eq!(json["coverage"]["stocks"], 3);
    }

    #[test]
    fn test_snapshot_lookup_by_sector() {
        let snapshot = SectorSnapshot {
            date: "2025-07-01".parse().unwrap(),
            prev_date: None,
            sectors: vec![SectorRow {
                sector: "Energy".to_string(),
                ret_1d: None,
                level: 120.0,
                coverage: SectorCoverage {
                    stocks: 0,
                    mcap: 0.0,
                },
            }],
            generated_at: Utc::now(),
        };

        assert!(snapshot.sector("Energy").is_some());
        assert!(snapshot.sector("Tech").is_none());
    }
}
