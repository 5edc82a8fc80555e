//! Daily pulse assembly: breadth, turnover, index approximation and movers
//! computed over one logical pass of the day's rows.

use chrono::{NaiveDate, Utc};
use std::collections::HashMap;

use crate::models::fundamentals::FundamentalsRecord;
use crate::models::price_row::PriceRow;
use crate::models::pulse::DailyPulse;
use crate::services::breadth;
use crate::services::index_approx::{approximate_index, top_movers};

pub fn compute_daily_pulse(
    as_of: NaiveDate,
    prev_date_used: Option<NaiveDate>,
    rows: &[PriceRow],
    prev_closes: &HashMap<String, f64>,
    fundamentals: &HashMap<String, FundamentalsRecord>,
) -> DailyPulse {
    let totals = breadth::aggregate(rows, prev_closes);
    let index_approx = approximate_index(rows, prev_closes, fundamentals);
    let (top_gainers, top_losers) = top_movers(rows, prev_closes);

    DailyPulse {
        as_of_date: as_of,
        prev_date_used,
        universe_count: rows.len() as u32,
        advancers: totals.advancers,
        decliners: totals.decliners,
        flat: totals.flat,
        breadth_pct: totals.breadth_pct(),
        index_approx,
        total_turnover: totals.turnover,
        turnover_coverage: totals.turnover_coverage,
        top_gainers,
        top_losers,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_single_advancer_pulse() {
        let rows = vec![PriceRow {
            code: "AAA".to_string(),
            close: Some(110.0),
            volume: Some(1000.0),
            change_pct: None,
            date: None,
        }];
        let prev = HashMap::from([("AAA".to_string(), 100.0)]);
        let fundamentals: HashMap<String, FundamentalsRecord> = HashMap::from([(
            "AAA".to_string(),
            serde_json::from_value(
                json!({"code": "AAA", "sector": "Tech", "marketCap": 1000, "indexMember": 1}),
            )
            .unwrap(),
        )]);

        let pulse = compute_daily_pulse(
            date("2025-07-01"),
            Some(date("2025-06-30")),
            &rows,
            &prev,
            &fundamentals,
        );

        assert_eq!(pulse.universe_count, 1);
        assert_eq!(pulse.advancers, 1);
        assert_eq!(pulse.decliners, 0);
        assert_eq!(pulse.flat, 0);
        assert_eq!(pulse.breadth_pct, Some(100.0));
        assert!((pulse.index_approx.pct.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(pulse.index_approx.constituents_used, 1);
        assert_eq!(pulse.total_turnover, dec!(110000));
        assert_eq!(pulse.turnover_coverage, 1);
        assert_eq!(pulse.top_gainers[0].code, "AAA");
        assert!((pulse.top_gainers[0].pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_comparison_day_leaves_pct_figures_null() {
        let rows = vec![PriceRow {
            code: "AAA".to_string(),
            close: Some(110.0),
            volume: Some(1000.0),
            change_pct: None,
            date: None,
        }];

        let pulse = compute_daily_pulse(
            date("2025-07-01"),
            None,
            &rows,
            &HashMap::new(),
            &HashMap::new(),
        );

        assert_eq!(pulse.prev_date_used, None);
        assert_eq!(pulse.breadth_pct, None);
        assert_eq!(pulse.index_approx.pct, None);
        assert!(pulse.top_gainers.is_empty());
        // Notional turnover is unaffected by the missing baseline.
        assert_eq!(pulse.total_turnover, dec!(110000));
    }

    #[test]
    fn test_bucket_invariant_holds() {
        let rows = vec![
            PriceRow {
                code: "A".to_string(),
                close: Some(101.0),
                volume: None,
                change_pct: None,
                date: None,
            },
            PriceRow {
                code: "B".to_string(),
                close: None,
                volume: None,
                change_pct: None,
                date: None,
            },
        ];
        let prev = HashMap::from([("A".to_string(), 100.0)]);

        let pulse = compute_daily_pulse(date("2025-07-01"), None, &rows, &prev, &HashMap::new());
        assert!(pulse.advancers + pulse.decliners + pulse.flat <= pulse.universe_count);
        assert_eq!(pulse.advancers + pulse.decliners + pulse.flat, 1);
    }
}
