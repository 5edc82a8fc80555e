//! Breadth and turnover aggregation over one day's rows.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::models::price_row::PriceRow;

/// Advance/decline/unchanged counts plus notional turnover for one day.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BreadthTurnover {
    pub advancers: u32,
    pub decliners: u32,
    pub flat: u32,
    pub turnover: Decimal,
    pub turnover_coverage: u32,
}

impl BreadthTurnover {
    /// Share of directional moves that advanced, None when nothing moved.
    pub fn breadth_pct(&self) -> Option<f64> {
        let directional = self.advancers + self.decliners;
        if directional == 0 {
            None
        } else {
            Some(self.advancers as f64 / directional as f64 * 100.0)
        }
    }
}

/// Resolve a row's 1-day percent change.
///
/// An explicit finite change field from the feed takes priority; otherwise
/// the change is derived against the previous close. A row with neither
/// yields None and stays out of every breadth bucket.
pub fn percent_change(row: &PriceRow, prev_close: Option<f64>) -> Option<f64> {
    if let Some(explicit) = row.change_pct {
        if explicit.is_finite() {
            return Some(explicit);
        }
    }

    let close = row.close?;
    let prev = prev_close?;
    if prev > 0.0 {
        let pct = (close - prev) / prev * 100.0;
        if pct.is_finite() {
            return Some(pct);
        }
    }
    None
}

/// One pass over the day's rows.
///
/// Flat means an exact-zero percent change. Turnover sums close * volume for
/// rows where both are present and non-negative, accumulated in Decimal,
/// with a contributing-row count so consumers can judge completeness.
pub fn aggregate(rows: &[PriceRow], prev_closes: &HashMap<String, f64>) -> BreadthTurnover {
    let mut totals = BreadthTurnover::default();

    for row in rows {
        let prev = prev_closes.get(&row.normalized_code()).copied();
        if let Some(pct) = percent_change(row, prev) {
            if pct > 0.0 {
                totals.advancers += 1;
            } else if pct < 0.0 {
                totals.decliners += 1;
            } else {
                totals.flat += 1;
            }
        }

        if let (Some(close), Some(volume)) = (row.close, row.volume) {
            if close >= 0.0 && volume >= 0.0 {
                if let Some(notional) = Decimal::from_f64_retain(close * volume) {
                    totals.turnover += notional;
                    totals.turnover_coverage += 1;
                }
            }
        }
    }

    totals
}
