//! Market-cap-weighted approximate index return and top movers.

use std::collections::HashMap;

use crate::models::fundamentals::FundamentalsRecord;
use crate::models::price_row::PriceRow;
use crate::models::pulse::{IndexApprox, Mover};
use crate::services::breadth::percent_change;

pub const TOP_MOVERS: usize = 5;

/// Weighted return over rows flagged as index members.
///
/// A row contributes only with a finite percent change and a positive market
/// cap; `constituents_used` counts exactly those rows.
pub fn approximate_index(
    rows: &[PriceRow],
    prev_closes: &HashMap<String, f64>,
    fundamentals: &HashMap<String, FundamentalsRecord>,
) -> IndexApprox {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut used = 0u32;

    for row in rows {
        let code = row.normalized_code();
        let record = match fundamentals.get(&code) {
            Some(record) => record,
            None => continue,
        };
        if !record.index_member {
            continue;
        }
        let mcap = match record.usable_market_cap() {
            Some(mcap) => mcap,
            None => continue,
        };
        let pct = match percent_change(row, prev_closes.get(&code).copied()) {
            Some(pct) => pct,
            None => continue,
        };

        numerator += pct * mcap;
        denominator += mcap;
        used += 1;
    }

    IndexApprox {
        pct: if denominator > 0.0 {
            Some(numerator / denominator)
        } else {
            None
        },
        constituents_used: used,
    }
}

/// Top-N gainers and losers over every row with a finite percent change,
/// index member or not. Stable sorts keep snapshot order between ties.
pub fn top_movers(
    rows: &[PriceRow],
    prev_closes: &HashMap<String, f64>,
) -> (Vec<Mover>, Vec<Mover>) {
    let movers: Vec<Mover> = rows
        .iter()
        .filter_map(|row| {
            percent_change(row, prev_closes.get(&row.normalized_code()).copied()).map(|pct| Mover {
                code: row.normalized_code(),
                pct,
            })
        })
        .collect();

    let mut gainers = movers.clone();
    gainers.sort_by(|a, b| b.pct.total_cmp(&a.pct));
    gainers.truncate(TOP_MOVERS);

    let mut losers = movers;
    losers.sort_by(|a, b| a.pct.total_cmp(&b.pct));
    losers.truncate(TOP_MOVERS);

    (gainers, losers)
}
