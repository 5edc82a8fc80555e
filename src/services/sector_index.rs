//! Market-cap-weighted sector returns chained into rolling level indices.

use chrono::{NaiveDate, Utc};
use std::collections::HashMap;

use crate::models::fundamentals::FundamentalsRecord;
use crate::models::price_row::PriceRow;
use crate::models::sector::{SectorCoverage, SectorRow, SectorSnapshot};

/// Starting level for a sector the first time it is observed.
pub const BASE_LEVEL: f64 = 100.0;

struct SectorAccum {
    weighted_ret: f64,
    weight: f64,
    stocks: u32,
    mcap: f64,
}

/// Build one day's sector snapshot.
///
/// Pure function of its inputs: the rolling level map is only read here.
/// The caller folds this day's levels forward (`fold_levels`) before the
/// next day runs; a backfill must therefore process days in ascending order.
///
/// A row joins its sector's aggregate only with a positive close, a positive
/// previous close and a fundamentals record carrying a sector and a positive
/// market cap. A previously observed sector with no usable rows today is
/// emitted with a null return and its level carried unchanged, so a data gap
/// never resets the chain to base.
pub fn build_sector_snapshot(
    date: NaiveDate,
    prev_date: Option<NaiveDate>,
    rows: &[PriceRow],
    prev_closes: &HashMap<String, f64>,
    fundamentals: &HashMap<String, FundamentalsRecord>,
    prev_levels: &HashMap<String, f64>,
) -> SectorSnapshot {
    let mut accums: HashMap<String, SectorAccum> = HashMap::new();

    for row in rows {
        let code = row.normalized_code();
        let close = match row.close {
            Some(close) if close > 0.0 => close,
            _ => continue,
        };
        let prev = match prev_closes.get(&code) {
            Some(prev) if *prev > 0.0 => *prev,
            _ => continue,
        };
        let record = match fundamentals.get(&code) {
            Some(record) => record,
            None => continue,
        };
        let mcap = match record.usable_market_cap() {
            Some(mcap) => mcap,
            None => continue,
        };

        let ret = close / prev - 1.0;
        if !ret.is_finite() {
            continue;
        }

        let accum = accums
            .entry(record.sector.clone())
            .or_insert(SectorAccum {
                weighted_ret: 0.0,
                weight: 0.0,
                stocks: 0,
                mcap: 0.0,
            });
        accum.weighted_ret += mcap * ret;
        accum.weight += mcap;
        accum.stocks += 1;
        accum.mcap += mcap;
    }

    let mut sectors: Vec<SectorRow> = Vec::with_capacity(accums.len());

    for (sector, accum) in &accums {
        let ret_1d = if accum.weight > 0.0 {
            Some(accum.weighted_ret / accum.weight)
        } else {
            None
        };
        let prev_level = prev_levels.get(sector).copied().unwrap_or(BASE_LEVEL);
        let level = match ret_1d {
            Some(ret) => prev_level * (1.0 + ret),
            None => prev_level,
        };

        sectors.push(SectorRow {
            sector: sector.clone(),
            ret_1d,
            level,
            coverage: SectorCoverage {
                stocks: accum.stocks,
                mcap: accum.mcap,
            },
        });
    }

    // Carry sectors that had a level yesterday but no usable rows today.
    for (sector, level) in prev_levels {
        if !accums.contains_key(sector) {
            sectors.push(SectorRow {
                sector: sector.clone(),
                ret_1d: None,
                level: *level,
                coverage: SectorCoverage {
                    stocks: 0,
                    mcap: 0.0,
                },
            });
        }
    }

    // Returns descending, nulls last; name tiebreak keeps reruns identical.
    sectors.sort_by(|a, b| match (a.ret_1d, b.ret_1d) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.sector.cmp(&b.sector)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.sector.cmp(&b.sector),
    });

    SectorSnapshot {
        date,
        prev_date,
        sectors,
        generated_at: Utc::now(),
    }
}

/// Absorb a snapshot's levels into the rolling map.
pub fn fold_levels(levels: &mut HashMap<String, f64>, snapshot: &SectorSnapshot) {
    for row in &snapshot.sectors {
        levels.insert(row.sector.clone(), row.level);
    }
}
