pub mod daily_pulse_sync;
pub mod sector_backfill;

use crate::services::prev_close;
use crate::services::snapshot_store::StoreError;

/// Tunables shared by the daily run and the backfill.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Calendar-day bound on the previous-close backward walk.
    pub max_lookback_days: u32,
    /// A snapshot must carry more rows than this to be trusted.
    pub min_snapshot_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_lookback_days: prev_close::DEFAULT_MAX_LOOKBACK_DAYS,
            min_snapshot_rows: prev_close::MIN_PLAUSIBLE_ROWS,
        }
    }
}

/// Engine-level failures.
///
/// NotReady means "no usable input yet": the scheduler should simply retry
/// on its next run, nobody needs to be paged.
#[derive(Debug)]
pub enum EngineError {
    NotReady(String),
    Store(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotReady(msg) => write!(f, "Input not ready: {}", msg),
            EngineError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::NotReady("no latest snapshot".to_string());
        assert!(err.to_string().contains("not ready"));

        let err = EngineError::Store(StoreError::Http("timeout".to_string()));
        assert!(err.to_string().contains("Store error"));
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_lookback_days, 7);
        assert_eq!(config.min_snapshot_rows, 10);
    }
}
