use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Milliseconds between animation ticks.
    pub tick_ms: u64,

    /// Minimum milliseconds between two logged pose reports.
    pub report_interval_ms: u64,

    /// File that every snapshot is appended to as one line of JSON.
    pub record: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            tick_ms: 16,
            report_interval_ms: 1000,
            record: None,
        }
    }
}
