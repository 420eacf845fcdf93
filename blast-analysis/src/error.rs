//! Analysis errors

use thiserror::Error;

/// Errors that abort analysis of a track
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unresolvable {instrument} frequency: no spectrum bins in [{low}, {high}] Hz")]
    UnresolvableFrequency {
        instrument: &'static str,
        low: f32,
        high: f32,
    },
}
