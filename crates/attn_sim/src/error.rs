use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a config or replay file from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} failed validation: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// A tuning value that would break the simulation's assumptions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be > 0 (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} range is inverted: min {min} > max {max}")]
    InvertedRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} must lie in [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error(
        "largest platform gap {gap_max} exceeds jump reach {reach:.1} at max descent speed"
    )]
    UnreachableGap { gap_max: f32, reach: f32 },
    #[error(
        "path shift {path_max_shift} needs {needed:.1} px of drift but a drop over the smallest gap covers {drift:.1}"
    )]
    UnreachableShift {
        path_max_shift: f32,
        needed: f32,
        drift: f32,
    },
}
