//! Error types and result utilities for sinusoidal model operations.

use thiserror::Error;

/// Convenience type alias for results that may contain SineModelError
pub type SineModelResult<T> = Result<T, SineModelError>;

/// Error types that can occur during sinusoidal model operations.
#[derive(Error, Debug)]
pub enum SineModelError {
    /// Error that occurs when invalid parameters are provided to an operation.
    ///
    /// This includes cases like an FFT size that is not a power of two, a hop
    /// size larger than the FFT size, or a non-positive rate/ratio/factor.
    /// These are configuration mistakes and are rejected before any
    /// processing starts.
    #[error("Invalid parameter error: {0}")]
    InvalidParameter(String),

    /// Error that occurs when an invalid numeric range is provided.
    ///
    /// This typically happens when min >= max in a frequency band or a mix
    /// level falls outside [0, 1].
    #[error("Invalid range error: {0}")]
    InvalidRange(String),

    /// Error that occurs when input dimensions don't match expected values.
    ///
    /// This happens when a signal is empty or shorter than the analysis
    /// window, or when a frame length doesn't match the configured FFT size.
    #[error("Dimension mismatch error: {0}")]
    DimensionMismatch(String),
}
