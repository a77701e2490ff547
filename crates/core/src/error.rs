//! Error types for signalfield

use thiserror::Error;

/// Main error type for signalfield operations
#[derive(Error, Debug)]
pub enum Error {
    /// Fewer than the minimum number of distinct sample locations remain
    /// after deduplication, or no lag bin collected enough sample pairs.
    #[error("insufficient samples: {0}")]
    InsufficientSamples(String),

    /// The nonlinear variogram fit did not converge, or the fitted
    /// parameters violate nugget < sill or range > 0.
    #[error("variogram fit diverged: {0}")]
    VariogramFitDivergence(String),

    /// The augmented covariance matrix could not be factorized, even after
    /// diagonal regularization. Usually caused by degenerate sample
    /// geometry (unmerged duplicate locations).
    #[error("singular covariance matrix: degenerate sample geometry")]
    SingularCovarianceMatrix,

    /// Grid with non-positive cell size or zero dimensions.
    #[error("invalid grid spec: {reason} ({width}x{height}, cell size {cell_size})")]
    InvalidGridSpec {
        width: usize,
        height: usize,
        cell_size: f64,
        reason: &'static str,
    },

    #[error("index out of bounds: ({row}, {col}) in surface of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Grid evaluation was cancelled through the cooperative cancel flag.
    #[error("evaluation cancelled")]
    Cancelled,

    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type alias for signalfield operations
pub type Result<T> = std::result::Result<T, Error>;
