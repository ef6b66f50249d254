//! Error types shared by every simulation stage

use std::fmt;
use std::path::PathBuf;

/// Main error type for all simulation operations
#[derive(Debug)]
pub enum SimulationError {
    /// Geometric operands with inconsistent dimensionality
    GridDimensionMismatch {
        /// Dimensionality of the left operand
        left: &'static str,
        /// Dimensionality of the right operand
        right: &'static str,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Index or array position beyond its declared extents
    ///
    /// Distinct from a missing value, which is a normal state for
    /// uninformed cells.
    OutOfRange {
        /// Description of the offending index
        index: String,
        /// Description of the valid extent
        extent: String,
    },

    /// Training image exceeds the categorical value limit
    TooManyCategories {
        /// Number of distinct non-missing values found
        found: usize,
        /// Maximum supported number of categories
        limit: usize,
    },

    /// Parameter validation failed before any work was done
    PreconditionViolation {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Malformed GSLIB document or tabular record
    IoFormat {
        /// File the reader was consuming
        path: PathBuf,
        /// One-based line number where parsing failed
        line: usize,
        /// Description of the failure
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GridDimensionMismatch {
                left,
                right,
                operation,
            } => {
                write!(
                    f,
                    "Dimension mismatch during {operation}: {left} vs {right}"
                )
            }
            Self::OutOfRange { index, extent } => {
                write!(f, "Index {index} is outside {extent}")
            }
            Self::TooManyCategories { found, limit } => {
                write!(
                    f,
                    "Training image has {found} distinct categories (limit: {limit})"
                )
            }
            Self::PreconditionViolation {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::IoFormat { path, line, reason } => {
                write!(
                    f,
                    "Malformed input '{}' at line {line}: {reason}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for simulation results
pub type Result<T> = std::result::Result<T, SimulationError>;

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create a precondition violation error
pub fn precondition(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> SimulationError {
    SimulationError::PreconditionViolation {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create an out-of-range error
pub fn out_of_range(index: &impl ToString, extent: &impl ToString) -> SimulationError {
    SimulationError::OutOfRange {
        index: index.to_string(),
        extent: extent.to_string(),
    }
}

/// Create a format error tied to a file position
pub fn format_error(
    path: impl Into<PathBuf>,
    line: usize,
    reason: &impl ToString,
) -> SimulationError {
    SimulationError::IoFormat {
        path: path.into(),
        line,
        reason: reason.to_string(),
    }
}
