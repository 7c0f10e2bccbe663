use thiserror::Error;

/// Invalid grid configuration, reported before anything reaches the reactive graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// A pixel length was NaN or infinite.
    #[error("{field} must be finite, got {value}")]
    NotFinite {
        /// Name of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A pixel length was below zero.
    #[error("{field} must not be negative, got {value}")]
    Negative {
        /// Name of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
}

impl GridError {
    /// Checks that `value` is a finite, non-negative length.
    pub(crate) fn check_length(field: &'static str, value: f64) -> Result<f64, Self> {
        if !value.is_finite() {
            Err(Self::NotFinite { field, value })
        } else if value < 0.0 {
            Err(Self::Negative { field, value })
        } else {
            Ok(value)
        }
    }
}
