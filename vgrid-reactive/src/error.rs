//! Error types reported by the reactive graph.

use thiserror::Error;

/// Errors surfaced by [`Realm`](crate::Realm) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A value was published into a cell whose value is computed by the graph.
    #[error("cell {label} is derived and cannot be written directly")]
    NotASource {
        /// Label of the rejected cell, or `"<unnamed>"`.
        label: &'static str,
    },
    /// A cell was read with a value type different from the one it was created with.
    #[error("cell {label} does not hold a value of type {expected}")]
    TypeMismatch {
        /// Label of the cell, or `"<unnamed>"`.
        label: &'static str,
        /// Name of the requested type.
        expected: &'static str,
    },
    /// The cell handle points at a node that no longer exists.
    #[error("cell handle refers to a removed node")]
    Removed,
    /// A propagation pass exceeded its evaluation budget, usually because of a cycle
    /// that never settles.
    #[error("propagation aborted after {evaluations} evaluations")]
    PropagationLimit {
        /// Number of evaluations performed before the pass was cut off.
        evaluations: usize,
    },
}
