//! Error types for calendar event retrieval.

use crate::filter::Dimension;

/// Errors that can occur while building or running event queries.
#[derive(Debug, thiserror::Error)]
pub enum EventQueryError {
    /// A filter value was neither a boolean, an integer, nor a list of integers.
    #[error("invalid {dimension} filter: {reason}")]
    InvalidFilterSpec {
        /// The dimension whose filter was rejected.
        dimension: Dimension,
        /// What was wrong with the supplied value.
        reason: String,
    },

    /// A caller-supplied parameter name collides with the names generated
    /// for the scope filters.
    #[error("parameter name '{0}' uses a reserved prefix")]
    ReservedParameter(String),

    /// The same extra parameter name was supplied more than once.
    #[error("parameter name '{0}' is bound more than once")]
    DuplicateParameter(String),

    /// The lower bound of a time window is after its upper bound.
    #[error("invalid time window: from {from} is after to {to}")]
    InvalidWindow {
        /// Window start, in unix seconds.
        from: i64,
        /// Window end, in unix seconds.
        to: i64,
    },

    /// No `modules` row exists for the given module name.
    #[error("module not found: {0}")]
    ModuleNotFound(String),

    /// A database operation failed.
    #[error("event query database error: {0}")]
    Database(#[from] rusqlite::Error),
}
