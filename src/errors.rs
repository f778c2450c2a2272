//! Typed errors for the operation map registry.
//!
//! Validation findings are data (see `ValidationResult`); they only become a
//! `FlowError` at the registry boundary, where an invalid map must not be served.

use thiserror::Error;

/// Errors returned by [`MapRegistry`](crate::registry::MapRegistry).
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Invalid operation map for order {order_id}: {}", errors.join("; "))]
    InvalidOperationMap {
        order_id: String,
        errors: Vec<String>,
    },

    #[error("Failed to fetch edge records for order {order_id}: {source}")]
    FetchFailed {
        order_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Operation map registry lock poisoned")]
    LockPoisoned,
}

impl FlowError {
    /// Whether the order's routing itself is at fault, as opposed to infrastructure.
    pub fn is_invalid_map(&self) -> bool {
        matches!(self, Self::InvalidOperationMap { .. })
    }
}
