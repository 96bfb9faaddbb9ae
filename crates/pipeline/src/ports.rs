//! Port traits implemented by infrastructure crates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::EventSourceError;

/// The date range sent to the event service.
///
/// Dates are already rendered (normally `YYYY-MM-DD`); the source passes
/// them through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    /// Inclusive start of the requested slice.
    pub start_date: String,
    /// Exclusive end of the requested slice.
    pub end_date: String,
}

/// A remote service that returns the raw event document for a date range.
///
/// Implementations return the response body exactly as received. They do
/// not parse it and do not retry.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Downloads the raw event document for `query`.
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<u8>, EventSourceError>;
}
