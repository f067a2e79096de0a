use std::time::Duration;

use thiserror::Error;

/// Failures at the graph-store boundary.
///
/// `Connection` and `QueryTimeout` are transport-level; `MalformedQuery`
/// indicates an integration bug and is never retried; `PoolExhausted` is a
/// transient capacity signal the caller may retry later.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph store connection failed after {attempts} attempt(s): {message}")]
    Connection { attempts: u32, message: String },
    #[error("query `{query}` timed out after {timeout:?}")]
    QueryTimeout { query: &'static str, timeout: Duration },
    #[error("malformed query `{query}`: {message}")]
    MalformedQuery { query: &'static str, message: String },
    #[error("session pool exhausted after waiting {waited:?}")]
    PoolExhausted { waited: Duration },
    #[error("could not decode row from query `{query}`: {message}")]
    Decode { query: &'static str, message: String },
}

impl StoreError {
    /// Transient failures worth retrying later; integration bugs are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::PoolExhausted { .. })
    }
}
