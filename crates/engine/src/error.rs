use std::time::Duration;

use thiserror::Error;

use recograph_core::options::OptionsError;
use recograph_core::schema::SchemaError;
use recograph_store::StoreError;

/// Failures during candidate generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The seed id resolved to no node. Distinct from "no data": an unknown
    /// entity is a caller error, never an empty result.
    #[error("seed `{0}` was not found in the graph")]
    SeedNotFound(String),
    /// The seed customer exists but has no purchase history. Recoverable;
    /// the service maps it to an empty result.
    #[error("customer `{0}` has no purchase history")]
    EmptyNeighborhood(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures surfaced by the recommendation service.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    InvalidOptions(#[from] OptionsError),
    #[error("seed `{0}` was not found in the graph")]
    SeedNotFound(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The aggregate deadline for one recommendation call elapsed.
    /// Outstanding sub-queries were cancelled; nothing partial is returned.
    #[error("recommendation deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl RecommendError {
    /// Whether the caller may reasonably retry later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DeadlineExceeded(_) => true,
            Self::Store(store) => store.is_transient(),
            _ => false,
        }
    }
}
