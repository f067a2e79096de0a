use async_trait::async_trait;

use crate::error::StoreError;
use crate::query::QueryTemplate;
use crate::value::{Params, Row};

/// Capability interface to the property-graph backend.
///
/// Implementations own session scoping: every call acquires whatever
/// session/transaction it needs and releases it on every exit path. Nothing
/// is held between calls, so any backend that can answer parameterized
/// pattern queries can sit behind this trait.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn query(&self, template: &QueryTemplate, params: Params)
        -> Result<Vec<Row>, StoreError>;
}
