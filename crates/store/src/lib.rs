pub mod error;
pub mod fixtures;
pub mod http;
pub mod memory;
pub mod query;
pub mod store;
pub mod templates;
pub mod value;

pub use error::StoreError;
pub use http::{HttpGraphStore, RetryPolicy};
pub use memory::InMemoryGraphStore;
pub use query::{QueryKind, QueryTemplate};
pub use store::GraphStore;
pub use value::{Params, Row, Value};
