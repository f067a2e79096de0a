pub mod config;
pub mod domain;
pub mod options;
pub mod schema;
pub mod scoring;
pub mod signals;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::customer::{Customer, CustomerId};
pub use domain::order::{Order, OrderId, OrderLine};
pub use domain::product::{Product, ProductId};
pub use options::{OptionsError, RecommendOptions};
pub use schema::{Directionality, GraphSchema, SchemaError, TraversalSpec};
pub use scoring::{Explanation, HopContribution, RankedCandidate, Ranker};
pub use signals::{HopSignal, SignalBundle};
