use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use recograph_core::config::{AppConfig, ConfigError};
use recograph_engine::Recommender;
use recograph_store::{HttpGraphStore, StoreError};

pub struct Application {
    pub config: AppConfig,
    pub recommender: Arc<Recommender>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("graph store transport failed to initialize: {0}")]
    Store(#[from] StoreError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        store_uri = config.store.uri.as_str(),
        "starting recommendation server bootstrap"
    );

    let store = HttpGraphStore::connect(&config.store)?;
    let recommender = Arc::new(Recommender::new(Arc::new(store)));

    info!(
        event_name = "system.bootstrap.store_ready",
        max_sessions = config.store.max_sessions,
        "graph store transport initialized"
    );

    Ok(Application { config, recommender })
}
