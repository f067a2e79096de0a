use recograph_core::config::{redact, AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let username = config.store.username.as_deref().unwrap_or("<unset>").to_string();
    let password = config.store.password_value().map(redact).unwrap_or_else(|| "<unset>".into());

    let lines = vec![
        "effective config (precedence: overrides > env > file > default):".to_string(),
        format!("  store.uri                 = {}", config.store.uri),
        format!("  store.database            = {}", config.store.database),
        format!("  store.username            = {username}"),
        format!("  store.password            = {password}"),
        format!("  store.max_sessions        = {}", config.store.max_sessions),
        format!("  store.acquire_timeout_ms  = {}", config.store.acquire_timeout_ms),
        format!("  store.query_timeout_ms    = {}", config.store.query_timeout_ms),
        format!("  store.max_retries         = {}", config.store.max_retries),
        format!("  store.retry_base_ms       = {}", config.store.retry_base_ms),
        format!("  engine.max_hops           = {}", config.engine.max_hops),
        format!("  engine.max_candidates     = {}", config.engine.max_candidates),
        format!("  engine.top_k              = {}", config.engine.top_k),
        format!("  engine.exclude_owned      = {}", config.engine.exclude_owned),
        format!("  engine.deadline_ms        = {}", config.engine.deadline_ms),
        format!("  server.bind_address       = {}", config.server.bind_address),
        format!("  server.port               = {}", config.server.port),
        format!("  logging.level             = {}", config.logging.level),
        format!("  logging.format            = {:?}", config.logging.format),
    ];

    lines.join("\n")
}
