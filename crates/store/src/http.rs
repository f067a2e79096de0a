//! HTTP transport to the graph backend's transactional commit endpoint.
//!
//! Each query is one scoped request: the backend commits or rolls back per
//! request, so no session outlives a call. Reads retry transport failures
//! with bounded exponential backoff; nothing else is retried.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

use recograph_core::config::StoreConfig;

use crate::error::StoreError;
use crate::query::QueryTemplate;
use crate::store::GraphStore;
use crate::value::{Params, Row, Value};

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_millis(200) }
    }
}

impl RetryPolicy {
    /// Exponential backoff with jitter, capped at ten seconds.
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let base = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter_ceiling = (self.base_delay.as_millis() as u64 / 2).max(1);
        let jitter = rand::thread_rng().gen_range(0..jitter_ceiling);
        (base + Duration::from_millis(jitter)).min(Duration::from_secs(10))
    }
}

pub struct HttpGraphStore {
    client: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
    query_timeout: Duration,
    acquire_timeout: Duration,
    retry: RetryPolicy,
    sessions: Arc<Semaphore>,
}

impl HttpGraphStore {
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        // Connect-phase failures surface as transport errors (retryable for
        // reads); total request duration is capped separately per query.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.query_timeout_ms))
            .build()
            .map_err(|error| StoreError::Connection {
                attempts: 0,
                message: format!("could not build http client: {error}"),
            })?;

        let endpoint = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database
        );

        Ok(Self {
            client,
            endpoint,
            username: config.username.clone(),
            password: config.password_value().map(str::to_string),
            query_timeout: Duration::from_millis(config.query_timeout_ms),
            acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: Duration::from_millis(config.retry_base_ms),
            },
            sessions: Arc::new(Semaphore::new(config.max_sessions)),
        })
    }

    async fn execute_once(
        &self,
        template: &QueryTemplate,
        params: &Params,
    ) -> Result<Vec<Row>, AttemptError> {
        let body = serde_json::json!({
            "statements": [{
                "statement": template.text,
                "parameters": params.clone().into_json(),
            }]
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await.map_err(AttemptError::Transport)?;
        let status = response.status();
        let payload: CommitResponse =
            response.json().await.map_err(AttemptError::Transport)?;

        if let Some(error) = payload.errors.first() {
            // Client-class backend codes mean the query itself is wrong;
            // everything else is treated as a connection-level failure.
            if error.code.contains("ClientError") {
                return Err(AttemptError::Fatal(StoreError::MalformedQuery {
                    query: template.name,
                    message: format!("{}: {}", error.code, error.message),
                }));
            }
            return Err(AttemptError::Backend(format!("{}: {}", error.code, error.message)));
        }

        if !status.is_success() {
            return Err(AttemptError::Backend(format!("unexpected http status {status}")));
        }

        let result = payload.results.into_iter().next().unwrap_or_default();
        Ok(decode_rows(result))
    }
}

enum AttemptError {
    Transport(reqwest::Error),
    Backend(String),
    Fatal(StoreError),
}

#[async_trait::async_trait]
impl GraphStore for HttpGraphStore {
    async fn query(
        &self,
        template: &QueryTemplate,
        params: Params,
    ) -> Result<Vec<Row>, StoreError> {
        template.bind(&params)?;

        // Bounded session pool: the permit is held for the duration of the
        // request and released on every exit path when dropped.
        let _permit = timeout(self.acquire_timeout, Arc::clone(&self.sessions).acquire_owned())
            .await
            .map_err(|_| StoreError::PoolExhausted { waited: self.acquire_timeout })?
            .map_err(|_| StoreError::PoolExhausted { waited: self.acquire_timeout })?;

        let retries_allowed = if template.is_read() { self.retry.max_retries } else { 0 };
        let mut attempt = 0u32;

        loop {
            let outcome = timeout(self.query_timeout, self.execute_once(template, &params)).await;

            match outcome {
                Err(_) => {
                    return Err(StoreError::QueryTimeout {
                        query: template.name,
                        timeout: self.query_timeout,
                    });
                }
                Ok(Ok(rows)) => {
                    debug!(
                        event_name = "store.query.ok",
                        query = template.name,
                        rows = rows.len(),
                        attempt,
                        "graph query succeeded"
                    );
                    return Ok(rows);
                }
                Ok(Err(AttemptError::Fatal(error))) => return Err(error),
                Ok(Err(AttemptError::Transport(error))) if attempt < retries_allowed => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        event_name = "store.query.retry",
                        query = template.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transport failure, retrying read query"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Ok(Err(AttemptError::Transport(error))) => {
                    return Err(StoreError::Connection {
                        attempts: attempt + 1,
                        message: error.to_string(),
                    });
                }
                Ok(Err(AttemptError::Backend(message))) => {
                    return Err(StoreError::Connection { attempts: attempt + 1, message });
                }
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<BackendError>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<DataEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DataEntry {
    #[serde(default)]
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BackendError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

fn decode_rows(result: StatementResult) -> Vec<Row> {
    result
        .data
        .into_iter()
        .map(|entry| {
            let mut row = Row::new();
            for (column, cell) in result.columns.iter().zip(entry.row.iter()) {
                row = row.insert(column.clone(), Value::from_json(cell));
            }
            row
        })
        .collect()
}
