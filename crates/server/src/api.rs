//! JSON surface consumed by the external visualization layer.
//!
//! Nothing here renders anything: the contract is the recommendation list,
//! catalog listings, stats, and neighborhood subgraphs as JSON.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use recograph_core::domain::customer::{Customer, CustomerId};
use recograph_core::domain::product::{Product, ProductId};
use recograph_core::options::RecommendOptions;
use recograph_engine::{
    CustomerStats, Neighborhood, RecommendError, Recommendation, Recommender, Seed,
};
use recograph_store::StoreError;

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    /// Config-derived per-request defaults; query parameters override.
    pub defaults: RecommendOptions,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/recommendations/{seed}", get(recommendations))
        .route("/api/products", get(products))
        .route("/api/customers", get(customers))
        .route("/api/customers/{id}/stats", get(customer_stats))
        .route("/api/neighborhood/{seed}", get(neighborhood))
        .with_state(state)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: &'static str,
    pub message: String,
    /// Whether the caller may reasonably retry later.
    pub retryable: bool,
    pub correlation_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedQuery {
    /// `customer` (default) or `product`.
    pub kind: Option<String>,
    pub max_hops: Option<u32>,
    pub top_k: Option<usize>,
    pub max_candidates: Option<usize>,
    pub exclude_owned: Option<bool>,
    pub depth: Option<u32>,
}

fn parse_seed(seed: String, kind: Option<&str>) -> Result<Seed, (StatusCode, Json<ApiError>)> {
    match kind.unwrap_or("customer") {
        "customer" => Ok(Seed::Customer(CustomerId::new(seed))),
        "product" => Ok(Seed::Product(ProductId::new(seed))),
        other => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "invalid_seed_kind",
                message: format!("unknown seed kind `{other}` (expected customer|product)"),
                retryable: false,
                correlation_id: uuid::Uuid::new_v4().to_string(),
            }),
        )),
    }
}

fn map_error(error: RecommendError) -> (StatusCode, Json<ApiError>) {
    let (status, code) = match &error {
        RecommendError::InvalidOptions(_) => (StatusCode::BAD_REQUEST, "invalid_options"),
        RecommendError::SeedNotFound(_) => (StatusCode::NOT_FOUND, "seed_not_found"),
        RecommendError::DeadlineExceeded(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "recommendation_timeout")
        }
        RecommendError::Store(StoreError::PoolExhausted { .. }) => {
            (StatusCode::SERVICE_UNAVAILABLE, "pool_exhausted")
        }
        RecommendError::Store(StoreError::Connection { .. }) => {
            (StatusCode::BAD_GATEWAY, "store_unavailable")
        }
        RecommendError::Store(StoreError::QueryTimeout { .. }) => {
            (StatusCode::BAD_GATEWAY, "store_timeout")
        }
        RecommendError::Store(_) | RecommendError::Schema(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    };

    let correlation_id = uuid::Uuid::new_v4().to_string();
    if status.is_server_error() {
        warn!(
            event_name = "api.request.error",
            error_code = code,
            correlation_id = correlation_id.as_str(),
            error = %error,
            "request failed"
        );
    }

    (
        status,
        Json(ApiError {
            error: code,
            message: error.to_string(),
            retryable: error.is_transient(),
            correlation_id,
        }),
    )
}

pub async fn health(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.recommender.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ready", store: "ready" })),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "degraded", store: "unreachable" }),
        ),
    }
}

pub async fn recommendations(
    State(state): State<AppState>,
    Path(seed): Path<String>,
    Query(query): Query<SeedQuery>,
) -> Result<Json<Vec<Recommendation>>, (StatusCode, Json<ApiError>)> {
    let seed = parse_seed(seed, query.kind.as_deref())?;

    let mut options = state.defaults.clone();
    if let Some(max_hops) = query.max_hops {
        options.max_hops = max_hops;
    }
    if let Some(top_k) = query.top_k {
        options.top_k = top_k;
    }
    if let Some(max_candidates) = query.max_candidates {
        options.max_candidates = max_candidates;
    }
    if let Some(exclude_owned) = query.exclude_owned {
        options.exclude_owned = exclude_owned;
    }

    state.recommender.recommend(&seed, &options).await.map(Json).map_err(map_error)
}

pub async fn products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, (StatusCode, Json<ApiError>)> {
    state.recommender.list_products().await.map(Json).map_err(map_error)
}

pub async fn customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Customer>>, (StatusCode, Json<ApiError>)> {
    state.recommender.list_customers().await.map(Json).map_err(map_error)
}

pub async fn customer_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustomerStats>, (StatusCode, Json<ApiError>)> {
    state.recommender.customer_stats(&CustomerId::new(id)).await.map(Json).map_err(map_error)
}

pub async fn neighborhood(
    State(state): State<AppState>,
    Path(seed): Path<String>,
    Query(query): Query<SeedQuery>,
) -> Result<Json<Neighborhood>, (StatusCode, Json<ApiError>)> {
    let seed = parse_seed(seed, query.kind.as_deref())?;
    let depth = query.depth.unwrap_or(2);
    state.recommender.neighborhood(&seed, depth).await.map(Json).map_err(map_error)
}
