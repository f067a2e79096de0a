//! The public recommendation entry point.
//!
//! Request-scoped: one immutable options value per call, no state shared
//! across invocations beyond the read-only store handle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info};

use recograph_core::domain::customer::{Customer, CustomerId};
use recograph_core::domain::product::{Product, ProductId};
use recograph_core::options::{OptionsError, RecommendOptions};
use recograph_core::scoring::{Explanation, Ranker};
use recograph_store::{templates, GraphStore, Params, Row, StoreError};

use crate::error::{GenerateError, RecommendError};
use crate::generator::{CandidateGenerator, Seed};

const NEIGHBORHOOD_DEPTH_LIMIT: u32 = 3;

/// One ranked, explained recommendation: the whole contract with the
/// external rendering layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub product: Product,
    pub score: f64,
    pub explanation: Explanation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CustomerStats {
    pub customer_id: CustomerId,
    pub order_count: u64,
    pub distinct_products: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NeighborhoodNode {
    pub id: String,
    pub label: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NeighborhoodEdge {
    pub source: String,
    pub target: String,
    pub relationship: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// A bounded subgraph around a seed, assembled for the visualization layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Neighborhood {
    pub nodes: Vec<NeighborhoodNode>,
    pub edges: Vec<NeighborhoodEdge>,
}

pub struct Recommender {
    store: Arc<dyn GraphStore>,
    generator: CandidateGenerator,
    ranker: Ranker,
}

impl Recommender {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        let generator = CandidateGenerator::new(Arc::clone(&store));
        Self { store, generator, ranker: Ranker::new() }
    }

    /// Produce a ranked, explained recommendation list for a seed.
    ///
    /// Always yields either a (possibly empty) ranked list or a typed
    /// error; a customer with no purchase history gets an empty list, an
    /// unknown seed gets `SeedNotFound`.
    pub async fn recommend(
        &self,
        seed: &Seed,
        options: &RecommendOptions,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        options.validate()?;

        // Aggregate deadline across every sub-query of this call. On expiry
        // the in-flight work is dropped, cancelling outstanding queries.
        match timeout(options.deadline, self.recommend_inner(seed, options)).await {
            Ok(result) => result,
            Err(_) => Err(RecommendError::DeadlineExceeded(options.deadline)),
        }
    }

    async fn recommend_inner(
        &self,
        seed: &Seed,
        options: &RecommendOptions,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let candidates = match self
            .generator
            .generate(seed, options.max_hops, options.max_candidates)
            .await
        {
            Ok(candidates) => candidates,
            Err(GenerateError::EmptyNeighborhood(customer)) => {
                info!(
                    event_name = "engine.recommend.empty_neighborhood",
                    customer = customer.as_str(),
                    "customer has no purchase history, returning no recommendations"
                );
                return Ok(Vec::new());
            }
            Err(GenerateError::SeedNotFound(id)) => {
                return Err(RecommendError::SeedNotFound(id))
            }
            Err(GenerateError::Schema(error)) => return Err(error.into()),
            Err(GenerateError::Store(error)) => return Err(error.into()),
        };

        let mut signals = candidates.signals;
        if options.exclude_owned {
            for owned in &candidates.owned {
                signals.remove(owned);
            }
        }

        let ranked = self.ranker.rank(signals, options.top_k);
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> =
            ranked.iter().map(|candidate| candidate.product_id.0.clone()).collect();
        let rows =
            self.store.query(&templates::PRODUCTS_BY_IDS, Params::new().set("ids", ids)).await?;

        let mut catalog: HashMap<String, Product> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let product = product_from_row(templates::PRODUCTS_BY_IDS.name, row)?;
            catalog.insert(product.id.0.clone(), product);
        }

        // A ranked id without display attributes is a dangling reference;
        // skip it rather than fail the whole request.
        let results: Vec<Recommendation> = ranked
            .into_iter()
            .filter_map(|candidate| {
                catalog.remove(candidate.product_id.as_str()).map(|product| Recommendation {
                    product,
                    score: candidate.score,
                    explanation: candidate.explanation,
                })
            })
            .collect();

        debug!(
            event_name = "engine.recommend.done",
            seed = %seed,
            results = results.len(),
            "recommendation request completed"
        );

        Ok(results)
    }

    /// Connectivity probe for health checks and preflight tooling.
    pub async fn ping(&self) -> Result<(), RecommendError> {
        self.store.query(&templates::PING, Params::new()).await?;
        Ok(())
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, RecommendError> {
        let rows = self.store.query(&templates::LIST_PRODUCTS, Params::new()).await?;
        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            products.push(product_from_row(templates::LIST_PRODUCTS.name, row)?);
        }
        Ok(products)
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, RecommendError> {
        let rows = self.store.query(&templates::LIST_CUSTOMERS, Params::new()).await?;
        let mut customers = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = row.require_text(templates::LIST_CUSTOMERS.name, "id")?;
            customers.push(Customer {
                id: CustomerId::new(id),
                name: row.opt_text("name").map(str::to_string),
            });
        }
        Ok(customers)
    }

    /// Purchase-history summary for one customer.
    pub async fn customer_stats(
        &self,
        customer_id: &CustomerId,
    ) -> Result<CustomerStats, RecommendError> {
        let rows = self
            .store
            .query(&templates::CUSTOMER_STATS, Params::new().set("id", customer_id.as_str()))
            .await?;

        let Some(row) = rows.first() else {
            return Err(RecommendError::SeedNotFound(customer_id.0.clone()));
        };

        let query = templates::CUSTOMER_STATS.name;
        Ok(CustomerStats {
            customer_id: customer_id.clone(),
            order_count: row.require_i64(query, "order_count")?.max(0) as u64,
            distinct_products: row.require_i64(query, "product_count")?.max(0) as u64,
        })
    }

    /// Bounded subgraph around a seed for rendering. Depth counts hops from
    /// the seed node; customer seeds spend the first hop on `PURCHASED`.
    pub async fn neighborhood(
        &self,
        seed: &Seed,
        depth: u32,
    ) -> Result<Neighborhood, RecommendError> {
        if depth == 0 || depth > NEIGHBORHOOD_DEPTH_LIMIT {
            return Err(RecommendError::InvalidOptions(OptionsError {
                option: "depth",
                message: format!("{depth} is outside 1..={NEIGHBORHOOD_DEPTH_LIMIT}"),
            }));
        }

        let mut neighborhood = Neighborhood::default();
        let mut seen_nodes: HashSet<String> = HashSet::new();
        let mut seen_edges: HashSet<(String, String)> = HashSet::new();

        let (mut frontier, mut hops_remaining) = match seed {
            Seed::Customer(customer_id) => {
                let rows = self
                    .store
                    .query(
                        &templates::CUSTOMER_PURCHASES,
                        Params::new().set("id", customer_id.as_str()),
                    )
                    .await?;
                if rows.is_empty() {
                    // Distinguish a missing customer from one with no edges.
                    let resolved = self
                        .store
                        .query(
                            &templates::RESOLVE_CUSTOMER,
                            Params::new().set("id", customer_id.as_str()),
                        )
                        .await?;
                    if resolved.is_empty() {
                        return Err(RecommendError::SeedNotFound(customer_id.0.clone()));
                    }
                }

                push_node(&mut neighborhood, &mut seen_nodes, customer_id.as_str(), "Customer");
                let mut frontier = Vec::with_capacity(rows.len());
                for row in &rows {
                    let product_id =
                        row.require_text(templates::CUSTOMER_PURCHASES.name, "product_id")?;
                    push_node(&mut neighborhood, &mut seen_nodes, product_id, "Product");
                    neighborhood.edges.push(NeighborhoodEdge {
                        source: customer_id.0.clone(),
                        target: product_id.to_string(),
                        relationship: "PURCHASED",
                        weight: None,
                    });
                    frontier.push(product_id.to_string());
                }
                (frontier, depth.saturating_sub(1))
            }
            Seed::Product(product_id) => {
                let rows = self
                    .store
                    .query(
                        &templates::RESOLVE_PRODUCT,
                        Params::new().set("id", product_id.as_str()),
                    )
                    .await?;
                if rows.is_empty() {
                    return Err(RecommendError::SeedNotFound(product_id.0.clone()));
                }
                push_node(&mut neighborhood, &mut seen_nodes, product_id.as_str(), "Product");
                (vec![product_id.0.clone()], depth)
            }
        };

        while hops_remaining > 0 && !frontier.is_empty() {
            frontier.sort();
            frontier.dedup();
            let rows = self
                .store
                .query(
                    &templates::CO_PURCHASED_NEIGHBORS,
                    Params::new().set("ids", frontier.clone()),
                )
                .await?;

            let mut next = Vec::new();
            for row in &rows {
                let query = templates::CO_PURCHASED_NEIGHBORS.name;
                let source = row.require_text(query, "source_id")?;
                let neighbor = row.require_text(query, "neighbor_id")?;
                let weight = row.require_f64(query, "weight")?;

                if seen_nodes.insert(neighbor.to_string()) {
                    neighborhood
                        .nodes
                        .push(NeighborhoodNode { id: neighbor.to_string(), label: "Product" });
                    next.push(neighbor.to_string());
                }

                // One symmetric edge per product pair.
                let key = if source <= neighbor {
                    (source.to_string(), neighbor.to_string())
                } else {
                    (neighbor.to_string(), source.to_string())
                };
                if seen_edges.insert(key) {
                    neighborhood.edges.push(NeighborhoodEdge {
                        source: source.to_string(),
                        target: neighbor.to_string(),
                        relationship: "CO_PURCHASED",
                        weight: Some(weight),
                    });
                }
            }

            frontier = next;
            hops_remaining -= 1;
        }

        Ok(neighborhood)
    }
}

fn push_node(
    neighborhood: &mut Neighborhood,
    seen: &mut HashSet<String>,
    id: &str,
    label: &'static str,
) {
    if seen.insert(id.to_string()) {
        neighborhood.nodes.push(NeighborhoodNode { id: id.to_string(), label });
    }
}

fn product_from_row(query: &'static str, row: &Row) -> Result<Product, StoreError> {
    let price = row.require_f64(query, "price")?;
    let price = Decimal::try_from(price).map_err(|error| StoreError::Decode {
        query,
        message: format!("price is not a valid decimal: {error}"),
    })?;

    Ok(Product {
        id: ProductId::new(row.require_text(query, "id")?),
        name: row.require_text(query, "name")?.to_string(),
        category: row.require_text(query, "category")?.to_string(),
        price,
    })
}
