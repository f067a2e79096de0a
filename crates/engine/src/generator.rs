//! Candidate generation: bounded traversal from a seed into a signal map.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use recograph_core::domain::customer::CustomerId;
use recograph_core::domain::product::ProductId;
use recograph_core::schema::{GraphSchema, TraversalSpec};
use recograph_core::signals::SignalBundle;
use recograph_store::{templates, GraphStore, Params};

use crate::error::GenerateError;

/// What a recommendation request is anchored to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seed {
    Customer(CustomerId),
    Product(ProductId),
}

impl Seed {
    pub fn id(&self) -> &str {
        match self {
            Seed::Customer(id) => id.as_str(),
            Seed::Product(id) => id.as_str(),
        }
    }
}

impl std::fmt::Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Seed::Customer(id) => write!(f, "customer:{id}"),
            Seed::Product(id) => write!(f, "product:{id}"),
        }
    }
}

/// Everything the traversal discovered for one seed.
#[derive(Debug, Default)]
pub struct CandidateSet {
    /// Candidate products keyed by id; merging already happened, so a
    /// product reached over several paths appears once.
    pub signals: HashMap<ProductId, SignalBundle>,
    /// Products the seed customer already purchased (empty for product
    /// seeds). The service applies the owned-filter from this.
    pub owned: BTreeSet<ProductId>,
}

/// Labels and relationships this traversal touches; checked against the
/// schema before the first query goes out.
const TRAVERSAL: TraversalSpec = TraversalSpec {
    labels: &["Customer", "Product"],
    relationships: &[("PURCHASED", &[]), ("CO_PURCHASED", &["weight"])],
};

/// Aggregated paths that reached one frontier product.
#[derive(Clone, Copy, Debug)]
struct PathState {
    /// Distinct paths from the origins to this product.
    paths: u64,
    /// Summed weight over those paths.
    weight_total: f64,
}

pub struct CandidateGenerator {
    store: Arc<dyn GraphStore>,
    schema: GraphSchema,
}

impl CandidateGenerator {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store, schema: GraphSchema::catalog() }
    }

    /// Collect candidate products within `max_hops` of the seed, stopping
    /// discovery once `max_candidates` distinct products have been seen.
    /// The bound is a resource guard: the result is a best-effort sample on
    /// dense graphs, not a global optimum.
    pub async fn generate(
        &self,
        seed: &Seed,
        max_hops: u32,
        max_candidates: usize,
    ) -> Result<CandidateSet, GenerateError> {
        self.schema.validate_traversal(&TRAVERSAL)?;
        self.resolve_seed(seed).await?;

        let origins = self.origins(seed).await?;
        let owned: BTreeSet<ProductId> = match seed {
            Seed::Customer(_) => origins.iter().map(|id| ProductId::new(id.clone())).collect(),
            Seed::Product(_) => BTreeSet::new(),
        };

        let mut signals: HashMap<ProductId, SignalBundle> = HashMap::new();
        let mut visited: HashSet<String> = origins.iter().cloned().collect();
        // BTreeMap keeps frontier ids sorted, so the batch query parameter
        // is identical across runs.
        let mut frontier: BTreeMap<String, PathState> = origins
            .iter()
            .map(|id| (id.clone(), PathState { paths: 1, weight_total: 0.0 }))
            .collect();
        let mut discovered = 0usize;

        for hop in 1..=max_hops {
            if frontier.is_empty() || discovered >= max_candidates {
                break;
            }

            let ids: Vec<String> = frontier.keys().cloned().collect();
            let rows = self
                .store
                .query(&templates::CO_PURCHASED_NEIGHBORS, Params::new().set("ids", ids))
                .await?;

            let mut next: BTreeMap<String, PathState> = BTreeMap::new();

            for row in rows {
                let query = templates::CO_PURCHASED_NEIGHBORS.name;
                let source = row.require_text(query, "source_id")?;
                let neighbor = row.require_text(query, "neighbor_id")?;
                // Weights are non-negative by construction; clamp rather
                // than crash if the dataset disagrees.
                let weight = row.require_f64(query, "weight")?.max(0.0);

                if neighbor == source {
                    continue;
                }
                if matches!(seed, Seed::Product(id) if id.as_str() == neighbor) {
                    continue;
                }
                let Some(state) = frontier.get(source) else {
                    continue;
                };

                // Every path to the source extends by this edge.
                let paths = state.paths;
                let weight_total = state.weight_total + weight * paths as f64;

                let product = ProductId::new(neighbor);
                let is_new = !signals.contains_key(&product);
                if is_new && discovered >= max_candidates {
                    continue;
                }
                if is_new {
                    discovered += 1;
                }
                signals.entry(product).or_default().observe(hop, weight_total, paths);

                if !visited.contains(neighbor) {
                    let entry = next
                        .entry(neighbor.to_string())
                        .or_insert(PathState { paths: 0, weight_total: 0.0 });
                    entry.paths += paths;
                    entry.weight_total += weight_total;
                }
            }

            visited.extend(next.keys().cloned());
            frontier = next;
        }

        debug!(
            event_name = "engine.generate.done",
            seed = %seed,
            candidates = signals.len(),
            owned = owned.len(),
            "candidate traversal finished"
        );

        Ok(CandidateSet { signals, owned })
    }

    async fn resolve_seed(&self, seed: &Seed) -> Result<(), GenerateError> {
        let template = match seed {
            Seed::Customer(_) => &templates::RESOLVE_CUSTOMER,
            Seed::Product(_) => &templates::RESOLVE_PRODUCT,
        };
        let rows = self.store.query(template, Params::new().set("id", seed.id())).await?;
        if rows.is_empty() {
            return Err(GenerateError::SeedNotFound(seed.id().to_string()));
        }
        Ok(())
    }

    /// Traversal origins: a product seed starts at itself; a customer seed
    /// starts at everything they purchased.
    async fn origins(&self, seed: &Seed) -> Result<Vec<String>, GenerateError> {
        match seed {
            Seed::Product(id) => Ok(vec![id.0.clone()]),
            Seed::Customer(id) => {
                let rows = self
                    .store
                    .query(&templates::CUSTOMER_PURCHASES, Params::new().set("id", id.as_str()))
                    .await?;

                let mut origins = Vec::with_capacity(rows.len());
                for row in rows {
                    origins.push(
                        row.require_text(templates::CUSTOMER_PURCHASES.name, "product_id")?
                            .to_string(),
                    );
                }

                if origins.is_empty() {
                    return Err(GenerateError::EmptyNeighborhood(id.0.clone()));
                }
                Ok(origins)
            }
        }
    }
}
