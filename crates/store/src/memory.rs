//! In-memory graph backend.
//!
//! Answers the same named templates as the HTTP transport, against data
//! seeded through the methods below. Seeding models the external process
//! that owns the dataset: it derives `PURCHASED` edges and `CO_PURCHASED`
//! weights from orders, and the query side never mutates anything.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::prelude::ToPrimitive;
use tokio::sync::RwLock;

use recograph_core::domain::customer::Customer;
use recograph_core::domain::order::Order;
use recograph_core::domain::product::Product;

use crate::error::StoreError;
use crate::query::QueryTemplate;
use crate::store::GraphStore;
use crate::value::{Params, Row, Value};

#[derive(Default)]
struct GraphData {
    customers: BTreeMap<String, Customer>,
    products: BTreeMap<String, Product>,
    orders: Vec<Order>,
    /// Customer id -> purchased product ids.
    purchased: BTreeMap<String, BTreeSet<String>>,
    /// Symmetric adjacency, stored in both directions.
    co_purchased: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Default)]
pub struct InMemoryGraphStore {
    data: RwLock<GraphData>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_customer(&self, customer: Customer) {
        let mut data = self.data.write().await;
        data.customers.insert(customer.id.0.clone(), customer);
    }

    pub async fn seed_product(&self, product: Product) {
        let mut data = self.data.write().await;
        data.products.insert(product.id.0.clone(), product);
    }

    /// Ingest an order and recompute the derived edges it contributes.
    /// Lines referencing unknown products are skipped, matching the
    /// tolerate-dangling contract of the dataset.
    pub async fn seed_order(&self, order: Order) {
        let mut data = self.data.write().await;

        if !data.customers.contains_key(order.customer_id.as_str()) {
            return;
        }

        let known: Vec<String> = {
            let mut seen = BTreeSet::new();
            order
                .lines
                .iter()
                .filter(|line| data.products.contains_key(line.product_id.as_str()))
                .filter(|line| seen.insert(line.product_id.0.clone()))
                .map(|line| line.product_id.0.clone())
                .collect()
        };

        let owned = data.purchased.entry(order.customer_id.0.clone()).or_default();
        for product_id in &known {
            owned.insert(product_id.clone());
        }

        // Each order contributes one co-occurrence per unordered pair.
        for (index, left) in known.iter().enumerate() {
            for right in &known[index + 1..] {
                *data
                    .co_purchased
                    .entry(left.clone())
                    .or_default()
                    .entry(right.clone())
                    .or_insert(0.0) += 1.0;
                *data
                    .co_purchased
                    .entry(right.clone())
                    .or_default()
                    .entry(left.clone())
                    .or_insert(0.0) += 1.0;
            }
        }

        data.orders.push(order);
    }

    fn require_text_param(
        template: &QueryTemplate,
        params: &Params,
        name: &str,
    ) -> Result<String, StoreError> {
        params.get(name).and_then(Value::as_text).map(str::to_string).ok_or_else(|| {
            StoreError::MalformedQuery {
                query: template.name,
                message: format!("parameter `{name}` must be text"),
            }
        })
    }

    fn require_id_list_param(
        template: &QueryTemplate,
        params: &Params,
        name: &str,
    ) -> Result<Vec<String>, StoreError> {
        let list = params.get(name).and_then(Value::as_list).ok_or_else(|| {
            StoreError::MalformedQuery {
                query: template.name,
                message: format!("parameter `{name}` must be a list"),
            }
        })?;

        list.iter()
            .map(|value| {
                value.as_text().map(str::to_string).ok_or_else(|| StoreError::MalformedQuery {
                    query: template.name,
                    message: format!("parameter `{name}` must contain text ids"),
                })
            })
            .collect()
    }
}

fn product_row(product: &Product) -> Row {
    Row::new()
        .insert("id", product.id.as_str())
        .insert("name", product.name.as_str())
        .insert("category", product.category.as_str())
        .insert("price", product.price.to_f64().unwrap_or_default())
}

#[async_trait::async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn query(
        &self,
        template: &QueryTemplate,
        params: Params,
    ) -> Result<Vec<Row>, StoreError> {
        template.bind(&params)?;
        let data = self.data.read().await;

        match template.name {
            "ping" => Ok(vec![Row::new().insert("ok", 1i64)]),
            "resolve_customer" => {
                let id = Self::require_text_param(template, &params, "id")?;
                Ok(data
                    .customers
                    .contains_key(&id)
                    .then(|| Row::new().insert("id", id))
                    .into_iter()
                    .collect())
            }
            "resolve_product" => {
                let id = Self::require_text_param(template, &params, "id")?;
                Ok(data
                    .products
                    .contains_key(&id)
                    .then(|| Row::new().insert("id", id))
                    .into_iter()
                    .collect())
            }
            "customer_purchases" => {
                let id = Self::require_text_param(template, &params, "id")?;
                let owned = data.purchased.get(&id);
                Ok(owned
                    .into_iter()
                    .flatten()
                    .map(|product_id| Row::new().insert("product_id", product_id.as_str()))
                    .collect())
            }
            "co_purchased_neighbors" => {
                let ids = Self::require_id_list_param(template, &params, "ids")?;
                let mut rows = Vec::new();
                for source_id in ids {
                    let Some(neighbors) = data.co_purchased.get(&source_id) else {
                        continue;
                    };
                    for (neighbor_id, weight) in neighbors {
                        rows.push(
                            Row::new()
                                .insert("source_id", source_id.as_str())
                                .insert("neighbor_id", neighbor_id.as_str())
                                .insert("weight", *weight),
                        );
                    }
                }
                Ok(rows)
            }
            "products_by_ids" => {
                let ids = Self::require_id_list_param(template, &params, "ids")?;
                Ok(ids
                    .into_iter()
                    .filter_map(|id| data.products.get(&id))
                    .map(product_row)
                    .collect())
            }
            "list_products" => Ok(data.products.values().map(product_row).collect()),
            "list_customers" => Ok(data
                .customers
                .values()
                .map(|customer| {
                    let name = match &customer.name {
                        Some(name) => Value::Text(name.clone()),
                        None => Value::Null,
                    };
                    Row::new().insert("id", customer.id.as_str()).insert("name", name)
                })
                .collect()),
            "customer_stats" => {
                let id = Self::require_text_param(template, &params, "id")?;
                if !data.customers.contains_key(&id) {
                    return Ok(Vec::new());
                }
                let order_count = data
                    .orders
                    .iter()
                    .filter(|order| order.customer_id.as_str() == id)
                    .count() as i64;
                let product_count =
                    data.purchased.get(&id).map(BTreeSet::len).unwrap_or(0) as i64;
                Ok(vec![Row::new()
                    .insert("order_count", order_count)
                    .insert("product_count", product_count)])
            }
            other => Err(StoreError::MalformedQuery {
                query: template.name,
                message: format!("unsupported template `{other}`"),
            }),
        }
    }
}
