//! Deterministic demo dataset for tests and local development.
//!
//! Mirrors the shape the external seeding process produces: a small retail
//! catalog, a handful of customers, and orders from which the purchase and
//! co-purchase edges are derived.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use recograph_core::domain::customer::{Customer, CustomerId};
use recograph_core::domain::order::{Order, OrderId, OrderLine};
use recograph_core::domain::product::{Product, ProductId};

use crate::memory::InMemoryGraphStore;

const PRODUCTS: &[(&str, &str, &str, i64)] = &[
    ("headphones", "Wireless Headphones", "electronics", 12999),
    ("smartphone", "Smartphone", "electronics", 59999),
    ("laptop", "Laptop", "electronics", 129999),
    ("ereader", "E-Reader", "electronics", 11999),
    ("sci-fi-novel", "Science Fiction Novel", "books", 1499),
    ("programming-guide", "Programming Guide", "books", 3999),
    ("cookbook", "Cooking Book", "books", 2499),
    ("coffee-maker", "Coffee Maker", "home", 7999),
    ("blender", "Blender", "home", 4999),
    ("yoga-mat", "Yoga Mat", "sports", 2999),
    ("running-shoes", "Running Shoes", "sports", 8999),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("alice", "Alice"),
    ("bob", "Bob"),
    ("charlie", "Charlie"),
    ("diana", "Diana"),
    ("eve", "Eve"),
];

const ORDERS: &[(&str, &str, &[&str])] = &[
    ("o-1001", "alice", &["headphones", "smartphone"]),
    ("o-1002", "alice", &["laptop", "programming-guide"]),
    ("o-1003", "bob", &["headphones", "ereader"]),
    ("o-1004", "bob", &["smartphone", "headphones"]),
    ("o-1005", "charlie", &["programming-guide", "laptop", "coffee-maker"]),
    ("o-1006", "diana", &["yoga-mat", "running-shoes"]),
    ("o-1007", "diana", &["cookbook", "blender", "coffee-maker"]),
    ("o-1008", "eve", &["sci-fi-novel", "ereader"]),
    ("o-1009", "eve", &["headphones", "sci-fi-novel"]),
];

/// Build an in-memory store seeded with the demo dataset.
pub async fn demo_store() -> InMemoryGraphStore {
    let store = InMemoryGraphStore::new();

    for (id, name, category, cents) in PRODUCTS {
        store
            .seed_product(Product {
                id: ProductId::new(*id),
                name: (*name).to_string(),
                category: (*category).to_string(),
                price: Decimal::new(*cents, 2),
            })
            .await;
    }

    for (id, name) in CUSTOMERS {
        store
            .seed_customer(Customer {
                id: CustomerId::new(*id),
                name: Some((*name).to_string()),
            })
            .await;
    }

    for (index, (id, customer, products)) in ORDERS.iter().enumerate() {
        let placed_at = Utc
            .with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
            + chrono::Duration::days(index as i64);

        store
            .seed_order(Order {
                id: OrderId::new(*id),
                customer_id: CustomerId::new(*customer),
                placed_at,
                lines: products
                    .iter()
                    .map(|product_id| OrderLine {
                        product_id: ProductId::new(*product_id),
                        quantity: 1,
                    })
                    .collect(),
            })
            .await;
    }

    store
}

#[cfg(test)]
mod tests {
    use super::demo_store;
    use crate::store::GraphStore;
    use crate::templates;
    use crate::value::Params;

    #[tokio::test]
    async fn demo_dataset_is_fully_connected_through_orders() {
        let store = demo_store().await;

        let products = store
            .query(&templates::LIST_PRODUCTS, Params::new())
            .await
            .expect("list products");
        assert_eq!(products.len(), 11);

        let purchases = store
            .query(&templates::CUSTOMER_PURCHASES, Params::new().set("id", "alice"))
            .await
            .expect("alice purchases");
        assert_eq!(purchases.len(), 4);
    }
}
