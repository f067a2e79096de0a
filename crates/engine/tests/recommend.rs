use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use recograph_core::domain::customer::{Customer, CustomerId};
use recograph_core::domain::order::{Order, OrderId, OrderLine};
use recograph_core::domain::product::{Product, ProductId};
use recograph_core::options::RecommendOptions;
use recograph_engine::{CandidateGenerator, RecommendError, Recommender, Seed};
use recograph_store::fixtures::demo_store;
use recograph_store::{GraphStore, InMemoryGraphStore, Params, QueryTemplate, Row, StoreError};

fn product(id: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        category: "test".to_string(),
        price: Decimal::new(1999, 2),
    }
}

fn order(id: &str, customer: &str, products: &[&str]) -> Order {
    Order {
        id: OrderId::new(id),
        customer_id: CustomerId::new(customer),
        placed_at: Utc::now(),
        lines: products
            .iter()
            .map(|product_id| OrderLine { product_id: ProductId::new(*product_id), quantity: 1 })
            .collect(),
    }
}

fn customer(id: &str) -> Customer {
    Customer { id: CustomerId::new(id), name: None }
}

/// Two customers, three products: A buys {P1, P2}, B buys {P1, P3}.
async fn two_customer_store() -> InMemoryGraphStore {
    let store = InMemoryGraphStore::new();
    store.seed_customer(customer("cust-a")).await;
    store.seed_customer(customer("cust-b")).await;
    for id in ["p1", "p2", "p3"] {
        store.seed_product(product(id)).await;
    }
    store.seed_order(order("o-a", "cust-a", &["p1", "p2"])).await;
    store.seed_order(order("o-b", "cust-b", &["p1", "p3"])).await;
    store
}

#[tokio::test]
async fn customer_without_history_gets_empty_result_not_error() {
    let store = two_customer_store().await;
    store.seed_customer(customer("cust-new")).await;
    let recommender = Recommender::new(Arc::new(store));

    let results = recommender
        .recommend(&Seed::Customer(CustomerId::new("cust-new")), &RecommendOptions::default())
        .await
        .expect("no purchase history is not an error");

    assert!(results.is_empty());
}

#[tokio::test]
async fn unknown_seed_is_an_error_never_an_empty_list() {
    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(store));

    let result = recommender
        .recommend(&Seed::Customer(CustomerId::new("cust-ghost")), &RecommendOptions::default())
        .await;

    assert!(matches!(result, Err(RecommendError::SeedNotFound(id)) if id == "cust-ghost"));
}

#[tokio::test]
async fn co_purchase_neighbor_of_owned_products_is_recommended() {
    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(store));

    let options = RecommendOptions::new().with_max_hops(1).with_top_k(5);
    let results = recommender
        .recommend(&Seed::Customer(CustomerId::new("cust-a")), &options)
        .await
        .expect("recommendation succeeds");

    // Only P3 is reachable and not owned: one co-purchase path through P1,
    // weight 1 at hop 1 → score 1.0.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].product.id, ProductId::new("p3"));
    assert!((results[0].score - 1.0).abs() < 1e-9);
    assert_eq!(results[0].explanation.hop_distance, 1);
    assert_eq!(results[0].explanation.path_count, 1);
}

#[tokio::test]
async fn owned_products_never_appear_when_excluded() {
    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(store));

    let options = RecommendOptions::new().with_max_hops(2).with_exclude_owned(true);
    let results = recommender
        .recommend(&Seed::Customer(CustomerId::new("cust-a")), &options)
        .await
        .expect("recommendation succeeds");

    for recommendation in &results {
        assert_ne!(recommendation.product.id, ProductId::new("p1"));
        assert_ne!(recommendation.product.id, ProductId::new("p2"));
    }
}

#[tokio::test]
async fn owned_products_may_reappear_when_not_excluded() {
    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(store));

    let options = RecommendOptions::new().with_max_hops(1).with_exclude_owned(false);
    let results = recommender
        .recommend(&Seed::Customer(CustomerId::new("cust-a")), &options)
        .await
        .expect("recommendation succeeds");

    let ids: Vec<&str> =
        results.iter().map(|recommendation| recommendation.product.id.as_str()).collect();
    assert!(ids.contains(&"p2"), "owned neighbor should be eligible again: {ids:?}");
    assert!(ids.contains(&"p3"));
}

#[tokio::test]
async fn output_is_sorted_and_reproducible() {
    let store = demo_store().await;
    let recommender = Recommender::new(Arc::new(store));
    let seed = Seed::Customer(CustomerId::new("alice"));
    let options = RecommendOptions::new().with_max_hops(2).with_top_k(10);

    let first = recommender.recommend(&seed, &options).await.expect("first run");
    let second = recommender.recommend(&seed, &options).await.expect("second run");

    assert!(!first.is_empty());
    assert_eq!(first, second, "identical graph state must rank identically");

    for pair in first.windows(2) {
        assert!(pair[0].score >= pair[1].score, "scores must be non-increasing");
    }
}

#[tokio::test]
async fn result_length_is_bounded_by_top_k() {
    let store = demo_store().await;
    let recommender = Recommender::new(Arc::new(store));
    let seed = Seed::Customer(CustomerId::new("alice"));

    for top_k in [1usize, 2, 3, 50] {
        let options = RecommendOptions::new().with_max_hops(2).with_top_k(top_k);
        let results = recommender.recommend(&seed, &options).await.expect("recommendation");
        assert!(results.len() <= top_k);
    }
}

#[tokio::test]
async fn product_seed_recommends_its_neighborhood() {
    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(store));

    let options = RecommendOptions::new().with_max_hops(1).with_top_k(5);
    let results = recommender
        .recommend(&Seed::Product(ProductId::new("p1")), &options)
        .await
        .expect("recommendation succeeds");

    let ids: Vec<&str> =
        results.iter().map(|recommendation| recommendation.product.id.as_str()).collect();
    assert_eq!(ids, vec!["p2", "p3"], "seed itself is never a candidate");
}

#[tokio::test]
async fn widening_max_hops_never_shrinks_the_candidate_set() {
    let store = InMemoryGraphStore::new();
    store.seed_customer(customer("u1")).await;
    store.seed_customer(customer("u2")).await;
    store.seed_customer(customer("u3")).await;
    for id in ["p1", "p2", "p3"] {
        store.seed_product(product(id)).await;
    }
    // Chain: p1 - p2 - p3.
    store.seed_order(order("o1", "u1", &["p1"])).await;
    store.seed_order(order("o2", "u2", &["p1", "p2"])).await;
    store.seed_order(order("o3", "u3", &["p2", "p3"])).await;

    let store = Arc::new(store);
    let generator = CandidateGenerator::new(store as Arc<dyn GraphStore>);
    let seed = Seed::Customer(CustomerId::new("u1"));

    let narrow = generator.generate(&seed, 1, 200).await.expect("one hop");
    let wide = generator.generate(&seed, 2, 200).await.expect("two hops");

    assert!(narrow.signals.len() <= wide.signals.len());
    for product_id in narrow.signals.keys() {
        assert!(wide.signals.contains_key(product_id), "hop widening lost {product_id}");
    }
    assert!(wide.signals.contains_key(&ProductId::new("p3")), "two hops should reach p3");
}

#[tokio::test]
async fn discovery_stops_at_max_candidates() {
    let store = InMemoryGraphStore::new();
    store.seed_customer(customer("hub-buyer")).await;
    store.seed_product(product("hub")).await;
    for index in 0..20 {
        store.seed_product(product(&format!("spoke-{index:02}"))).await;
        store.seed_customer(customer(&format!("other-{index:02}"))).await;
        store
            .seed_order(order(
                &format!("o-{index:02}"),
                &format!("other-{index:02}"),
                &["hub", &format!("spoke-{index:02}")],
            ))
            .await;
    }
    store.seed_order(order("o-hub", "hub-buyer", &["hub"])).await;

    let generator = CandidateGenerator::new(Arc::new(store));
    let candidates = generator
        .generate(&Seed::Customer(CustomerId::new("hub-buyer")), 2, 5)
        .await
        .expect("bounded traversal");

    assert_eq!(candidates.signals.len(), 5);
}

#[tokio::test]
async fn invalid_options_fail_before_any_query() {
    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(store));

    let options = RecommendOptions::new().with_max_hops(0);
    let result =
        recommender.recommend(&Seed::Customer(CustomerId::new("cust-a")), &options).await;

    assert!(matches!(result, Err(RecommendError::InvalidOptions(_))));
}

#[tokio::test]
async fn deadline_expiry_yields_timeout_not_partial_output() {
    struct SlowStore(InMemoryGraphStore);

    #[async_trait::async_trait]
    impl GraphStore for SlowStore {
        async fn query(
            &self,
            template: &QueryTemplate,
            params: Params,
        ) -> Result<Vec<Row>, StoreError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.query(template, params).await
        }
    }

    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(SlowStore(store)));

    let options = RecommendOptions::new().with_deadline(Duration::from_millis(10));
    let result =
        recommender.recommend(&Seed::Customer(CustomerId::new("cust-a")), &options).await;

    match result {
        Err(RecommendError::DeadlineExceeded(deadline)) => {
            assert_eq!(deadline, Duration::from_millis(10));
        }
        other => panic!("expected deadline error, got {other:?}"),
    }
}

#[tokio::test]
async fn dangling_candidates_are_skipped_not_fatal() {
    // Answers traversal queries with a neighbor that has no catalog entry.
    struct DanglingStore(InMemoryGraphStore);

    #[async_trait::async_trait]
    impl GraphStore for DanglingStore {
        async fn query(
            &self,
            template: &QueryTemplate,
            params: Params,
        ) -> Result<Vec<Row>, StoreError> {
            let mut rows = self.0.query(template, params).await?;
            if template.name == "co_purchased_neighbors" {
                rows.push(
                    Row::new()
                        .insert("source_id", "p1")
                        .insert("neighbor_id", "p-deleted")
                        .insert("weight", 9.0),
                );
            }
            Ok(rows)
        }
    }

    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(DanglingStore(store)));

    let options = RecommendOptions::new().with_max_hops(1).with_top_k(5);
    let results = recommender
        .recommend(&Seed::Customer(CustomerId::new("cust-a")), &options)
        .await
        .expect("dangling reference must not fail the request");

    let ids: Vec<&str> =
        results.iter().map(|recommendation| recommendation.product.id.as_str()).collect();
    assert!(!ids.contains(&"p-deleted"));
    assert!(ids.contains(&"p3"));
}

#[tokio::test]
async fn customer_stats_summarize_purchase_history() {
    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(store));

    let stats = recommender
        .customer_stats(&CustomerId::new("cust-a"))
        .await
        .expect("stats for existing customer");

    assert_eq!(stats.order_count, 1);
    assert_eq!(stats.distinct_products, 2);

    let missing = recommender.customer_stats(&CustomerId::new("cust-ghost")).await;
    assert!(matches!(missing, Err(RecommendError::SeedNotFound(_))));
}

#[tokio::test]
async fn neighborhood_assembles_nodes_and_symmetric_edges() {
    let store = two_customer_store().await;
    let recommender = Recommender::new(Arc::new(store));

    let neighborhood = recommender
        .neighborhood(&Seed::Customer(CustomerId::new("cust-a")), 2)
        .await
        .expect("neighborhood for existing customer");

    let node_ids: Vec<&str> =
        neighborhood.nodes.iter().map(|node| node.id.as_str()).collect();
    assert!(node_ids.contains(&"cust-a"));
    assert!(node_ids.contains(&"p1"));
    assert!(node_ids.contains(&"p3"));

    let purchased = neighborhood
        .edges
        .iter()
        .filter(|edge| edge.relationship == "PURCHASED")
        .count();
    assert_eq!(purchased, 2);

    // Symmetric relationship appears once per pair.
    let co_purchased: Vec<_> = neighborhood
        .edges
        .iter()
        .filter(|edge| edge.relationship == "CO_PURCHASED")
        .collect();
    assert_eq!(co_purchased.len(), 2);

    let out_of_range = recommender
        .neighborhood(&Seed::Customer(CustomerId::new("cust-a")), 9)
        .await;
    assert!(matches!(out_of_range, Err(RecommendError::InvalidOptions(_))));
}

#[tokio::test]
async fn listings_expose_the_catalog() {
    let store = demo_store().await;
    let recommender = Recommender::new(Arc::new(store));

    let products = recommender.list_products().await.expect("product listing");
    assert_eq!(products.len(), 11);
    assert!(products.iter().any(|product| product.id == ProductId::new("laptop")));

    let customers = recommender.list_customers().await.expect("customer listing");
    assert_eq!(customers.len(), 5);
}
