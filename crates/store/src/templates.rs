//! Every query the engine issues, in one place.
//!
//! Backend query syntax stays below this line; callers refer to templates by
//! name and never see pattern syntax. All templates are reads, since the
//! engine has no write path.

use crate::query::QueryTemplate;

/// Connectivity probe.
pub const PING: QueryTemplate = QueryTemplate::read("ping", "RETURN 1 AS ok", &[]);

/// Resolve a customer seed. Zero rows means the seed does not exist.
pub const RESOLVE_CUSTOMER: QueryTemplate = QueryTemplate::read(
    "resolve_customer",
    "MATCH (c:Customer {id: $id}) RETURN c.id AS id",
    &["id"],
);

/// Resolve a product seed. Zero rows means the seed does not exist.
pub const RESOLVE_PRODUCT: QueryTemplate = QueryTemplate::read(
    "resolve_product",
    "MATCH (p:Product {id: $id}) RETURN p.id AS id",
    &["id"],
);

/// Products a customer has purchased, deduplicated.
pub const CUSTOMER_PURCHASES: QueryTemplate = QueryTemplate::read(
    "customer_purchases",
    "MATCH (c:Customer {id: $id})-[:PURCHASED]->(p:Product) \
     RETURN DISTINCT p.id AS product_id \
     ORDER BY product_id",
    &["id"],
);

/// One traversal frontier step: co-purchase neighbors of a batch of
/// products, with edge weights. The relationship is symmetric, so the
/// pattern is undirected.
pub const CO_PURCHASED_NEIGHBORS: QueryTemplate = QueryTemplate::read(
    "co_purchased_neighbors",
    "UNWIND $ids AS pid \
     MATCH (p:Product {id: pid})-[e:CO_PURCHASED]-(q:Product) \
     RETURN p.id AS source_id, q.id AS neighbor_id, e.weight AS weight \
     ORDER BY source_id, neighbor_id",
    &["ids"],
);

/// Display attributes for a batch of products.
pub const PRODUCTS_BY_IDS: QueryTemplate = QueryTemplate::read(
    "products_by_ids",
    "UNWIND $ids AS pid \
     MATCH (p:Product {id: pid}) \
     RETURN p.id AS id, p.name AS name, p.category AS category, p.price AS price",
    &["ids"],
);

/// Catalog listing, ordered for stable output.
pub const LIST_PRODUCTS: QueryTemplate = QueryTemplate::read(
    "list_products",
    "MATCH (p:Product) \
     RETURN p.id AS id, p.name AS name, p.category AS category, p.price AS price \
     ORDER BY id",
    &[],
);

pub const LIST_CUSTOMERS: QueryTemplate = QueryTemplate::read(
    "list_customers",
    "MATCH (c:Customer) RETURN c.id AS id, c.name AS name ORDER BY id",
    &[],
);

/// Purchase-history summary for a customer.
pub const CUSTOMER_STATS: QueryTemplate = QueryTemplate::read(
    "customer_stats",
    "MATCH (c:Customer {id: $id}) \
     OPTIONAL MATCH (c)-[:PLACED]->(o:Order) \
     WITH c, count(o) AS order_count \
     OPTIONAL MATCH (c)-[:PURCHASED]->(p:Product) \
     RETURN order_count, count(DISTINCT p) AS product_count",
    &["id"],
);

/// All read templates, for validation sweeps in tooling and tests.
pub const ALL: &[QueryTemplate] = &[
    PING,
    RESOLVE_CUSTOMER,
    RESOLVE_PRODUCT,
    CUSTOMER_PURCHASES,
    CO_PURCHASED_NEIGHBORS,
    PRODUCTS_BY_IDS,
    LIST_PRODUCTS,
    LIST_CUSTOMERS,
    CUSTOMER_STATS,
];

#[cfg(test)]
mod tests {
    use super::ALL;
    use crate::value::Params;

    #[test]
    fn every_template_declares_its_placeholders() {
        for template in ALL {
            let mut params = Params::new();
            for name in template.parameters {
                params = params.set(*name, "probe");
            }
            template
                .bind(&params)
                .unwrap_or_else(|error| panic!("template {} failed: {error}", template.name));
        }
    }

    #[test]
    fn all_templates_are_reads() {
        for template in ALL {
            assert!(template.is_read(), "template {} must be a read", template.name);
        }
    }
}
