//! Static description of the property-graph schema the engine assumes.
//!
//! The seeding process owns the data; this model only records what must be
//! present so traversal specs can be checked before a query ever reaches the
//! backend. An unknown label or relationship fails fast here instead of
//! surfacing as an opaque backend error.

use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown node label `{0}`")]
    UnknownLabel(String),
    #[error("unknown relationship type `{0}`")]
    UnknownRelationship(String),
    #[error("relationship `{relationship}` does not declare property `{property}`")]
    MissingRelationshipProperty { relationship: String, property: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Directionality {
    /// Traversed start-to-end only.
    Directed,
    /// Undirected; one stored edge is traversable from both endpoints.
    Symmetric,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeDef {
    pub label: &'static str,
    pub required_properties: &'static [&'static str],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelationshipDef {
    pub name: &'static str,
    pub start_label: &'static str,
    pub end_label: &'static str,
    pub directionality: Directionality,
    pub required_properties: &'static [&'static str],
}

/// Node labels and relationship types the recommendation engine traverses or
/// reads. `CO_PURCHASED.weight` is the co-occurrence count across orders,
/// non-negative, maintained exclusively by seeding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphSchema {
    nodes: &'static [NodeDef],
    relationships: &'static [RelationshipDef],
}

const NODES: &[NodeDef] = &[
    NodeDef { label: "Customer", required_properties: &["id"] },
    NodeDef { label: "Product", required_properties: &["id", "name", "category", "price"] },
    NodeDef { label: "Order", required_properties: &["id", "placed_at"] },
];

const RELATIONSHIPS: &[RelationshipDef] = &[
    RelationshipDef {
        name: "PLACED",
        start_label: "Customer",
        end_label: "Order",
        directionality: Directionality::Directed,
        required_properties: &[],
    },
    RelationshipDef {
        name: "CONTAINS",
        start_label: "Order",
        end_label: "Product",
        directionality: Directionality::Directed,
        required_properties: &["quantity"],
    },
    RelationshipDef {
        name: "PURCHASED",
        start_label: "Customer",
        end_label: "Product",
        directionality: Directionality::Directed,
        required_properties: &[],
    },
    RelationshipDef {
        name: "CO_PURCHASED",
        start_label: "Product",
        end_label: "Product",
        directionality: Directionality::Symmetric,
        required_properties: &["weight"],
    },
    RelationshipDef {
        name: "SIMILAR_TO",
        start_label: "Product",
        end_label: "Product",
        directionality: Directionality::Symmetric,
        required_properties: &["score"],
    },
];

impl GraphSchema {
    /// The catalog schema every deployment of the engine assumes.
    pub const fn catalog() -> Self {
        Self { nodes: NODES, relationships: RELATIONSHIPS }
    }

    pub fn nodes(&self) -> &[NodeDef] {
        self.nodes
    }

    pub fn relationships(&self) -> &[RelationshipDef] {
        self.relationships
    }

    pub fn node(&self, label: &str) -> Result<&NodeDef, SchemaError> {
        self.nodes
            .iter()
            .find(|node| node.label == label)
            .ok_or_else(|| SchemaError::UnknownLabel(label.to_string()))
    }

    pub fn relationship(&self, name: &str) -> Result<&RelationshipDef, SchemaError> {
        self.relationships
            .iter()
            .find(|relationship| relationship.name == name)
            .ok_or_else(|| SchemaError::UnknownRelationship(name.to_string()))
    }

    /// Validate a traversal spec: every label and relationship it names must
    /// be declared, and every relationship property it reads must be
    /// required by the schema.
    pub fn validate_traversal(&self, spec: &TraversalSpec) -> Result<(), SchemaError> {
        for label in spec.labels {
            self.node(label)?;
        }
        for (relationship, properties) in spec.relationships {
            let def = self.relationship(relationship)?;
            for property in *properties {
                if !def.required_properties.contains(property) {
                    return Err(SchemaError::MissingRelationshipProperty {
                        relationship: (*relationship).to_string(),
                        property: (*property).to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for GraphSchema {
    fn default() -> Self {
        Self::catalog()
    }
}

/// The labels a traversal touches and, per relationship, the edge properties
/// it reads.
#[derive(Clone, Copy, Debug)]
pub struct TraversalSpec {
    pub labels: &'static [&'static str],
    pub relationships: &'static [(&'static str, &'static [&'static str])],
}

#[cfg(test)]
mod tests {
    use super::{GraphSchema, SchemaError, TraversalSpec};

    #[test]
    fn catalog_declares_co_purchased_weight() {
        let schema = GraphSchema::catalog();
        let relationship = schema.relationship("CO_PURCHASED").expect("relationship declared");
        assert!(relationship.required_properties.contains(&"weight"));
    }

    #[test]
    fn unknown_label_fails_fast() {
        let schema = GraphSchema::catalog();
        let spec = TraversalSpec { labels: &["Supplier"], relationships: &[] };

        assert_eq!(
            schema.validate_traversal(&spec),
            Err(SchemaError::UnknownLabel("Supplier".to_string()))
        );
    }

    #[test]
    fn unknown_relationship_fails_fast() {
        let schema = GraphSchema::catalog();
        let spec =
            TraversalSpec { labels: &["Product"], relationships: &[("VIEWED_WITH", &[])] };

        assert_eq!(
            schema.validate_traversal(&spec),
            Err(SchemaError::UnknownRelationship("VIEWED_WITH".to_string()))
        );
    }

    #[test]
    fn undeclared_edge_property_is_rejected() {
        let schema = GraphSchema::catalog();
        let spec = TraversalSpec {
            labels: &["Product"],
            relationships: &[("CO_PURCHASED", &["confidence"])],
        };

        assert!(matches!(
            schema.validate_traversal(&spec),
            Err(SchemaError::MissingRelationshipProperty { .. })
        ));
    }

    #[test]
    fn purchase_traversal_spec_is_valid() {
        let schema = GraphSchema::catalog();
        let spec = TraversalSpec {
            labels: &["Customer", "Product"],
            relationships: &[("PURCHASED", &[]), ("CO_PURCHASED", &["weight"])],
        };

        assert_eq!(schema.validate_traversal(&spec), Ok(()));
    }
}
