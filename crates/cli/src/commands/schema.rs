use recograph_core::schema::{Directionality, GraphSchema};

pub fn run(json_output: bool) -> String {
    let schema = GraphSchema::catalog();

    if json_output {
        return serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|error| format!("{{\"error\":\"serialization failed: {error}\"}}"));
    }

    let mut lines = vec!["graph schema:".to_string(), "  nodes:".to_string()];
    for node in schema.nodes() {
        lines.push(format!(
            "    (:{}) requires [{}]",
            node.label,
            node.required_properties.join(", ")
        ));
    }

    lines.push("  relationships:".to_string());
    for relationship in schema.relationships() {
        let arrow = match relationship.directionality {
            Directionality::Directed => "->",
            Directionality::Symmetric => "--",
        };
        let properties = if relationship.required_properties.is_empty() {
            String::new()
        } else {
            format!(" {{{}}}", relationship.required_properties.join(", "))
        };
        lines.push(format!(
            "    (:{}) -[:{}{properties}]{arrow} (:{})",
            relationship.start_label, relationship.name, relationship.end_label
        ));
    }

    lines.join("\n")
}
