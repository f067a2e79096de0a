use recograph_cli::commands::schema;

#[test]
fn schema_command_renders_the_catalog_model() {
    let output = schema::run(false);

    assert!(output.contains("(:Customer)"));
    assert!(output.contains("CO_PURCHASED"));
    assert!(output.contains("{weight}"));
    // Symmetric relationships render undirected.
    assert!(output.contains("]-- (:Product)"));
}

#[test]
fn schema_command_emits_valid_json() {
    let output = schema::run(true);

    let parsed: serde_json::Value =
        serde_json::from_str(&output).expect("schema JSON output must parse");
    let relationships =
        parsed["relationships"].as_array().expect("relationships array present");
    assert!(relationships
        .iter()
        .any(|relationship| relationship["name"] == "CO_PURCHASED"));
}
