use shacl_transformer::{Config, ConvertOptions, FileType, Source, TransformService};

fn live_config() -> Config {
    let config = Config::load().expect("configuration");
    assert!(
        config.anthropic_api_key.is_some(),
        "ANTHROPIC_API_KEY must be set for live validation"
    );
    config
}

#[tokio::test]
#[ignore = "Requires a live Anthropic API key"]
async fn live_json_schema_conversion_returns_turtle() {
    let config = live_config();
    let service = TransformService::from_config(&config, false).expect("service");
    let schema = br#"{
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "Person",
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "age": { "type": "integer", "minimum": 0 }
        },
        "required": ["name"]
    }"#;
    let source = Source::from_reader(&schema[..], Some("person.schema.json".to_string()), None)
        .await
        .expect("source");
    assert_eq!(source.file_type(), FileType::JsonSchema);

    let shapes = service
        .convert(&source, &ConvertOptions::default())
        .await
        .expect("conversion");

    assert!(!shapes.starts_with("```"), "fences should be stripped: {shapes}");
    assert!(shapes.contains("sh:NodeShape"), "unexpected output: {shapes}");
}

#[tokio::test]
#[ignore = "Requires a live Anthropic API key"]
async fn live_upgrade_keeps_shape_names() {
    let config = live_config();
    let service = TransformService::from_config(&config, false).expect("service");
    let legacy = b"@prefix sh: <http://www.w3.org/ns/shacl#> .\n\
        @prefix ex: <http://example.org/> .\n\
        ex:PersonShape a sh:NodeShape ; sh:targetClass ex:Person ;\n\
        sh:property [ sh:path ex:name ; sh:minCount 1 ] .\n";
    let source = Source::from_reader(&legacy[..], Some("legacy.ttl".to_string()), None)
        .await
        .expect("source");
    assert_eq!(source.file_type(), FileType::Shacl1);

    let shapes = service
        .convert(&source, &ConvertOptions::default())
        .await
        .expect("upgrade");

    assert!(shapes.contains("PersonShape"), "unexpected output: {shapes}");
}
