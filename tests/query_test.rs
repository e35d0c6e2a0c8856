use serde_json::{json, Value};

use typeahead::config::{EndpointConfig, OrderSpec};
use typeahead::endpoint::serialize_records;
use typeahead::query::{self, RequestContext};
use typeahead::store::MemoryStore;
use typeahead::{Error, Record};

fn record(value: Value) -> Record {
    serde_json::from_value(value).unwrap()
}

fn brand_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_collection(
        "brands",
        vec![
            record(json!({"id": 1, "name": "John", "country": "US", "active": true})),
            record(json!({"id": 2, "name": "Joanna", "country": "FR", "active": false})),
            record(json!({"id": 3, "name": "Jose", "country": "ES", "active": true})),
            record(json!({"id": 4, "name": "Amy", "country": "US", "active": true})),
        ],
    );
    store
}

fn brand_config() -> EndpointConfig {
    EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .build()
        .unwrap()
}

fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get("name").unwrap().as_str().unwrap().to_string())
        .collect()
}

#[test]
fn blank_term_returns_empty_without_touching_store() {
    // The store has no `brands` collection at all: a non-blank term would
    // fail with UnknownCollection, so an Ok(empty) proves the short-circuit.
    let store = MemoryStore::new();
    let ctx = RequestContext::default();
    let config = brand_config();

    let results = query::run(&store, &ctx, &config, "").unwrap();
    assert!(results.is_empty());

    let results = query::run(&store, &ctx, &config, "   ").unwrap();
    assert!(results.is_empty());

    let err = query::run(&store, &ctx, &config, "jo").unwrap_err();
    assert!(matches!(err, Error::UnknownCollection(_)));
}

#[test]
fn prefix_match_is_case_insensitive() {
    let store = brand_store();
    let ctx = RequestContext::default();
    let config = brand_config();

    let results = query::run(&store, &ctx, &config, "JO").unwrap();
    assert_eq!(names(&results), vec!["Joanna", "John", "Jose"]);

    // Prefix match only: "ose" is inside "Jose" but not a prefix
    let results = query::run(&store, &ctx, &config, "ose").unwrap();
    assert!(results.is_empty());
}

#[test]
fn full_search_matches_substrings() {
    let store = brand_store();
    let ctx = RequestContext::default();
    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .full(true)
        .build()
        .unwrap();

    let results = query::run(&store, &ctx, &config, "ose").unwrap();
    assert_eq!(names(&results), vec!["Jose"]);
}

#[test]
fn results_are_truncated_to_limit() {
    let mut store = MemoryStore::new();
    let records: Vec<Record> = (0..15)
        .map(|i| record(json!({"id": i, "name": format!("widget {i:02}")})))
        .collect();
    store.insert_collection("widgets", records);
    let ctx = RequestContext::default();

    // Default limit is 10
    let config = EndpointConfig::builder("widget", vec!["name".to_string()])
        .class("widgets")
        .build()
        .unwrap();
    let results = query::run(&store, &ctx, &config, "widget").unwrap();
    assert_eq!(results.len(), 10);

    let config = EndpointConfig::builder("widget", vec!["name".to_string()])
        .class("widgets")
        .limit(3)
        .build()
        .unwrap();
    let results = query::run(&store, &ctx, &config, "widget").unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn default_order_is_first_column_ascending() {
    let store = brand_store();
    let ctx = RequestContext::default();

    let results = query::run(&store, &ctx, &brand_config(), "j").unwrap();
    assert_eq!(names(&results), vec!["Joanna", "John", "Jose"]);

    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .order(OrderSpec::desc("name"))
        .build()
        .unwrap();
    let results = query::run(&store, &ctx, &config, "j").unwrap();
    assert_eq!(names(&results), vec!["Jose", "John", "Joanna"]);
}

#[test]
fn multiple_columns_match_with_or() {
    let store = brand_store();
    let ctx = RequestContext::default();
    let config = EndpointConfig::builder("brand", vec!["name".to_string(), "country".to_string()])
        .class("brands")
        .build()
        .unwrap();

    // "u" prefixes "US" but no name; both US brands match via country
    let results = query::run(&store, &ctx, &config, "u").unwrap();
    assert_eq!(names(&results), vec!["Amy", "John"]);
}

#[test]
fn scopes_narrow_before_the_search_filter() {
    let mut store = brand_store();
    store
        .register_scope("brands", "active", |r| {
            r.get("active") == Some(&Value::Bool(true))
        })
        .unwrap();
    let ctx = RequestContext::default();

    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .scope("active")
        .build()
        .unwrap();
    let results = query::run(&store, &ctx, &config, "jo").unwrap();
    // Joanna is inactive and filtered out by the scope
    assert_eq!(names(&results), vec!["John", "Jose"]);
}

#[test]
fn unknown_scope_is_an_error() {
    let store = brand_store();
    let ctx = RequestContext::default();
    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .scope("missing")
        .build()
        .unwrap();

    let err = query::run(&store, &ctx, &config, "jo").unwrap_err();
    assert!(matches!(err, Error::UnknownScope { .. }));
}

#[test]
fn where_filter_intersects_the_match() {
    let store = brand_store();
    let ctx = RequestContext::default();
    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .where_eq("country", json!("US"))
        .build()
        .unwrap();

    let results = query::run(&store, &ctx, &config, "jo").unwrap();
    assert_eq!(names(&results), vec!["John"]);
}

#[test]
fn projection_keeps_id_columns_and_extra_data() {
    let store = brand_store();
    let ctx = RequestContext::default();

    let results = query::run(&store, &ctx, &brand_config(), "john").unwrap();
    assert_eq!(results.len(), 1);
    // `country` and `active` are projected away
    assert_eq!(results[0], record(json!({"id": 1, "name": "John"})));

    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .extra_data(vec!["country".to_string()])
        .build()
        .unwrap();
    let results = query::run(&store, &ctx, &config, "john").unwrap();
    assert_eq!(
        results[0],
        record(json!({"id": 1, "name": "John", "country": "US"}))
    );
}

#[test]
fn full_model_skips_projection() {
    let store = brand_store();
    let ctx = RequestContext::default();
    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .full_model(true)
        .build()
        .unwrap();

    let results = query::run(&store, &ctx, &config, "john").unwrap();
    assert_eq!(
        results[0],
        record(json!({"id": 1, "name": "John", "country": "US", "active": true}))
    );
}

#[test]
fn relation_resolves_collection_from_the_request() {
    let mut store = MemoryStore::new();
    store.insert_collection("eu_brands", vec![record(json!({"id": 1, "name": "Jose"}))]);
    store.insert_collection("us_brands", vec![record(json!({"id": 2, "name": "John"}))]);

    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .relation(|ctx: &RequestContext| {
            format!("{}_brands", ctx.param("region").unwrap_or("us"))
        })
        .build()
        .unwrap();

    let ctx = RequestContext::new(
        [("region".to_string(), "eu".to_string())].into_iter().collect(),
    );
    let results = query::run(&store, &ctx, &config, "jo").unwrap();
    assert_eq!(names(&results), vec!["Jose"]);

    let results = query::run(&store, &RequestContext::default(), &config, "jo").unwrap();
    assert_eq!(names(&results), vec!["John"]);
}

#[test]
fn missing_source_is_a_configuration_error() {
    let err = EndpointConfig::builder("brand", vec!["name".to_string()])
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn class_name_wins_over_relation() {
    let mut store = MemoryStore::new();
    store.insert_collection("brands", vec![record(json!({"id": 1, "name": "John"}))]);

    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .relation(|_: &RequestContext| "nowhere".to_string())
        .class_name("brands")
        .build()
        .unwrap();

    let results = query::run(&store, &RequestContext::default(), &config, "jo").unwrap();
    assert_eq!(names(&results), vec!["John"]);
}

#[test]
fn empty_columns_and_zero_limit_are_rejected() {
    let err = EndpointConfig::builder("brand", Vec::new())
        .class("brands")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::NoColumns(_)));

    let err = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .limit(0)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidLimit(_)));
}

#[test]
fn default_serialization_shape() {
    let store = brand_store();
    let ctx = RequestContext::default();
    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .limit(2)
        .build()
        .unwrap();

    let results = query::run(&store, &ctx, &config, "jo").unwrap();
    let body = serialize_records(&results, &config).unwrap();

    assert_eq!(
        body,
        json!([
            {"id": "2", "label": "Joanna", "value": "Joanna", "name": "Joanna"},
            {"id": "1", "label": "John", "value": "John", "name": "John"},
        ])
    );
}

#[test]
fn serialization_includes_extra_data_and_display_value() {
    let store = brand_store();
    let ctx = RequestContext::default();
    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .display_value("country")
        .extra_data(vec!["country".to_string()])
        .build()
        .unwrap();

    let results = query::run(&store, &ctx, &config, "john").unwrap();
    let body = serialize_records(&results, &config).unwrap();

    assert_eq!(
        body,
        json!([
            {"id": "1", "label": "US", "value": "US", "name": "John", "country": "US"},
        ])
    );
}

#[test]
fn serializing_an_undeclared_field_fails() {
    let store = brand_store();
    let ctx = RequestContext::default();
    // `country` is neither a column nor extra data, so the projection drops
    // it and the display lookup fails at serialization time.
    let config = EndpointConfig::builder("brand", vec!["name".to_string()])
        .class("brands")
        .display_value("country")
        .build()
        .unwrap();

    let results = query::run(&store, &ctx, &config, "john").unwrap();
    let err = serialize_records(&results, &config).unwrap_err();
    assert!(matches!(err, Error::UnknownField(_)));
}
