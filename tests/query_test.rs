//! End-to-end tests for the query engine against a seeded fake provider.
//!
//! These cover the full path: table reference extraction, region attach,
//! on-demand materialization, tag normalization, the `json_get` accessor,
//! freshness policies, and the error taxonomy.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use cloudq::testing::{item, FakeProvider};
use cloudq::{CloudqError, EngineOptions, QueryEngine};

fn instance(id: &str, instance_type: &str, env: &str) -> cloudq::provider::ResourceItem {
    item(&[
        ("id", json!(id)),
        ("instance_type", json!(instance_type)),
        ("state", json!({"Code": 16, "Name": "running"})),
        ("tags", json!([{"Key": "env", "Value": env}])),
    ])
}

fn seeded_provider() -> FakeProvider {
    let provider = FakeProvider::new("us-east-1");
    provider.define_collection(
        "ec2",
        "instances",
        &["id"],
        "Instance",
        &["instance_type", "state", "tags"],
    );
    provider.seed(
        "ec2",
        "instances",
        "us-east-1",
        vec![
            instance("i-aaa", "t3.micro", "dev"),
            instance("i-bbb", "m5.large", "prod"),
            instance("i-ccc", "t3.small", "staging"),
        ],
    );
    provider
}

fn engine_with(provider: FakeProvider, ttl: Option<Duration>) -> (QueryEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut options = EngineOptions::new(dir.path());
    if let Some(ttl) = ttl {
        options = options.with_table_ttl(ttl);
    }
    let engine = QueryEngine::new(Arc::new(provider), options).unwrap();
    (engine, dir)
}

#[test]
fn test_tag_filter_end_to_end() {
    let (engine, _dir) = engine_with(seeded_provider(), None);
    let result = engine
        .execute("select id from ec2_instances where json_get(tags, 'env') = 'prod'")
        .unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0].values[0].as_deref(), Some("i-bbb"));
}

#[test]
fn test_select_star_matches_inferred_schema() {
    let (engine, _dir) = engine_with(seeded_provider(), None);
    let result = engine.execute("select * from ec2_instances").unwrap();
    // Sorted identifiers first, then attributes in declared order.
    assert_eq!(result.columns, vec!["id", "instance_type", "state", "tags"]);
    assert_eq!(result.row_count, 3);
}

#[test]
fn test_tags_are_stored_as_a_map() {
    let (engine, _dir) = engine_with(seeded_provider(), None);
    let result = engine
        .execute("select tags from ec2_instances where id = 'i-bbb'")
        .unwrap();
    let tags = result.rows[0].values[0].as_deref().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(tags).unwrap();
    assert_eq!(parsed, json!({"env": "prod"}));
}

#[test]
fn test_nested_state_reachable_through_json_get() {
    let (engine, _dir) = engine_with(seeded_provider(), None);
    let result = engine
        .execute(
            "select count(*) from ec2_instances where json_get(state, 'Name') = 'running'",
        )
        .unwrap();
    assert_eq!(result.rows[0].values[0].as_deref(), Some("3"));
}

#[test]
fn test_unknown_collection_names_resource_and_collection() {
    let (engine, _dir) = engine_with(seeded_provider(), None);
    let err = engine.execute("select * from ec2_gadgets").unwrap_err();
    assert!(matches!(err, CloudqError::Query(_)));
    let msg = err.to_string();
    assert!(msg.contains("gadgets"));
    assert!(msg.contains("ec2"));
}

#[test]
fn test_unknown_resource_kind_is_provider_error() {
    let (engine, _dir) = engine_with(seeded_provider(), None);
    let err = engine.execute("select * from dyna_tables").unwrap_err();
    assert!(matches!(err, CloudqError::Provider(_)));
}

#[test]
fn test_invalid_sql_is_query_error() {
    let (engine, _dir) = engine_with(seeded_provider(), None);
    let err = engine.execute("select definitely not valid sql from").unwrap_err();
    assert!(matches!(err, CloudqError::Query(_)));
}

#[test]
fn test_attach_is_idempotent_across_queries() {
    let (engine, _dir) = engine_with(seeded_provider(), None);
    engine.execute("select * from ec2_instances").unwrap();
    engine.execute("select * from ec2_instances").unwrap();

    let attached = engine.attached_regions().unwrap();
    let count = attached.iter().filter(|r| *r == "us_east_1").count();
    assert_eq!(count, 1);
}

#[test]
fn test_cross_region_join() {
    let provider = seeded_provider();
    provider.seed(
        "ec2",
        "instances",
        "eu-west-1",
        vec![instance("i-eee", "m5.large", "prod")],
    );
    let (engine, _dir) = engine_with(provider, None);

    let result = engine
        .execute(
            "select a.id, b.id from us_east_1.ec2_instances a \
             join eu_west_1.ec2_instances b \
             on json_get(a.tags, 'env') = json_get(b.tags, 'env')",
        )
        .unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0].values[0].as_deref(), Some("i-bbb"));
    assert_eq!(result.rows[0].values[1].as_deref(), Some("i-eee"));

    let attached = engine.attached_regions().unwrap();
    assert!(attached.contains(&"us_east_1".to_string()));
    assert!(attached.contains(&"eu_west_1".to_string()));
}

#[test]
fn test_ttl_policy_skips_reload_inside_window() {
    let provider = Arc::new(seeded_provider());
    let dir = tempfile::tempdir().unwrap();
    let options =
        EngineOptions::new(dir.path()).with_table_ttl(Duration::from_secs(3600));
    let engine = QueryEngine::new(provider.clone(), options).unwrap();

    engine.execute("select * from ec2_instances").unwrap();
    engine.execute("select * from ec2_instances").unwrap();
    assert_eq!(provider.fetch_count("ec2", "instances"), 1);
}

#[test]
fn test_always_stale_fetches_every_time() {
    let provider = Arc::new(seeded_provider());
    let dir = tempfile::tempdir().unwrap();
    let engine =
        QueryEngine::new(provider.clone(), EngineOptions::new(dir.path())).unwrap();

    engine.execute("select * from ec2_instances").unwrap();
    engine.execute("select * from ec2_instances").unwrap();
    assert_eq!(provider.fetch_count("ec2", "instances"), 2);
}

#[test]
fn test_reload_picks_up_new_items() {
    let provider = Arc::new(seeded_provider());
    let dir = tempfile::tempdir().unwrap();
    let engine =
        QueryEngine::new(provider.clone(), EngineOptions::new(dir.path())).unwrap();

    let before = engine.execute("select count(*) from ec2_instances").unwrap();
    assert_eq!(before.rows[0].values[0].as_deref(), Some("3"));

    provider.seed(
        "ec2",
        "instances",
        "us-east-1",
        vec![
            instance("i-aaa", "t3.micro", "dev"),
            instance("i-ddd", "c6i.large", "prod"),
        ],
    );
    let after = engine.execute("select count(*) from ec2_instances").unwrap();
    assert_eq!(after.rows[0].values[0].as_deref(), Some("2"));
}

#[test]
fn test_provider_failure_surfaces_unwrapped() {
    let provider = Arc::new(seeded_provider());
    let dir = tempfile::tempdir().unwrap();
    let engine =
        QueryEngine::new(provider.clone(), EngineOptions::new(dir.path())).unwrap();

    provider.fail_next_fetch("ec2", "instances", "rate exceeded");
    let err = engine.execute("select * from ec2_instances").unwrap_err();
    assert!(matches!(err, CloudqError::Provider(_)));
    assert!(err.to_string().contains("rate exceeded"));
}

#[test]
fn test_region_database_file_created() {
    let provider = seeded_provider();
    let dir = tempfile::tempdir().unwrap();
    let engine =
        QueryEngine::new(Arc::new(provider), EngineOptions::new(dir.path())).unwrap();
    engine.execute("select * from ec2_instances").unwrap();

    assert!(dir.path().join("us_east_1.db").exists());
}
