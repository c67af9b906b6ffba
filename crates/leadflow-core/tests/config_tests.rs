use leadflow_core::{Pipeline, PipelineConfig, PipelineError, SessionContext, Snapshot};
use leadflow_test_utils::{agent, InMemoryApi};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn config_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        cache_ttl_secs = 30
        phone_prefix = "+65"

        [[badge_tiers]]
        name = "Rookie"
        threshold = 0

        [[badge_tiers]]
        name = "Gold"
        threshold = 500
        "#
    )
    .unwrap();

    let config = PipelineConfig::load(file.path()).unwrap();
    assert_eq!(config.cache_ttl(), Duration::from_secs(30));
    assert_eq!(config.badge_tiers.len(), 2);

    let api = Arc::new(InMemoryApi::new());
    let pipeline = Pipeline::new(
        api,
        Arc::new(SessionContext::signed_in(agent("a1", "g1"))),
        config,
    );
    let progress = pipeline.badge_progress(250);
    assert_eq!(progress.current.map(|t| t.name), Some("Rookie".to_string()));
    assert!((progress.percent - 50.0).abs() < 1e-9);
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn snapshot_with_epoch_and_iso_timestamps() {
    let raw = r#"{
        "users": [{"id": "a1", "name": "Agent One", "role": "agent", "groupId": "g1"}],
        "prospects": [
            {"id": "p1", "uid": "a1", "groupId": "g1", "name": "Ali Baba", "phone": "+60123",
             "createdAt": {"_seconds": 1700000000, "_nanoseconds": 0}},
            {"id": "p2", "uid": "a1", "groupId": "g1", "name": "Siti", "phone": "+60456",
             "createdAt": "2024-01-05T08:00:00Z"},
            {"uid": "a1", "name": "No Id", "phone": "+60789"}
        ]
    }"#;
    let snapshot = Snapshot::from_json(raw).unwrap();
    assert_eq!(snapshot.prospects.len(), 2);
    assert!(snapshot.prospects.iter().all(|p| p.created_at.is_some()));
    assert_eq!(
        snapshot.report_for(&"a1".into()).unwrap().visible_prospects,
        2
    );
}
