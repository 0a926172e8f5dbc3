use std::path::PathBuf;

use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use httpmock::prelude::*;
use relay_core::{HttpSettings, RelayConfig};
use serde_json::{json, Value};
use tempfile::tempdir;

use super::{build_poll_loop, inspect_store, run_once};

const WEBHOOK_PATH: &str = "/api/webhooks/1/token";

fn test_config(server: &MockServer, state_path: PathBuf) -> RelayConfig {
    let mut config = RelayConfig::with_webhook_url(server.url(WEBHOOK_PATH));
    config.feed_url = server.url("/api/v2/incidents.json");
    config.state_path = state_path;
    config.http = HttpSettings {
        request_timeout_ms: 2_000,
        retry_max_attempts: 2,
        retry_base_delay_ms: 1,
    };
    config
}

fn feed_body(update_ids: &[&str]) -> Value {
    let created = (Utc::now() - ChronoDuration::hours(2)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let updates = update_ids
        .iter()
        .rev()
        .enumerate()
        .map(|(offset, id)| {
            let at = (Utc::now() - ChronoDuration::minutes(offset as i64 + 1))
                .to_rfc3339_opts(SecondsFormat::Secs, true);
            json!({"id": id, "status": "investigating", "body": format!("update {id}"), "created_at": at})
        })
        .collect::<Vec<_>>();
    json!({
        "page": {"id": "srhpyqt94yxb"},
        "incidents": [{
            "id": "inc-1",
            "name": "Elevated Error Rates",
            "status": "investigating",
            "created_at": created,
            "impact": "major",
            "shortlink": "https://stspg.io/abc",
            "components": [{"name": "API"}],
            "incident_updates": updates
        }]
    })
}

#[tokio::test]
async fn integration_run_once_mirrors_feed_and_persists_entry() {
    let server = MockServer::start();
    let feed = server.mock(|when, then| {
        when.method(GET).path("/api/v2/incidents.json");
        then.status(200).json_body(feed_body(&["u1", "u2"]));
    });
    let execute = server.mock(|when, then| {
        when.method(POST)
            .path(WEBHOOK_PATH)
            .query_param("wait", "true")
            .body_includes("Elevated Error Rates")
            .body_includes("update u2");
        then.status(200).json_body(json!({"id": "900"}));
    });

    let temp = tempdir().expect("tempdir");
    let state_path = temp.path().join("cache.json");
    let config = test_config(&server, state_path.clone());

    let report = run_once(&config).await.expect("cycle");
    assert_eq!(report.fetched_incidents, 1);
    assert_eq!(report.created, 1);
    feed.assert_calls(1);
    execute.assert_calls(1);

    let rendered = inspect_store(&state_path).expect("inspect");
    let entries: Value = serde_json::from_str(&rendered).expect("json");
    assert_eq!(entries[0]["incident_id"], "inc-1");
    assert_eq!(entries[0]["message_id"], "900");
    assert_eq!(entries[0]["delivered_update_ids"], json!(["u1", "u2"]));
}

#[tokio::test]
async fn integration_second_run_patches_new_updates_only() {
    let server = MockServer::start();
    let mut feed = server.mock(|when, then| {
        when.method(GET).path("/api/v2/incidents.json");
        then.status(200).json_body(feed_body(&["u1"]));
    });
    let execute = server.mock(|when, then| {
        when.method(POST).path(WEBHOOK_PATH);
        then.status(200).json_body(json!({"id": "900"}));
    });

    let temp = tempdir().expect("tempdir");
    let config = test_config(&server, temp.path().join("cache.json"));
    run_once(&config).await.expect("first cycle");
    feed.delete();

    server.mock(|when, then| {
        when.method(GET).path("/api/v2/incidents.json");
        then.status(200).json_body(feed_body(&["u1", "u2"]));
    });
    let probe = server.mock(|when, then| {
        when.method(GET).path(format!("{WEBHOOK_PATH}/messages/900"));
        then.status(200).json_body(json!({"id": "900"}));
    });
    let edit = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{WEBHOOK_PATH}/messages/900"))
            .body_includes("update u1")
            .body_includes("update u2");
        then.status(200).json_body(json!({"id": "900"}));
    });

    let report = run_once(&config).await.expect("second cycle");
    assert_eq!(report.patched, 1);
    assert_eq!(report.created, 0);
    execute.assert_calls(1);
    probe.assert_calls(1);
    edit.assert_calls(1);
}

#[tokio::test]
async fn regression_run_once_surfaces_feed_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v2/incidents.json");
        then.status(500).body("boom");
    });

    let temp = tempdir().expect("tempdir");
    let config = test_config(&server, temp.path().join("cache.json"));
    let error = run_once(&config).await.expect_err("feed down");
    assert!(error.to_string().contains("incident feed"));
    assert!(!temp.path().join("cache.json").exists());
}

#[test]
fn regression_build_poll_loop_rejects_missing_webhook_url() {
    let mut config = RelayConfig::with_webhook_url("");
    config.state_path = PathBuf::from("cache.json");
    assert!(build_poll_loop(&config).is_err());
}

#[test]
fn unit_inspect_store_renders_empty_array_for_missing_file() {
    let temp = tempdir().expect("tempdir");
    let rendered = inspect_store(&temp.path().join("missing.json")).expect("inspect");
    assert_eq!(rendered, "[]");
}

#[test]
fn regression_inspect_store_reports_corrupt_snapshot() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("cache.json");
    std::fs::write(&path, "{not json").expect("write");
    assert!(inspect_store(&path).is_err());
}
