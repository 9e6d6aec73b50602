//! End-to-end runs against stub services over real HTTP

mod common;

use common::{engine, short_timeouts, spawn_services};
use relayway::{
    config::ExecutorConfig,
    runtime::FailurePolicy,
    EdgeSpec, EngineError, GraphSpec, GraphValidationError, NodeSpec, RunStatus,
};
use serde_json::{json, Map};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn chain_passes_whole_output_downstream() {
    let services = spawn_services().await;
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("A", services.url("/a")),
            NodeSpec::new("B", services.url("/echo")).with_input("x", "A"),
        ],
        edges: vec![EdgeSpec::new("A", "B")],
    };

    let report = engine(short_timeouts()).execute(&spec, Map::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.results["A"], json!({ "v": 1 }));
    assert_eq!(report.results["B"], json!({ "x": { "v": 1 } }));
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn failed_root_skips_its_dependents() {
    let services = spawn_services().await;
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("A", services.url("/fail")),
            NodeSpec::new("B", services.url("/echo")).with_input("x", "A"),
        ],
        edges: vec![EdgeSpec::new("A", "B")],
    };

    let report = engine(short_timeouts()).execute(&spec, Map::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::PartialFailure);
    assert!(report.results.is_empty());
    assert!(report.errors["A"].contains("returned status 500"));
    assert_eq!(report.errors["B"], "skipped: dependency A failed");
    assert_eq!(services.calls.count("/echo"), 0);
}

#[tokio::test]
async fn fallback_recovers_failed_primary() {
    let services = spawn_services().await;
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("A", services.url("/a")),
            NodeSpec::new("B", services.url("/fail"))
                .with_input("x", "A.v")
                .with_input("tag", "tag"),
            NodeSpec::new("C", services.url("/echo")).with_input("b", "B.backup"),
        ],
        edges: vec![
            EdgeSpec::new("A", "B").with_fallback(services.url("/backup")),
            EdgeSpec::new("B", "C"),
        ],
    };
    let mut payload = Map::new();
    payload.insert("tag".to_string(), json!("blue"));

    let report = engine(short_timeouts()).execute(&spec, payload).await.unwrap();

    assert_eq!(
        report.results["B"],
        json!({ "backup": true, "input": { "x": 1, "tag": "blue" } })
    );
    assert_eq!(report.results["C"], json!({ "b": true }));
    assert!(report.errors["B"].contains("recovered by fallback"));
    assert_eq!(services.calls.count("/fail"), 1);
    assert_eq!(services.calls.count("/backup"), 1);
}

#[tokio::test]
async fn failed_fallback_reports_both_errors() {
    let services = spawn_services().await;
    let spec = GraphSpec {
        nodes: vec![NodeSpec::new("A", services.url("/fail")).with_fallback(services.url("/fail"))],
        edges: vec![],
    };

    let report = engine(short_timeouts()).execute(&spec, Map::new()).await.unwrap();

    assert!(report.errors["A"].contains("fallback failed"));
    assert_eq!(services.calls.count("/fail"), 2);
}

#[tokio::test]
async fn slow_call_times_out_without_blocking_siblings() {
    let services = spawn_services().await;
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("A", services.url("/a")),
            NodeSpec::new("S", services.url("/slow")).with_timeout_ms(100),
        ],
        edges: vec![],
    };

    let started = Instant::now();
    let report = engine(short_timeouts()).execute(&spec, Map::new()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.results["A"], json!({ "v": 1 }));
    assert!(report.errors["S"].contains("timed out after 100ms"));
}

#[tokio::test]
async fn cycle_is_rejected_before_any_call() {
    let services = spawn_services().await;
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("A", services.url("/a")),
            NodeSpec::new("B", services.url("/a")),
        ],
        edges: vec![EdgeSpec::new("A", "B"), EdgeSpec::new("B", "A")],
    };

    let err = engine(short_timeouts()).execute(&spec, Map::new()).await.unwrap_err();

    assert!(matches!(err, EngineError::Validation(GraphValidationError::Cycle { .. })));
    assert_eq!(services.calls.total(), 0);
}

#[tokio::test]
async fn required_node_failure_is_unrecoverable() {
    let services = spawn_services().await;
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("A", services.url("/a")),
            NodeSpec::new("P", services.url("/fail")).required(),
        ],
        edges: vec![],
    };

    let err = engine(short_timeouts()).execute(&spec, Map::new()).await.unwrap_err();

    match err {
        EngineError::Unrecoverable { node, report, .. } => {
            assert_eq!(node, "P");
            assert_eq!(report.results["A"], json!({ "v": 1 }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn fail_fast_stops_later_batches() {
    let services = spawn_services().await;
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("A", services.url("/fail")),
            NodeSpec::new("R", services.url("/a")),
            NodeSpec::new("B", services.url("/echo")).with_input("r", "R"),
        ],
        edges: vec![],
    };
    let config = ExecutorConfig {
        failure_policy: FailurePolicy::FailFast,
        ..short_timeouts()
    };

    let err = engine(config).execute(&spec, Map::new()).await.unwrap_err();

    let EngineError::Unrecoverable { node, report, .. } = err else {
        panic!("expected an unrecoverable failure");
    };
    assert_eq!(node, "A");
    assert_eq!(report.errors["B"], "skipped: run aborted after A failed");
    assert_eq!(services.calls.count("/echo"), 0);
}

#[tokio::test]
async fn caller_cancellation_interrupts_in_flight_calls() {
    let services = spawn_services().await;
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("S", services.url("/slow")),
            NodeSpec::new("B", services.url("/echo")).with_input("s", "S"),
        ],
        edges: vec![],
    };
    let config = ExecutorConfig {
        call_timeout_ms: 10_000,
        ..ExecutorConfig::default()
    };
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let report = engine(config)
        .execute_with_cancel(&spec, Map::new(), cancel)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(report.cancelled);
    assert!(report.errors["S"].contains("cancelled"));
    assert_eq!(report.errors["B"], "skipped: run cancelled");
}
