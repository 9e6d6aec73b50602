/// Petgraph-based DAG execution engine
///
/// Entry point for a run: validates the graph description, arms the run
/// deadline, lets the scheduler execute the batches and hands the finished
/// context to the aggregator.

use crate::config::ExecutorConfig;
use crate::error::EngineError;
use crate::graph::{Graph, GraphSpec};
use crate::runtime::aggregator::{self, ExecutionReport};
use crate::runtime::executor::CallExecutor;
use crate::runtime::scheduler::Scheduler;
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// DAG execution engine for graphs of remote service calls
#[derive(Debug)]
pub struct ExecutionEngine {
    /// Batch scheduler with its call executor
    scheduler: Scheduler,
    /// Whole-run deadline; the run is cancelled when it expires
    run_timeout: Option<Duration>,
}

impl ExecutionEngine {
    /// Create an engine from executor settings
    pub fn new(executor: Arc<CallExecutor>, config: &ExecutorConfig) -> Self {
        Self {
            scheduler: Scheduler::new(executor, config.max_concurrency, config.failure_policy),
            run_timeout: config.run_timeout(),
        }
    }

    pub fn with_scheduler(scheduler: Scheduler, run_timeout: Option<Duration>) -> Self {
        Self { scheduler, run_timeout }
    }

    /// Validate and execute a graph description
    pub async fn execute(
        &self,
        spec: &GraphSpec,
        payload: Map<String, Value>,
    ) -> Result<ExecutionReport, EngineError> {
        self.execute_with_cancel(spec, payload, CancellationToken::new()).await
    }

    /// Validate and execute a graph description until done or cancelled
    ///
    /// Validation failures return before any remote call is issued.
    pub async fn execute_with_cancel(
        &self,
        spec: &GraphSpec,
        payload: Map<String, Value>,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport, EngineError> {
        tracing::debug!(
            "📊 Building graph with {} nodes and {} edges",
            spec.nodes.len(),
            spec.edges.len()
        );
        let graph = Graph::from_spec(spec).map_err(|e| {
            tracing::error!("❌ Graph rejected: {}", e);
            e
        })?;

        self.execute_graph(&graph, payload, cancel).await
    }

    /// Execute an already validated graph
    pub async fn execute_graph(
        &self,
        graph: &Graph,
        payload: Map<String, Value>,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport, EngineError> {
        let run_token = cancel.child_token();
        let run = self.scheduler.run_with_cancel(graph, payload, run_token.clone());

        // the deadline lives inside this future, so dropping the run drops it too
        let context = match self.run_timeout {
            Some(timeout) => {
                tokio::pin!(run);
                tokio::select! {
                    context = &mut run => context,
                    _ = tokio::time::sleep(timeout) => {
                        tracing::warn!("⏰ Run deadline of {:?} reached, cancelling", timeout);
                        run_token.cancel();
                        run.await
                    }
                }
            }
            None => run.await,
        };

        aggregator::finalize(graph, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CallError, GraphValidationError};
    use crate::graph::{EdgeSpec, NodeSpec};
    use crate::runtime::aggregator::RunStatus;
    use crate::runtime::executor::ServiceTransport;
    use crate::runtime::scheduler::FailurePolicy;
    use futures::future::BoxFuture;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// `a` returns `{"v":1}`, `fail` answers 503, `slow` hangs, others echo
    #[derive(Debug, Default)]
    struct Services {
        calls: AtomicUsize,
    }

    impl ServiceTransport for Services {
        fn post<'a>(&'a self, endpoint: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value, CallError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                match endpoint {
                    "a" => Ok(json!({"v": 1})),
                    "fail" => Err(CallError::Status {
                        endpoint: endpoint.to_string(),
                        status: 503,
                    }),
                    "slow" => {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        Ok(Value::Null)
                    }
                    _ => Ok(body.clone()),
                }
            })
        }
    }

    fn engine(services: &Arc<Services>, config: ExecutorConfig) -> ExecutionEngine {
        let executor = CallExecutor::new(services.clone(), config.call_timeout());
        ExecutionEngine::new(Arc::new(executor), &config)
    }

    fn chain(a_endpoint: &str) -> GraphSpec {
        GraphSpec {
            nodes: vec![
                NodeSpec::new("A", a_endpoint),
                NodeSpec::new("B", "echo").with_input("x", "A"),
            ],
            edges: vec![EdgeSpec::new("A", "B")],
        }
    }

    #[tokio::test]
    async fn executes_chain_and_is_repeatable() {
        let services = Arc::new(Services::default());
        let engine = engine(&services, ExecutorConfig::default());

        let first = engine.execute(&chain("a"), Map::new()).await.unwrap();
        let second = engine.execute(&chain("a"), Map::new()).await.unwrap();

        assert_eq!(first.status, RunStatus::Success);
        assert_eq!(first.results.get("A"), Some(&json!({"v": 1})));
        assert_eq!(first.results.get("B"), Some(&json!({"x": {"v": 1}})));
        assert_eq!(first.results, second.results);
        assert_eq!(first.errors, second.errors);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn failing_root_without_fallback_is_contained() {
        let services = Arc::new(Services::default());
        let engine = engine(&services, ExecutorConfig::default());

        let report = engine.execute(&chain("fail"), Map::new()).await.unwrap();

        assert_eq!(report.status, RunStatus::PartialFailure);
        assert!(report.results.is_empty());
        assert_eq!(report.errors.get("A").map(String::as_str), Some("call to fail returned status 503"));
        assert_eq!(
            report.errors.get("B").map(String::as_str),
            Some("skipped: dependency A failed")
        );
    }

    #[tokio::test]
    async fn cyclic_graph_makes_no_calls() {
        let services = Arc::new(Services::default());
        let engine = engine(&services, ExecutorConfig::default());
        let mut spec = chain("a");
        spec.edges.push(EdgeSpec::new("B", "A"));

        let err = engine.execute(&spec, Map::new()).await.unwrap_err();

        assert!(matches!(err, EngineError::Validation(GraphValidationError::Cycle { .. })));
        assert_eq!(services.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn run_deadline_cancels_in_flight_calls() {
        let services = Arc::new(Services::default());
        let config = ExecutorConfig {
            run_timeout_ms: Some(50),
            ..ExecutorConfig::default()
        };
        let engine = engine(&services, config);
        let spec = GraphSpec {
            nodes: vec![NodeSpec::new("quick", "a"), NodeSpec::new("stuck", "slow")],
            edges: vec![],
        };

        let report = engine.execute(&spec, Map::new()).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.results.get("quick"), Some(&json!({"v": 1})));
        assert_eq!(
            report.errors.get("stuck").map(String::as_str),
            Some("call to slow was cancelled")
        );
    }

    #[tokio::test]
    async fn dropped_run_leaves_no_deadline_timer_behind() {
        let services = Arc::new(Services::default());
        let config = ExecutorConfig {
            run_timeout_ms: Some(60_000),
            ..ExecutorConfig::default()
        };
        let engine = engine(&services, config);
        let spec = GraphSpec {
            nodes: vec![NodeSpec::new("stuck", "slow")],
            edges: vec![],
        };

        let abandoned = tokio::time::timeout(Duration::from_millis(50), engine.execute(&spec, Map::new())).await;
        assert!(abandoned.is_err());

        let metrics = tokio::runtime::Handle::current().metrics();
        for _ in 0..50 {
            if metrics.num_alive_tasks() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(metrics.num_alive_tasks(), 0);
    }

    #[tokio::test]
    async fn fail_fast_policy_surfaces_unrecoverable_failure() {
        let services = Arc::new(Services::default());
        let config = ExecutorConfig {
            failure_policy: FailurePolicy::FailFast,
            ..ExecutorConfig::default()
        };
        let engine = engine(&services, config);

        let err = engine.execute(&chain("fail"), Map::new()).await.unwrap_err();

        match err {
            EngineError::Unrecoverable { node, report, .. } => {
                assert_eq!(node, "A");
                assert_eq!(
                    report.errors.get("B").map(String::as_str),
                    Some("skipped: run aborted after A failed")
                );
            }
            other => panic!("expected unrecoverable failure, got {:?}", other),
        }
    }
}
