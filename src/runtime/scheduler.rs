/// Batch scheduler
///
/// Walks the graph's topological batches in order. Every node of a batch whose
/// inputs resolve is dispatched at once onto a `JoinSet`, with a semaphore
/// bounding how many calls are in flight. A batch is fully joined before the
/// next one starts, so a node never runs before all of its predecessors are
/// terminal. Outcomes are recorded by this loop alone.

use crate::error::CallError;
use crate::graph::{Graph, Node};
use crate::runtime::context::{ExecutionContext, NodeState};
use crate::runtime::executor::{CallExecutor, NodeOutcome};
use crate::runtime::resolver::{self, ResolveError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

/// What a node failure without a fallback does to the rest of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Skip only the dependents of the failed node
    #[default]
    Contain,
    /// Abort the whole run on the first unguarded failure
    FailFast,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "contain" => Ok(FailurePolicy::Contain),
            "fail_fast" => Ok(FailurePolicy::FailFast),
            other => Err(format!("unknown failure policy: {}", other)),
        }
    }
}

/// Dispatches ready nodes concurrently, batch by batch
#[derive(Debug, Clone)]
pub struct Scheduler {
    executor: Arc<CallExecutor>,
    max_concurrency: usize,
    policy: FailurePolicy,
}

impl Scheduler {
    pub fn new(executor: Arc<CallExecutor>, max_concurrency: usize, policy: FailurePolicy) -> Self {
        Self {
            executor,
            max_concurrency: max_concurrency.max(1),
            policy,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Execute the whole graph against `payload`
    pub async fn run(&self, graph: &Graph, payload: Map<String, Value>) -> ExecutionContext {
        self.run_with_cancel(graph, payload, CancellationToken::new()).await
    }

    /// Execute the graph until done or until `cancel` fires
    ///
    /// On cancellation in-flight calls end as cancelled failures, undispatched
    /// nodes are skipped, and recorded results are kept.
    pub async fn run_with_cancel(
        &self,
        graph: &Graph,
        payload: Map<String, Value>,
        cancel: CancellationToken,
    ) -> ExecutionContext {
        let mut context = ExecutionContext::new(graph, payload);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        // fail-fast aborts through a child so the caller's token stays untouched
        let run_token = cancel.child_token();

        let batches: Vec<Vec<String>> = graph.topological_batches().collect();
        tracing::info!(
            "🚀 Starting run {} with {} nodes in {} batches (max concurrency {})",
            context.run_id,
            graph.len(),
            batches.len(),
            self.max_concurrency
        );

        for (step, batch) in batches.iter().enumerate() {
            if run_token.is_cancelled() {
                let reason = stop_reason(&context);
                for name in batch {
                    record_skip(&mut context, name, &reason);
                }
                continue;
            }

            tracing::debug!("📍 Batch {}/{}: {:?}", step + 1, batches.len(), batch);

            let mut join_set = JoinSet::new();
            let mut in_flight: HashMap<Id, String> = HashMap::new();
            let mut undispatched: Vec<String> = Vec::new();

            for name in batch {
                let Some(node) = graph.node(name) else {
                    continue;
                };
                if run_token.is_cancelled() {
                    let reason = stop_reason(&context);
                    record_skip(&mut context, name, &reason);
                    continue;
                }
                match resolver::resolve(node, &context) {
                    Ok(input) => {
                        let task = NodeTask {
                            executor: Arc::clone(&self.executor),
                            node: node.clone(),
                            fallback: graph.fallback_endpoint(name).map(str::to_string),
                            input: Value::Object(input),
                            semaphore: Arc::clone(&semaphore),
                            cancel: run_token.clone(),
                            abort_on_failure: self.policy == FailurePolicy::FailFast,
                        };
                        let handle = join_set.spawn(task.run());
                        in_flight.insert(handle.id(), name.clone());
                    }
                    Err(ResolveError::DependencyFailed { dependency }) => {
                        tracing::warn!("⏭️ Skipping '{}': dependency '{}' failed", name, dependency);
                        record_skip(&mut context, name, &format!("skipped: dependency {} failed", dependency));
                    }
                    Err(e @ ResolveError::DependencyPending { .. }) => {
                        tracing::error!("❌ Ordering violation for '{}': {}", name, e);
                        record_skip(&mut context, name, &format!("skipped: {}", e));
                    }
                }
            }

            while let Some(joined) = join_set.join_next_with_id().await {
                let (name, outcome) = match joined {
                    Ok((id, dispatched)) => {
                        let Some(name) = in_flight.remove(&id) else {
                            continue;
                        };
                        let Some(outcome) = dispatched else {
                            // stopped while queued for a permit; no call was made
                            undispatched.push(name);
                            continue;
                        };
                        (name, outcome)
                    }
                    Err(join_err) => {
                        let Some(name) = in_flight.remove(&join_err.id()) else {
                            continue;
                        };
                        tracing::error!("❌ Node task for '{}' did not complete: {}", name, join_err);
                        let endpoint = graph.node(&name).map(|n| n.endpoint.clone()).unwrap_or_default();
                        let outcome = NodeOutcome::Failed {
                            primary: CallError::Transport {
                                endpoint,
                                reason: format!("node task did not complete: {}", join_err),
                            },
                            fallback: None,
                        };
                        (name, outcome)
                    }
                };

                let abort = self.policy == FailurePolicy::FailFast && outcome.is_unguarded_failure();
                if let Err(e) = context
                    .transition(&name, NodeState::Running)
                    .and_then(|()| context.record_outcome(&name, outcome))
                {
                    tracing::error!("❌ {}", e);
                }
                if abort && context.aborted_by().is_none() {
                    tracing::error!("🛑 '{}' failed with no fallback, aborting run {}", name, context.run_id);
                    context.abort(&name);
                    run_token.cancel();
                }
            }

            // the abort reason is only known once the whole batch has joined
            if !undispatched.is_empty() {
                let reason = stop_reason(&context);
                for name in &undispatched {
                    record_skip(&mut context, name, &reason);
                }
            }
        }

        if cancel.is_cancelled() {
            tracing::warn!("⏹️ Run {} was cancelled", context.run_id);
            context.mark_cancelled();
        }

        tracing::info!(
            "🏁 Run {} finished: {} results, {} errors",
            context.run_id,
            context.results().len(),
            context.errors().len()
        );
        context
    }
}

/// Skip text for nodes left undispatched once the run token fired
fn stop_reason(context: &ExecutionContext) -> String {
    match context.aborted_by() {
        Some(node) => format!("skipped: run aborted after {} failed", node),
        None => "skipped: run cancelled".to_string(),
    }
}

fn record_skip(context: &mut ExecutionContext, name: &str, reason: &str) {
    if let Err(e) = context.skip(name, reason) {
        tracing::error!("❌ {}", e);
    }
}

/// Everything one spawned node needs, owned so the task is `'static`
struct NodeTask {
    executor: Arc<CallExecutor>,
    node: Node,
    fallback: Option<String>,
    input: Value,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    /// Cancel the run before releasing the permit when the call fails unguarded
    abort_on_failure: bool,
}

impl NodeTask {
    /// Wait for a concurrency permit, then call primary and fallback
    ///
    /// `None` means the run stopped before a permit was granted and nothing
    /// was sent.
    async fn run(self) -> Option<NodeOutcome> {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            permit = self.semaphore.acquire() => permit.ok()?,
        };

        let outcome = self
            .executor
            .call_node(&self.node, &self.input, self.fallback.as_deref(), &self.cancel)
            .await;
        if self.abort_on_failure && outcome.is_unguarded_failure() {
            self.cancel.cancel();
        }
        Some(outcome)
    }
}
