/// Result Aggregator
///
/// Turns a finished [`ExecutionContext`] into the run report and decides
/// whether the run failed as a whole.

use crate::error::EngineError;
use crate::graph::Graph;
use crate::runtime::context::{ExecutionContext, NodeState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialFailure,
}

/// Final results/errors of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Node name -> output of the successful (primary or fallback) call
    pub results: BTreeMap<String, Value>,
    /// Node name -> failure, recovery or skip description
    pub errors: BTreeMap<String, String>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Merge per-node outcomes into a report
///
/// Returns [`EngineError::Unrecoverable`] when the fail-fast policy aborted the
/// run or a `required` node ended without output; the partial report travels
/// with the error.
pub fn finalize(graph: &Graph, context: ExecutionContext) -> Result<ExecutionReport, EngineError> {
    let required_failure = {
        let mut missing: Vec<&str> = graph
            .nodes()
            .filter(|node| node.required && context.state(&node.name) != NodeState::Succeeded)
            .map(|node| node.name.as_str())
            .collect();
        missing.sort_unstable();
        missing.first().map(|name| name.to_string())
    };
    let unrecoverable = context.aborted_by().map(str::to_string).or(required_failure);

    let run_id = context.run_id;
    let started_at = context.started_at;
    let cancelled = context.is_cancelled();
    let (results, errors) = context.into_outputs();

    let finished_at = Utc::now();
    let duration_ms = u64::try_from((finished_at - started_at).num_milliseconds()).unwrap_or(0);
    let errors: BTreeMap<String, String> = errors.into_iter().collect();
    let status = if errors.is_empty() {
        RunStatus::Success
    } else {
        RunStatus::PartialFailure
    };

    let report = ExecutionReport {
        run_id,
        status,
        results: results.into_iter().collect(),
        errors,
        cancelled,
        started_at,
        finished_at,
        duration_ms,
    };

    if let Some(node) = unrecoverable {
        let reason = report
            .errors
            .get(&node)
            .cloned()
            .unwrap_or_else(|| "did not complete".to_string());
        tracing::error!("❌ Run {} failed unrecoverably at '{}': {}", run_id, node, reason);
        return Err(EngineError::Unrecoverable {
            node,
            reason,
            report: Box::new(report),
        });
    }

    match report.status {
        RunStatus::Success => tracing::info!("🎉 Run {} succeeded in {}ms", run_id, duration_ms),
        RunStatus::PartialFailure => tracing::warn!(
            "⚠️ Run {} finished with {} errors in {}ms",
            run_id,
            report.errors.len(),
            duration_ms
        ),
    }

    Ok(report)
}
