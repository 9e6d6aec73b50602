/// Graph execution and planning endpoints
///
/// Contained node failures still answer 200 with a partial report; only
/// invalid graphs, unrecoverable failures and planner problems become error
/// responses.

use crate::{
    api::{api_error, ApiError, AppState},
    error::{EngineError, PlanError},
    graph::GraphSpec,
    runtime::ExecutionReport,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Request body for graph execution
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub graph: GraphSpec,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// Request body for planning
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub intent: String,
}

/// Response for planning
#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResponse {
    pub graph: GraphSpec,
}

/// Request body for plan-then-execute
#[derive(Debug, Deserialize)]
pub struct PlanAndExecuteRequest {
    pub intent: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// Create execution and planning routes
pub fn create_execution_routes() -> Router<AppState> {
    Router::new()
        .route("/execute", post(execute_graph))
        .route("/plan", post(plan_intent))
        .route("/plan_and_execute", post(plan_and_execute))
}

/// Execute a graph
///
/// POST /execute
/// Body: { "graph": { "nodes": [...], "edges": [...] }, "payload": {...} }
async fn execute_graph(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecutionReport>, ApiError> {
    tracing::info!(
        "📥 Execute request received: {} nodes, {} edges",
        request.graph.nodes.len(),
        request.graph.edges.len()
    );

    state
        .engine
        .execute(&request.graph, request.payload)
        .await
        .map(Json)
        .map_err(engine_error_response)
}

/// Turn an intent into a graph
///
/// POST /plan
/// Body: { "intent": "..." }
async fn plan_intent(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let graph = plan(&state, &request.intent).await?;
    Ok(Json(PlanResponse { graph }))
}

/// Plan an intent and execute the resulting graph
///
/// POST /plan_and_execute
/// Body: { "intent": "...", "payload": {...} }
async fn plan_and_execute(
    State(state): State<AppState>,
    Json(request): Json<PlanAndExecuteRequest>,
) -> Result<Json<ExecutionReport>, ApiError> {
    let graph = plan(&state, &request.intent).await?;

    state
        .engine
        .execute(&graph, request.payload)
        .await
        .map(Json)
        .map_err(engine_error_response)
}

async fn plan(state: &AppState, intent: &str) -> Result<GraphSpec, ApiError> {
    if intent.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "invalid_request", "intent must not be empty"));
    }

    tracing::info!("🧭 Planning intent: {:?}", intent);
    state.planner.plan(intent).await.map_err(|e| {
        tracing::error!("❌ Planning failed: {}", e);
        let status = match e {
            PlanError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            PlanError::Request(_) | PlanError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        };
        api_error(status, "plan_failed", e)
    })
}

fn engine_error_response(error: EngineError) -> ApiError {
    match error {
        EngineError::Validation(e) => {
            tracing::warn!("❌ Rejected invalid graph: {}", e);
            api_error(StatusCode::BAD_REQUEST, "invalid_graph", e)
        }
        EngineError::Unrecoverable { node, reason, report } => {
            tracing::error!("❌ Run {} failed at '{}': {}", report.run_id, node, reason);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "unrecoverable_node_failure",
                    "detail": format!("{} failed and could not be recovered: {}", node, reason),
                    "node": node,
                    "report": report,
                })),
            )
        }
    }
}
