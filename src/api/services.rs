/// Service catalog endpoints

use crate::{
    api::{api_error, ApiError, AppState},
    catalog::ServiceCatalog,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

pub fn create_service_routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/services/reload", post(reload_services))
}

/// GET /services
/// Returns: { "services": [ { "name", "endpoint", "input_schema", ... } ] }
async fn list_services(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "services": state.catalog.list_services() }))
}

/// POST /services/reload
/// Returns: { "count": <services loaded> }
async fn reload_services(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.catalog.reload().await {
        Ok(count) => Ok(Json(json!({ "count": count }))),
        Err(e) => {
            tracing::error!("Failed to reload service catalog: {:#}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "catalog_reload_failed", format!("{:#}", e)))
        }
    }
}
