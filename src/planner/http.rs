/// HTTP plan generator
///
/// Posts the intent together with the current service catalog to a planning
/// service and reads a graph description back.

use crate::catalog::ServiceCatalog;
use crate::error::PlanError;
use crate::graph::GraphSpec;
use crate::planner::PlanGenerator;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

/// Plan generator reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpPlanGenerator {
    client: reqwest::Client,
    url: String,
    catalog: Arc<dyn ServiceCatalog>,
    timeout: Duration,
}

impl HttpPlanGenerator {
    pub fn new(url: impl Into<String>, catalog: Arc<dyn ServiceCatalog>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            catalog,
            timeout,
        }
    }
}

impl PlanGenerator for HttpPlanGenerator {
    fn plan<'a>(&'a self, intent: &'a str) -> BoxFuture<'a, Result<GraphSpec, PlanError>> {
        Box::pin(async move {
            let services = self.catalog.list_services();
            tracing::info!("🧭 Requesting plan from {} ({} services available)", self.url, services.len());
            tracing::debug!("📝 Intent: {}", intent);

            let response = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(&json!({ "intent": intent, "services": services }))
                .send()
                .await
                .map_err(|e| PlanError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PlanError::Request(format!("planner returned status {}", status)));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| PlanError::InvalidResponse(e.to_string()))?;

            let plan = parse_plan(body)?;
            tracing::info!("✅ Plan received: {} nodes, {} edges", plan.nodes.len(), plan.edges.len());
            Ok(plan)
        })
    }
}

/// Accept either `{ "graph": {...} }` or a bare graph description
pub fn parse_plan(body: Value) -> Result<GraphSpec, PlanError> {
    let graph = match body {
        Value::Object(mut map) if map.contains_key("graph") => map.remove("graph").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(graph).map_err(|e| PlanError::InvalidResponse(e.to_string()))
}
