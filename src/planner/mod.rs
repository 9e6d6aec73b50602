/// Plan Generator
///
/// Boundary to the component that turns a free-form intent into a graph
/// description. Its output is untrusted: callers run it through the same
/// validation as any posted graph.

// HTTP-backed plan generator
pub mod http;

use crate::error::PlanError;
use crate::graph::GraphSpec;
use futures::future::BoxFuture;

pub use http::HttpPlanGenerator;

/// Turns an intent string into a graph description, or fails
pub trait PlanGenerator: Send + Sync + std::fmt::Debug {
    fn plan<'a>(&'a self, intent: &'a str) -> BoxFuture<'a, Result<GraphSpec, PlanError>>;
}

/// Stand-in used when no plan generator is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredPlanner;

impl PlanGenerator for UnconfiguredPlanner {
    fn plan<'a>(&'a self, intent: &'a str) -> BoxFuture<'a, Result<GraphSpec, PlanError>> {
        Box::pin(async move {
            tracing::warn!("⚠️ Plan requested for intent {:?} but no planner is configured", intent);
            Err(PlanError::NotConfigured)
        })
    }
}
