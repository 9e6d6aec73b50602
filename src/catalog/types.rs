/// Service catalog entry types
///
/// Schemas and cost profiles are opaque JSON: the catalog only carries them to
/// the plan generator, the executor never reads them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A remote service the plan generator may route work to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Unique service name (e.g., "geocode")
    pub name: String,
    /// Primary endpoint URL
    pub endpoint: String,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default)]
    pub output_schema: Value,
    /// Free-form cost description (latency, price per call, ...)
    #[serde(default)]
    pub cost_profile: Value,
    /// Alternate endpoint for the same service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}
