/// Service Catalog
///
/// Boundary to the catalog of known services (endpoint, schemas, cost
/// profile, fallback). Read only by the plan generator and the API; the
/// executor works from graph descriptions alone.

// Catalog entry types
pub mod types;

// Hot-reload registry using ArcSwap
pub mod registry;

pub use registry::{CatalogRegistry, ServiceCatalog};
pub use types::ServiceEntry;
