//! CrisisNet Ports - capability contracts the core consumes
//!
//! The pipeline never computes text similarity, centrality, communities,
//! topics, sentiment, geocoding, or hazard data itself; it consumes them
//! through the traits defined here. This crate also ships the
//! collaborator-side adapters that tests and the CLI use:
//! - a gazetteer geocoder with an explicit cache and remote-lookup quota
//! - file-backed signal bundles (externally computed results as JSON)
//! - a static hazard feed

pub mod file_source;
pub mod geocode;
pub mod traits;

pub use file_source::*;
pub use geocode::*;
pub use traits::*;
