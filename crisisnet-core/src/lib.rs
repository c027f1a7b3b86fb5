//! CrisisNet Core - Domain model and signal-fusion pipeline stages
//!
//! This crate provides the pure (sync, no I/O) heart of the system:
//! - Typed records for messages, signals, alerts, and hazards
//! - Multi-relational message graph construction
//! - Alert scoring (centrality + sentiment risk + topic confidence)
//! - Cross-validation of message clusters against a hazard feed
//! - Timeline and geographic aggregates over the corpus

pub mod crossval;
pub mod error;
pub mod geo;
pub mod graph;
pub mod insights;
pub mod records;
pub mod scorer;
pub mod text;

pub use crossval::*;
pub use error::*;
pub use geo::*;
pub use graph::*;
pub use insights::*;
pub use records::*;
pub use scorer::*;
pub use text::*;

/// Default similarity threshold for graph edges
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;

/// Fixed weight for shared-keyword edges
pub const SHARED_KEYWORD_WEIGHT: f64 = 0.5;

/// Fixed weight for shared-location edges
pub const SHARED_LOCATION_WEIGHT: f64 = 0.3;

/// Ranked alert lists are truncated to this many entries
pub const MAX_RANKED_ALERTS: usize = 25;

/// Live event window capacity (FIFO eviction past this)
pub const MAX_LIVE_EVENTS: usize = 200;

/// Maximum great-circle distance for cluster/alert matching, in km
pub const MAX_MATCH_RADIUS_KM: f64 = 50.0;

/// Minimum match score to accept a hazard alert candidate
pub const MIN_MATCH_SCORE: f64 = 0.3;
