//! CrisisNet Feeds - hazard alerts and live event sources
//!
//! - Weather-derived hazard alerts: Open-Meteo forecasts classified into
//!   the common severity scale and normalized to [`HazardAlert`]
//! - Replay event source: JSON-lines files streamed as live events
//!
//! [`HazardAlert`]: crisisnet_core::HazardAlert

pub mod replay;
pub mod weather;

pub use replay::*;
pub use weather::*;
