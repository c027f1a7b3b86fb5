//! CrisisNet Runtime - batch analysis pipeline and live streaming
//!
//! Two halves:
//! - [`AnalysisPipeline`] drives a full batch run: graph construction,
//!   signal fusion, alert scoring, cross-validation, insights
//! - [`LiveAggregator`] + [`LivePoller`] + [`Broadcaster`] maintain a
//!   rolling window over streamed events and fan summaries out to
//!   subscribers

pub mod broadcast;
pub mod error;
pub mod live;
pub mod pipeline;
pub mod poller;

pub use broadcast::{Broadcaster, LiveUpdate};
pub use error::RuntimeError;
pub use live::LiveAggregator;
pub use pipeline::{AnalysisPipeline, AnalysisSession};
pub use poller::LivePoller;
