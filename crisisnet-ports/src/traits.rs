//! Port contracts for external collaborators

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crisisnet_core::{
    CentralityRecord, CommunityId, Coordinates, HazardAlert, LiveEvent, Message, MessageGraph,
    SentimentSignal, SimilarityMatrix, TopicSignal,
};

/// Errors from port operations
#[derive(Debug, Error)]
pub enum PortError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Pairwise text similarity over a message corpus.
///
/// The returned matrix is symmetric with a zero diagonal, values in [0,1],
/// indexed by the corpus ordering.
#[async_trait]
pub trait SimilarityProvider: Send + Sync {
    async fn similarity(&self, messages: &[Message]) -> Result<SimilarityMatrix, PortError>;
}

/// Graph centrality metrics, keyed by node id, provider-normalized to [0,1]
#[async_trait]
pub trait CentralityProvider: Send + Sync {
    async fn centrality(
        &self,
        graph: &MessageGraph,
    ) -> Result<HashMap<String, CentralityRecord>, PortError>;
}

/// Community partitioning: node id to non-negative community id
#[async_trait]
pub trait CommunityProvider: Send + Sync {
    async fn communities(
        &self,
        graph: &MessageGraph,
    ) -> Result<HashMap<String, CommunityId>, PortError>;
}

/// Topic assignments and sentiment scores for a document batch
#[derive(Debug, Clone, Default)]
pub struct TextSignals {
    pub topics: HashMap<String, TopicSignal>,
    pub sentiments: HashMap<String, SentimentSignal>,
}

#[async_trait]
pub trait TextSignalProvider: Send + Sync {
    async fn text_signals(&self, messages: &[Message]) -> Result<TextSignals, PortError>;
}

/// Place-name geocoding.
///
/// Must tolerate unresolvable names by returning `None` rather than failing.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    async fn geocode(&self, place: &str) -> Option<Coordinates>;
}

/// Independently sourced hazard alerts
#[async_trait]
pub trait HazardFeed: Send + Sync {
    async fn fetch(&self) -> Result<Vec<HazardAlert>, PortError>;
}

/// A pollable source of live events for the streaming subsystem
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the next batch of events; an empty batch is normal
    async fn poll(&mut self) -> Result<Vec<LiveEvent>, PortError>;

    /// How long to wait between polls
    fn interval(&self) -> Duration;
}
