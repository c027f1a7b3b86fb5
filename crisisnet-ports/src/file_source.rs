//! File-backed signal and hazard sources
//!
//! External collaborators (vectorizers, graph-metric engines, topic
//! models) run offline and hand their results over as JSON; these adapters
//! expose such files through the port contracts.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crisisnet_core::{
    CentralityRecord, CommunityId, HazardAlert, Message, MessageGraph, SentimentSignal,
    SimilarityMatrix, TopicSignal,
};

use crate::traits::{
    CentralityProvider, CommunityProvider, HazardFeed, PortError, SimilarityProvider,
    TextSignalProvider, TextSignals,
};

/// One JSON document carrying every externally computed signal for a corpus
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSignalBundle {
    /// Pairwise similarity rows in corpus order
    #[serde(default)]
    similarity: Vec<Vec<f64>>,
    #[serde(default)]
    centrality: HashMap<String, CentralityRecord>,
    #[serde(default)]
    communities: HashMap<String, CommunityId>,
    #[serde(default)]
    topics: HashMap<String, TopicSignal>,
    #[serde(default)]
    sentiments: HashMap<String, SentimentSignal>,
}

impl FileSignalBundle {
    pub fn from_path(path: &Path) -> Result<Self, PortError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PortError::Unavailable(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw).map_err(|e| PortError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SimilarityProvider for FileSignalBundle {
    async fn similarity(&self, messages: &[Message]) -> Result<SimilarityMatrix, PortError> {
        if self.similarity.len() != messages.len() {
            return Err(PortError::Parse(format!(
                "similarity matrix has {} rows for {} messages",
                self.similarity.len(),
                messages.len()
            )));
        }
        SimilarityMatrix::new(self.similarity.clone()).map_err(|e| PortError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CentralityProvider for FileSignalBundle {
    async fn centrality(
        &self,
        _graph: &MessageGraph,
    ) -> Result<HashMap<String, CentralityRecord>, PortError> {
        Ok(self.centrality.clone())
    }
}

#[async_trait]
impl CommunityProvider for FileSignalBundle {
    async fn communities(
        &self,
        _graph: &MessageGraph,
    ) -> Result<HashMap<String, CommunityId>, PortError> {
        Ok(self.communities.clone())
    }
}

#[async_trait]
impl TextSignalProvider for FileSignalBundle {
    async fn text_signals(&self, _messages: &[Message]) -> Result<TextSignals, PortError> {
        Ok(TextSignals {
            topics: self.topics.clone(),
            sentiments: self.sentiments.clone(),
        })
    }
}

/// In-memory hazard feed, optionally loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct StaticHazardFeed {
    alerts: Vec<HazardAlert>,
}

impl StaticHazardFeed {
    pub fn new(alerts: Vec<HazardAlert>) -> Self {
        Self { alerts }
    }

    pub fn from_path(path: &Path) -> Result<Self, PortError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PortError::Unavailable(format!("{}: {e}", path.display())))?;
        let alerts: Vec<HazardAlert> =
            serde_json::from_str(&raw).map_err(|e| PortError::Parse(e.to_string()))?;
        Ok(Self { alerts })
    }
}

#[async_trait]
impl HazardFeed for StaticHazardFeed {
    async fn fetch(&self) -> Result<Vec<HazardAlert>, PortError> {
        Ok(self.alerts.clone())
    }
}
