//! Batch analysis pipeline
//!
//! Drives one full run over a message corpus: similarity, graph, external
//! signals, alert scoring, cross-validation against the hazard feed, and
//! timeline/geographic insights. Signal providers are required; the hazard
//! feed is best-effort and a failure degrades cross-validation to its
//! no-match fallback rather than failing the run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crisisnet_core::{
    build_timeline, corpus_fingerprint, geo_insights, AlertScorer, Coordinates,
    CrossValidationReport, CrossValidator, GeoInsights, GraphBuilder, GraphSnapshot, GraphStats,
    HazardAlert, Message, ScoredAlerts, SignalBundle, Timeline, DEFAULT_SIMILARITY_THRESHOLD,
};
use crisisnet_ports::{
    CentralityProvider, CommunityProvider, GeocodeProvider, HazardFeed, SimilarityProvider,
    TextSignalProvider,
};

use crate::error::RuntimeError;

/// Everything one batch run produced
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSession {
    /// Content fingerprint of the corpus, stable across reruns
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub message_count: usize,
    pub graph: GraphSnapshot,
    pub graph_stats: GraphStats,
    pub alerts: ScoredAlerts,
    pub cross_validation: CrossValidationReport,
    pub timeline: Timeline,
    pub geo: GeoInsights,
}

pub struct AnalysisPipeline {
    similarity: Arc<dyn SimilarityProvider>,
    centrality: Arc<dyn CentralityProvider>,
    communities: Arc<dyn CommunityProvider>,
    text_signals: Arc<dyn TextSignalProvider>,
    hazards: Arc<dyn HazardFeed>,
    geocoder: Arc<dyn GeocodeProvider>,
    threshold: f64,
}

impl AnalysisPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        similarity: Arc<dyn SimilarityProvider>,
        centrality: Arc<dyn CentralityProvider>,
        communities: Arc<dyn CommunityProvider>,
        text_signals: Arc<dyn TextSignalProvider>,
        hazards: Arc<dyn HazardFeed>,
        geocoder: Arc<dyn GeocodeProvider>,
    ) -> Self {
        Self {
            similarity,
            centrality,
            communities,
            text_signals,
            hazards,
            geocoder,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub async fn run(&self, messages: Vec<Message>) -> Result<AnalysisSession, RuntimeError> {
        let run_id = corpus_fingerprint(&messages);
        let started_at = Utc::now();
        info!("analysis run {run_id} over {} messages", messages.len());

        let matrix = self.similarity.similarity(&messages).await?;
        let graph = GraphBuilder::with_threshold(self.threshold).build(&messages, &matrix)?;
        let graph_stats = graph.stats();
        debug!(
            "graph built: {} nodes, {} edges",
            graph_stats.nodes, graph_stats.edges
        );

        let centrality = self.centrality.centrality(&graph).await?;
        let communities = self.communities.communities(&graph).await?;
        let text = self.text_signals.text_signals(&messages).await?;
        let signals = SignalBundle {
            centrality,
            sentiments: text.sentiments,
            topics: text.topics,
            communities,
        };

        let alerts = AlertScorer::score(&messages, &signals);

        let resolved = self.resolve_locations(&messages).await;
        let hazards = match self.hazards.fetch().await {
            Ok(hazards) => hazards,
            Err(e) => {
                warn!("hazard feed unavailable, cross-validation degrades: {e}");
                Vec::new()
            }
        };
        let cross_validation = self.cross_validate(&messages, &signals, &hazards, &alerts, &resolved);

        let timeline = build_timeline(&messages);
        let geo = geo_insights(&messages, &signals, &resolved);

        Ok(AnalysisSession {
            run_id,
            started_at,
            message_count: messages.len(),
            graph: graph.snapshot(),
            graph_stats,
            alerts,
            cross_validation,
            timeline,
            geo,
        })
    }

    /// Geocode each distinct message location once, keyed lowercased.
    /// Unresolvable names are simply absent.
    async fn resolve_locations(&self, messages: &[Message]) -> HashMap<String, Coordinates> {
        let mut resolved = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();

        for message in messages {
            let Some(location) = message.location.as_deref() else {
                continue;
            };
            let key = location.trim().to_lowercase();
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            if let Some(coords) = self.geocoder.geocode(location).await {
                resolved.insert(key, coords);
            }
        }

        resolved
    }

    fn cross_validate(
        &self,
        messages: &[Message],
        signals: &SignalBundle,
        hazards: &[HazardAlert],
        alerts: &ScoredAlerts,
        resolved: &HashMap<String, Coordinates>,
    ) -> CrossValidationReport {
        CrossValidator::default().validate(messages, &signals.communities, hazards, alerts, resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crisisnet_core::{
        CentralityRecord, ClusterStatus, CommunityId, MessageGraph, SentimentSignal,
        SimilarityMatrix, TopicSignal,
    };
    use crisisnet_ports::{PortError, TextSignals};

    struct StubSignals {
        fail_similarity: bool,
    }

    #[async_trait]
    impl SimilarityProvider for StubSignals {
        async fn similarity(&self, messages: &[Message]) -> Result<SimilarityMatrix, PortError> {
            if self.fail_similarity {
                return Err(PortError::Unavailable("vectorizer down".to_string()));
            }
            let n = messages.len();
            let rows = (0..n)
                .map(|i| (0..n).map(|j| if i == j { 0.0 } else { 0.9 }).collect())
                .collect();
            SimilarityMatrix::new(rows).map_err(|e| PortError::Parse(e.to_string()))
        }
    }

    #[async_trait]
    impl CentralityProvider for StubSignals {
        async fn centrality(
            &self,
            graph: &MessageGraph,
        ) -> Result<HashMap<String, CentralityRecord>, PortError> {
            Ok(graph
                .node_ids()
                .map(|id| {
                    (
                        id.to_string(),
                        CentralityRecord {
                            degree: 0.8,
                            betweenness: 0.5,
                            eigenvector: 0.4,
                            clustering: 0.0,
                        },
                    )
                })
                .collect())
        }
    }

    #[async_trait]
    impl CommunityProvider for StubSignals {
        async fn communities(
            &self,
            graph: &MessageGraph,
        ) -> Result<HashMap<String, CommunityId>, PortError> {
            Ok(graph.node_ids().map(|id| (id.to_string(), 0)).collect())
        }
    }

    #[async_trait]
    impl TextSignalProvider for StubSignals {
        async fn text_signals(&self, messages: &[Message]) -> Result<TextSignals, PortError> {
            let mut signals = TextSignals::default();
            for message in messages {
                signals.sentiments.insert(
                    message.id.clone(),
                    SentimentSignal {
                        compound: -0.5,
                        ..Default::default()
                    },
                );
                signals.topics.insert(
                    message.id.clone(),
                    TopicSignal {
                        topic_id: 1,
                        confidence: 0.9,
                    },
                );
            }
            Ok(signals)
        }
    }

    struct StubHazards {
        fail: bool,
        alerts: Vec<HazardAlert>,
    }

    #[async_trait]
    impl HazardFeed for StubHazards {
        async fn fetch(&self) -> Result<Vec<HazardAlert>, PortError> {
            if self.fail {
                Err(PortError::Network("feed down".to_string()))
            } else {
                Ok(self.alerts.clone())
            }
        }
    }

    struct StubGeocoder;

    #[async_trait]
    impl GeocodeProvider for StubGeocoder {
        async fn geocode(&self, place: &str) -> Option<Coordinates> {
            (place.to_lowercase() == "miami").then(|| Coordinates::new(25.7617, -80.1918))
        }
    }

    fn messages() -> Vec<Message> {
        vec![
            Message {
                id: "1".to_string(),
                text: "Flood waters rising fast".to_string(),
                keyword: Some("flood".to_string()),
                location: Some("Miami".to_string()),
                disaster: true,
                timestamp: Some(Utc::now()),
            },
            Message {
                id: "2".to_string(),
                text: "Streets under water downtown".to_string(),
                keyword: Some("flood".to_string()),
                location: Some("Miami".to_string()),
                disaster: true,
                timestamp: Some(Utc::now()),
            },
        ]
    }

    fn pipeline(fail_similarity: bool, hazards: StubHazards) -> AnalysisPipeline {
        let signals = Arc::new(StubSignals { fail_similarity });
        AnalysisPipeline::new(
            signals.clone(),
            signals.clone(),
            signals.clone(),
            signals,
            Arc::new(hazards),
            Arc::new(StubGeocoder),
        )
    }

    fn matching_alert() -> HazardAlert {
        HazardAlert {
            event: "Flood Warning".to_string(),
            severity: crisisnet_core::Severity::High,
            lat: 25.7617,
            lon: -80.1918,
            start_time: None,
            end_time: None,
            provider: "test".to_string(),
            description: Some("flood expected".to_string()),
            location_name: Some("Miami".to_string()),
        }
    }

    #[tokio::test]
    async fn test_full_run_produces_session() {
        let pipeline = pipeline(false, StubHazards { fail: false, alerts: vec![matching_alert()] });
        let session = pipeline.run(messages()).await.unwrap();

        assert_eq!(session.message_count, 2);
        assert_eq!(session.graph_stats.nodes, 2);
        assert!(session.graph_stats.edges >= 1);
        assert_eq!(session.alerts.alerts.len(), 2);
        assert!(session.alerts.alerts[0].alert_score > 0.0);

        let verdict = &session.cross_validation.cross_validation[&0];
        assert_eq!(verdict.status, ClusterStatus::Aligned);
        assert_eq!(session.cross_validation.summary.aligned_clusters, 1);

        assert_eq!(session.timeline.points.len(), 1);
        assert_eq!(session.geo.locations[0].location, "Miami");
        assert!(!session.run_id.is_empty());
    }

    #[tokio::test]
    async fn test_hazard_feed_failure_degrades_to_no_match() {
        let pipeline = pipeline(false, StubHazards { fail: true, alerts: vec![] });
        let session = pipeline.run(messages()).await.unwrap();

        let summary = &session.cross_validation.summary;
        assert_eq!(summary.aligned_clusters, 0);
        assert_eq!(summary.no_match_clusters, summary.total_clusters);
        assert_eq!(summary.total_clusters, 1);
        // Ranking passes through unadjusted
        assert_eq!(
            session.cross_validation.adjusted_alerts[0].alert_score,
            session.alerts.alerts[0].alert_score
        );
    }

    #[tokio::test]
    async fn test_similarity_failure_is_fatal() {
        let pipeline = pipeline(true, StubHazards { fail: false, alerts: vec![] });
        assert!(matches!(
            pipeline.run(messages()).await,
            Err(RuntimeError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn test_run_id_is_stable_for_same_corpus() {
        let pipeline = pipeline(false, StubHazards { fail: false, alerts: vec![] });
        let a = pipeline.run(messages()).await.unwrap();
        let b = pipeline.run(messages()).await.unwrap();
        assert_eq!(a.run_id, b.run_id);
    }
}
