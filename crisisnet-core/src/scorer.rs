//! Alert scoring - fuses per-message signals into a bounded risk score
//!
//! Each message gets:
//! - `centrality_score` = 0.45·degree + 0.35·betweenness + 0.2·eigenvector
//! - `sentiment_risk` = 1 − (compound+1)/2, ×1.1 when disaster-labeled
//!   (the amplified intermediate may exceed 1; only the final score is
//!   clamped)
//! - `topic_confidence` straight from the topic signal
//! - `alert_score` = clamp(0.5·c + 0.3·s + 0.2·t, 0, 1)
//!
//! A message missing from any signal map scores with neutral defaults
//! rather than failing the batch.

use crate::records::{
    AlertRecord, AlertSummary, Message, ScoredAlerts, Severity, SignalBundle, truncate_chars,
};
use crate::MAX_RANKED_ALERTS;

/// Centrality fusion weights (degree, betweenness, eigenvector)
pub const DEGREE_WEIGHT: f64 = 0.45;
pub const BETWEENNESS_WEIGHT: f64 = 0.35;
pub const EIGENVECTOR_WEIGHT: f64 = 0.2;

/// Alert fusion weights (centrality, sentiment risk, topic confidence)
pub const CENTRALITY_WEIGHT: f64 = 0.5;
pub const SENTIMENT_WEIGHT: f64 = 0.3;
pub const TOPIC_WEIGHT: f64 = 0.2;

/// Risk amplification for disaster-labeled messages
pub const DISASTER_RISK_MULTIPLIER: f64 = 1.1;

/// Characters of message text carried on each alert
const ALERT_TEXT_CHARS: usize = 200;

/// Fuses centrality, sentiment, and topic signals into ranked alerts
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertScorer;

impl AlertScorer {
    /// Score every message, rank descending (stable), truncate to the top 25.
    ///
    /// The summary is computed over the full batch before truncation.
    pub fn score(messages: &[Message], signals: &SignalBundle) -> ScoredAlerts {
        let mut alerts: Vec<AlertRecord> = messages
            .iter()
            .map(|message| Self::score_one(message, signals))
            .collect();

        let summary = AlertSummary {
            average_alert_score: if alerts.is_empty() {
                0.0
            } else {
                alerts.iter().map(|a| a.alert_score).sum::<f64>() / alerts.len() as f64
            },
            critical_alerts: alerts.iter().filter(|a| a.alert_score >= 0.8).count(),
            high_alerts: alerts
                .iter()
                .filter(|a| a.alert_score >= 0.6 && a.alert_score < 0.8)
                .count(),
            elevated_alerts: alerts
                .iter()
                .filter(|a| a.alert_score >= 0.4 && a.alert_score < 0.6)
                .count(),
        };

        // Stable sort: ties keep corpus order
        alerts.sort_by(|a, b| b.alert_score.total_cmp(&a.alert_score));
        alerts.truncate(MAX_RANKED_ALERTS);

        ScoredAlerts { alerts, summary }
    }

    fn score_one(message: &Message, signals: &SignalBundle) -> AlertRecord {
        let centrality = signals
            .centrality_for(&message.id)
            .copied()
            .unwrap_or_default();
        let centrality_score = DEGREE_WEIGHT * centrality.degree
            + BETWEENNESS_WEIGHT * centrality.betweenness
            + EIGENVECTOR_WEIGHT * centrality.eigenvector;

        let sentiment = signals
            .sentiment_for(&message.id)
            .copied()
            .unwrap_or_default();
        let mut sentiment_risk = 1.0 - (sentiment.compound + 1.0) / 2.0;
        if message.disaster {
            sentiment_risk *= DISASTER_RISK_MULTIPLIER;
        }

        let topic_confidence = signals
            .topic_for(&message.id)
            .map(|t| t.confidence)
            .unwrap_or(0.0);

        let raw = CENTRALITY_WEIGHT * centrality_score
            + SENTIMENT_WEIGHT * sentiment_risk
            + TOPIC_WEIGHT * topic_confidence;
        let alert_score = raw.clamp(0.0, 1.0);

        AlertRecord {
            id: message.id.clone(),
            text: truncate_chars(&message.text, ALERT_TEXT_CHARS),
            keyword: message.keyword.clone(),
            location: message.location.clone(),
            disaster: message.disaster,
            community: signals.community_for(&message.id),
            alert_score,
            centrality_score,
            sentiment_risk,
            topic_confidence,
            sentiment_label: sentiment.label,
            severity: Severity::from_score(alert_score),
            gov_alignment: None,
            gov_boost: None,
            gov_penalty: None,
        }
    }
}
