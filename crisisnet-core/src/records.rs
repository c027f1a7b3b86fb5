//! Typed records for the CrisisNet pipeline
//!
//! Every signal the core consumes or produces is a tagged struct with named
//! fields. Externally computed signals (centrality, sentiment, topics,
//! communities) arrive keyed by message id; absence of an entry is an
//! explicit `Option::None` at lookup, and the scorer substitutes neutral
//! defaults as a tested rule.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// Community identifier assigned by the external partitioning provider
pub type CommunityId = u32;

/// A single corpus message (immutable once loaded; identity = id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id
    pub id: String,

    /// Raw message text
    pub text: String,

    /// Disaster keyword from the corpus, if any
    #[serde(default)]
    pub keyword: Option<String>,

    /// Free-text place name, if any
    #[serde(default)]
    pub location: Option<String>,

    /// Ground-truth disaster label (`target` column, 0/1 in the corpus)
    #[serde(alias = "target", default, deserialize_with = "bool_from_int")]
    pub disaster: bool,

    /// Optional corpus timestamp
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Accept 0/1, true/false, or absent for the corpus label
fn bool_from_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrBool {
        Int(i64),
        Bool(bool),
    }

    Ok(match Option::<IntOrBool>::deserialize(deserializer)? {
        Some(IntOrBool::Int(v)) => v != 0,
        Some(IntOrBool::Bool(v)) => v,
        None => false,
    })
}

/// Severity buckets for alert scores and hazard alerts
///
/// Buckets are monotonic and non-overlapping:
/// critical >= 0.8 > high >= 0.6 > elevated >= 0.4 > normal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Normal,
    Elevated,
    High,
    Critical,
}

impl Severity {
    /// Bucket a bounded [0,1] alert score
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Severity::Critical
        } else if score >= 0.6 {
            Severity::High
        } else if score >= 0.4 {
            Severity::Elevated
        } else {
            Severity::Normal
        }
    }

    /// Ordinal rank used to compare hazard alert strength (normal=0 .. critical=3)
    pub fn rank(self) -> u8 {
        match self {
            Severity::Normal => 0,
            Severity::Elevated => 1,
            Severity::High => 2,
            Severity::Critical => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Normal => "normal",
            Severity::Elevated => "elevated",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Per-node centrality results from the external graph-metrics provider
///
/// All values are provider-normalized into [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CentralityRecord {
    pub degree: f64,
    pub betweenness: f64,
    pub eigenvector: f64,
    pub clustering: f64,
}

/// Sentiment label attached by the external text-signal provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    #[default]
    Neutral,
    Negative,
}

/// Per-message sentiment scores (VADER-style)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentSignal {
    /// Compound polarity in [-1, 1]
    pub compound: f64,
    #[serde(default)]
    pub pos: f64,
    #[serde(default)]
    pub neu: f64,
    #[serde(default)]
    pub neg: f64,
    #[serde(default)]
    pub label: SentimentLabel,
}

impl Default for SentimentSignal {
    fn default() -> Self {
        Self {
            compound: 0.0,
            pos: 0.0,
            neu: 1.0,
            neg: 0.0,
            label: SentimentLabel::Neutral,
        }
    }
}

/// Per-message topic assignment from the external topic model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TopicSignal {
    pub topic_id: usize,
    /// Assignment confidence in [0, 1]
    pub confidence: f64,
}

/// All externally computed per-message signals, keyed by message id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalBundle {
    #[serde(default)]
    pub centrality: HashMap<String, CentralityRecord>,
    #[serde(default)]
    pub sentiments: HashMap<String, SentimentSignal>,
    #[serde(default)]
    pub topics: HashMap<String, TopicSignal>,
    #[serde(default)]
    pub communities: HashMap<String, CommunityId>,
}

impl SignalBundle {
    pub fn centrality_for(&self, id: &str) -> Option<&CentralityRecord> {
        self.centrality.get(id)
    }

    pub fn sentiment_for(&self, id: &str) -> Option<&SentimentSignal> {
        self.sentiments.get(id)
    }

    pub fn topic_for(&self, id: &str) -> Option<&TopicSignal> {
        self.topics.get(id)
    }

    pub fn community_for(&self, id: &str) -> Option<CommunityId> {
        self.communities.get(id).copied()
    }

    /// Number of distinct communities across all assignments
    pub fn distinct_communities(&self) -> usize {
        let mut seen: Vec<CommunityId> = self.communities.values().copied().collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

/// Verdict from comparing a cluster's disaster signal against a hazard alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Aligned,
    Contradicted,
    Neutral,
}

/// A scored, ranked alert for one message
///
/// Created by the scorer; `gov_*` fields are filled in by cross-validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    /// Message text truncated for display
    pub text: String,
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub disaster: bool,
    pub community: Option<CommunityId>,

    /// Fused risk score, always clamped to [0, 1]
    pub alert_score: f64,
    pub centrality_score: f64,
    pub sentiment_risk: f64,
    pub topic_confidence: f64,
    pub sentiment_label: SentimentLabel,
    pub severity: Severity,

    /// Alignment verdict from cross-validation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gov_alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gov_boost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gov_penalty: Option<f64>,
}

/// Aggregate statistics over a full scored batch (computed before truncation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AlertSummary {
    pub average_alert_score: f64,
    pub critical_alerts: usize,
    pub high_alerts: usize,
    pub elevated_alerts: usize,
}

/// Scorer output: ranked top-K alerts plus batch summary
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoredAlerts {
    pub alerts: Vec<AlertRecord>,
    pub summary: AlertSummary,
}

/// An independently sourced hazard alert (read-only input)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardAlert {
    /// Human-readable event name ("Severe Thunderstorm with Hail", ...)
    pub event: String,
    pub severity: Severity,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub provider: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
}

/// Condensed view of the hazard alert matched to a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedAlert {
    pub event: String,
    pub severity: Severity,
    pub provider: String,
}

impl From<&HazardAlert> for MatchedAlert {
    fn from(alert: &HazardAlert) -> Self {
        Self {
            event: alert.event.clone(),
            severity: alert.severity,
            provider: alert.provider.clone(),
        }
    }
}

/// Per-cluster cross-validation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    Aligned,
    Contradicted,
    Neutral,
    NoMatch,
}

/// Cross-validation result for one community with a resolvable location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterVerdict {
    pub status: ClusterStatus,
    /// Primary (first distinct) location of the cluster
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_alert: Option<MatchedAlert>,
    /// Alignment score in [-0.3, 0.95]
    pub alignment_score: f64,
    pub cluster_size: usize,
    pub disaster_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CrossValidationSummary {
    pub aligned_clusters: usize,
    pub contradicted_clusters: usize,
    pub no_match_clusters: usize,
    pub total_clusters: usize,
}

/// Full cross-validation output: per-cluster verdicts, adjusted ranking, counts
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrossValidationReport {
    pub cross_validation: BTreeMap<CommunityId, ClusterVerdict>,
    pub adjusted_alerts: Vec<AlertRecord>,
    pub summary: CrossValidationSummary,
}

/// A streamed event from a live source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveEvent {
    pub id: String,
    /// Source connector name ("replay", "twitter", ...)
    pub source: String,
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sentiment: Option<SentimentSignal>,
    /// Detected disaster keywords, ordered and deduplicated
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// One entry of a live summary's location leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub count: usize,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Rolling summary over the live event window, recomputed on every insertion
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LiveSummary {
    pub total_events: usize,
    pub avg_sentiment: f64,
    /// Up to 5 most frequent non-empty locations
    pub top_locations: Vec<LocationCount>,
    /// Up to 5 most frequent keywords
    pub top_keywords: Vec<String>,
    pub last_event: Option<LiveEvent>,
}

/// Content-based fingerprint of a message corpus, for identifying a run
pub fn corpus_fingerprint(messages: &[Message]) -> String {
    let mut hasher = Sha256::new();
    for message in messages {
        hasher.update(message.id.as_bytes());
        hasher.update(message.text.as_bytes());
    }
    format!("{:x}", hasher.finalize())[..16].to_string()
}

/// Truncate a string to at most `max` characters (not bytes)
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_buckets_at_boundaries() {
        assert_eq!(Severity::from_score(0.0), Severity::Normal);
        assert_eq!(Severity::from_score(0.39), Severity::Normal);
        assert_eq!(Severity::from_score(0.4), Severity::Elevated);
        assert_eq!(Severity::from_score(0.6), Severity::High);
        assert_eq!(Severity::from_score(0.8), Severity::Critical);
        assert_eq!(Severity::from_score(1.0), Severity::Critical);
    }

    #[test]
    fn test_severity_rank() {
        assert_eq!(Severity::Normal.rank(), 0);
        assert_eq!(Severity::Elevated.rank(), 1);
        assert_eq!(Severity::High.rank(), 2);
        assert_eq!(Severity::Critical.rank(), 3);
    }

    #[test]
    fn test_message_label_from_int() {
        let msg: Message =
            serde_json::from_str(r#"{"id":"1","text":"flood","target":1}"#).unwrap();
        assert!(msg.disaster);

        let msg: Message =
            serde_json::from_str(r#"{"id":"2","text":"calm","target":0}"#).unwrap();
        assert!(!msg.disaster);

        let msg: Message = serde_json::from_str(r#"{"id":"3","text":"no label"}"#).unwrap();
        assert!(!msg.disaster);
    }

    #[test]
    fn test_corpus_fingerprint_is_stable() {
        let messages = vec![Message {
            id: "1".to_string(),
            text: "flood in city A".to_string(),
            keyword: None,
            location: None,
            disaster: true,
            timestamp: None,
        }];
        let a = corpus_fingerprint(&messages);
        let b = corpus_fingerprint(&messages);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
