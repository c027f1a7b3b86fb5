//! Cross-validation of message clusters against an independent hazard feed
//!
//! For each community of messages, find the best-matching hazard alert by
//! geography and keyword, classify the alignment between the cluster's
//! disaster signal and the alert's severity, and boost or penalize the
//! affected alert scores. This stage is always recoverable: missing feeds,
//! empty communities, or unresolvable locations degrade to no-match
//! results, never to a failed analysis.

use std::collections::{BTreeMap, HashMap};

use crate::geo::{haversine_km, Coordinates};
use crate::records::{
    Alignment, ClusterStatus, ClusterVerdict, CommunityId, CrossValidationReport,
    CrossValidationSummary, HazardAlert, Message, ScoredAlerts,
};
use crate::{MAX_MATCH_RADIUS_KM, MAX_RANKED_ALERTS, MIN_MATCH_SCORE};

/// Weight of geographic proximity in the match score
const DISTANCE_MATCH_WEIGHT: f64 = 0.6;
/// Weight of keyword agreement in the match score
const KEYWORD_MATCH_WEIGHT: f64 = 0.4;
/// Keyword factor when no cluster keyword matches the event name
const KEYWORD_MISS_FACTOR: f64 = 0.5;

/// Maximum boost or penalty applied to any single alert score
pub const MAX_ADJUSTMENT: f64 = 0.15;
/// Fraction of the alignment score converted into an adjustment
const ADJUSTMENT_SCALE: f64 = 0.2;

/// One community's collected members and cross-matching inputs
#[derive(Debug, Default)]
struct Cluster {
    members: Vec<String>,
    /// Distinct locations in first-seen order
    locations: Vec<String>,
    /// Distinct keywords in first-seen order
    keywords: Vec<String>,
    disaster_count: usize,
}

/// Reconciles scored clusters against an external hazard feed
#[derive(Debug, Clone)]
pub struct CrossValidator {
    max_radius_km: f64,
    min_match_score: f64,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self {
            max_radius_km: MAX_MATCH_RADIUS_KM,
            min_match_score: MIN_MATCH_SCORE,
        }
    }
}

impl CrossValidator {
    pub fn new(max_radius_km: f64, min_match_score: f64) -> Self {
        Self {
            max_radius_km,
            min_match_score,
        }
    }

    /// Cross-validate every community against the hazard feed.
    ///
    /// `resolved` maps lowercased location names to coordinates; a cluster
    /// whose primary location is absent counts as no-match and is never
    /// keyed in the result. With no communities or no hazard alerts the
    /// scorer output passes through unadjusted.
    pub fn validate(
        &self,
        messages: &[Message],
        communities: &HashMap<String, CommunityId>,
        hazards: &[HazardAlert],
        scored: &ScoredAlerts,
        resolved: &HashMap<String, Coordinates>,
    ) -> CrossValidationReport {
        if messages.is_empty() || communities.is_empty() {
            return CrossValidationReport {
                cross_validation: BTreeMap::new(),
                adjusted_alerts: scored.alerts.clone(),
                summary: CrossValidationSummary::default(),
            };
        }

        let clusters = collect_clusters(messages, communities);

        if hazards.is_empty() {
            let total = clusters.len();
            return CrossValidationReport {
                cross_validation: BTreeMap::new(),
                adjusted_alerts: scored.alerts.clone(),
                summary: CrossValidationSummary {
                    no_match_clusters: total,
                    total_clusters: total,
                    ..Default::default()
                },
            };
        }

        let mut verdicts: BTreeMap<CommunityId, ClusterVerdict> = BTreeMap::new();
        let mut adjusted = scored.alerts.clone();
        let alert_index: HashMap<String, usize> = adjusted
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.clone(), i))
            .collect();

        let mut summary = CrossValidationSummary {
            total_clusters: clusters.len(),
            ..Default::default()
        };

        for (community, cluster) in &clusters {
            let Some(primary) = cluster.locations.first() else {
                summary.no_match_clusters += 1;
                continue;
            };
            let Some(coords) = resolved.get(&primary.trim().to_lowercase()) else {
                // Location string present but not resolvable: treated the
                // same as a cluster with no location
                summary.no_match_clusters += 1;
                continue;
            };

            let matched = self.best_match(*coords, &cluster.keywords, hazards);

            let Some(alert) = matched else {
                summary.no_match_clusters += 1;
                verdicts.insert(
                    *community,
                    ClusterVerdict {
                        status: ClusterStatus::NoMatch,
                        location: primary.clone(),
                        matched_alert: None,
                        alignment_score: 0.0,
                        cluster_size: cluster.members.len(),
                        disaster_count: cluster.disaster_count,
                    },
                );
                continue;
            };

            let has_disasters = cluster.disaster_count > 0;
            let rank = alert.severity.rank();

            let (status, alignment_score) = match (has_disasters, rank > 0) {
                (true, true) => {
                    summary.aligned_clusters += 1;
                    (ClusterStatus::Aligned, 0.8 + f64::from(rank) * 0.05)
                }
                (true, false) => {
                    summary.contradicted_clusters += 1;
                    (ClusterStatus::Contradicted, -0.3)
                }
                (false, true) => {
                    summary.contradicted_clusters += 1;
                    (ClusterStatus::Contradicted, -0.2)
                }
                (false, false) => {
                    summary.no_match_clusters += 1;
                    (ClusterStatus::Neutral, 0.0)
                }
            };

            for member in &cluster.members {
                if let Some(&idx) = alert_index.get(member) {
                    apply_adjustment(&mut adjusted[idx], alignment_score);
                }
            }

            verdicts.insert(
                *community,
                ClusterVerdict {
                    status,
                    location: primary.clone(),
                    matched_alert: Some(alert.into()),
                    alignment_score,
                    cluster_size: cluster.members.len(),
                    disaster_count: cluster.disaster_count,
                },
            );
        }

        adjusted.sort_by(|a, b| b.alert_score.total_cmp(&a.alert_score));
        adjusted.truncate(MAX_RANKED_ALERTS);

        CrossValidationReport {
            cross_validation: verdicts,
            adjusted_alerts: adjusted,
            summary,
        }
    }

    /// Best-matching hazard alert within radius, if its score clears the bar
    fn best_match<'a>(
        &self,
        cluster_coords: Coordinates,
        cluster_keywords: &[String],
        hazards: &'a [HazardAlert],
    ) -> Option<&'a HazardAlert> {
        let mut best: Option<&HazardAlert> = None;
        let mut best_score = 0.0;

        for alert in hazards {
            let distance = haversine_km(cluster_coords, Coordinates::new(alert.lat, alert.lon));
            if distance > self.max_radius_km {
                continue;
            }

            let distance_score = (1.0 - distance / self.max_radius_km).max(0.0);
            let keyword_score = if keyword_matches(cluster_keywords, &alert.event) {
                1.0
            } else {
                KEYWORD_MISS_FACTOR
            };
            let score =
                DISTANCE_MATCH_WEIGHT * distance_score + KEYWORD_MATCH_WEIGHT * keyword_score;

            if score > best_score {
                best_score = score;
                best = Some(alert);
            }
        }

        (best_score >= self.min_match_score).then_some(best).flatten()
    }
}

/// Any case-insensitive substring match, in either direction, counts
fn keyword_matches(keywords: &[String], event: &str) -> bool {
    let event = event.to_lowercase();
    keywords.iter().any(|kw| {
        let kw = kw.to_lowercase();
        event.contains(&kw) || kw.contains(&event)
    })
}

/// Group messages by community in deterministic community-id order
fn collect_clusters(
    messages: &[Message],
    communities: &HashMap<String, CommunityId>,
) -> BTreeMap<CommunityId, Cluster> {
    let mut clusters: BTreeMap<CommunityId, Cluster> = BTreeMap::new();

    for message in messages {
        let Some(&community) = communities.get(&message.id) else {
            continue;
        };
        let cluster = clusters.entry(community).or_default();
        cluster.members.push(message.id.clone());
        if let Some(location) = message.location.as_deref().filter(|l| !l.is_empty()) {
            if !cluster.locations.iter().any(|l| l == location) {
                cluster.locations.push(location.to_string());
            }
        }
        if let Some(keyword) = message.keyword.as_deref().filter(|k| !k.is_empty()) {
            if !cluster.keywords.iter().any(|k| k == keyword) {
                cluster.keywords.push(keyword.to_string());
            }
        }
        if message.disaster {
            cluster.disaster_count += 1;
        }
    }

    clusters
}

/// Apply the bounded boost/penalty and tag the alignment verdict
fn apply_adjustment(alert: &mut crate::records::AlertRecord, alignment_score: f64) {
    if alignment_score > 0.0 {
        let boost = (alignment_score * ADJUSTMENT_SCALE).min(MAX_ADJUSTMENT);
        alert.alert_score = (alert.alert_score + boost).min(1.0);
        alert.gov_alignment = Some(Alignment::Aligned);
        alert.gov_boost = Some(boost);
    } else if alignment_score < 0.0 {
        let penalty = (alignment_score.abs() * ADJUSTMENT_SCALE).min(MAX_ADJUSTMENT);
        alert.alert_score = (alert.alert_score - penalty).max(0.0);
        alert.gov_alignment = Some(Alignment::Contradicted);
        alert.gov_penalty = Some(penalty);
    } else {
        alert.gov_alignment = Some(Alignment::Neutral);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AlertRecord, SentimentLabel, Severity};

    fn message(id: &str, keyword: &str, location: Option<&str>, disaster: bool) -> Message {
        Message {
            id: id.to_string(),
            text: format!("{keyword} report {id}"),
            keyword: Some(keyword.to_string()),
            location: location.map(str::to_string),
            disaster,
            timestamp: None,
        }
    }

    fn alert_record(id: &str, score: f64) -> AlertRecord {
        AlertRecord {
            id: id.to_string(),
            text: String::new(),
            keyword: None,
            location: None,
            disaster: true,
            community: Some(0),
            alert_score: score,
            centrality_score: 0.0,
            sentiment_risk: 0.0,
            topic_confidence: 0.0,
            sentiment_label: SentimentLabel::Neutral,
            severity: Severity::from_score(score),
            gov_alignment: None,
            gov_boost: None,
            gov_penalty: None,
        }
    }

    fn hazard(event: &str, severity: Severity, lat: f64, lon: f64) -> HazardAlert {
        HazardAlert {
            event: event.to_string(),
            severity,
            lat,
            lon,
            start_time: None,
            end_time: None,
            provider: "test-feed".to_string(),
            description: None,
            location_name: None,
        }
    }

    fn city_a() -> Coordinates {
        Coordinates::new(40.7128, -74.0060)
    }

    fn resolved_city_a() -> HashMap<String, Coordinates> {
        HashMap::from([("city a".to_string(), city_a())])
    }

    fn communities_for(ids: &[&str], community: CommunityId) -> HashMap<String, CommunityId> {
        ids.iter().map(|id| (id.to_string(), community)).collect()
    }

    #[test]
    fn test_aligned_cluster_boosts_members() {
        let messages = vec![
            message("1", "flood", Some("City A"), true),
            message("2", "flood", Some("City A"), true),
            message("3", "flood", Some("City A"), true),
        ];
        let communities = communities_for(&["1", "2", "3"], 0);
        let hazards = vec![hazard("Flood Warning", Severity::High, 40.7128, -74.0060)];
        let scored = ScoredAlerts {
            alerts: vec![alert_record("1", 0.5), alert_record("2", 0.4), alert_record("3", 0.3)],
            summary: Default::default(),
        };

        let report = CrossValidator::default().validate(
            &messages,
            &communities,
            &hazards,
            &scored,
            &resolved_city_a(),
        );

        let verdict = &report.cross_validation[&0];
        assert_eq!(verdict.status, ClusterStatus::Aligned);
        // High rank 2 -> 0.8 + 0.05·2 = 0.90
        assert!((verdict.alignment_score - 0.90).abs() < 1e-12);
        assert_eq!(verdict.disaster_count, 3);
        assert_eq!(verdict.cluster_size, 3);
        assert_eq!(report.summary.aligned_clusters, 1);

        // Boost is min(0.15, 0.90·0.2 = 0.18) = 0.15 for every member
        for alert in &report.adjusted_alerts {
            assert_eq!(alert.gov_alignment, Some(Alignment::Aligned));
            assert!((alert.gov_boost.unwrap() - MAX_ADJUSTMENT).abs() < 1e-12);
        }
        let by_id = |id: &str| {
            report
                .adjusted_alerts
                .iter()
                .find(|a| a.id == id)
                .unwrap()
                .alert_score
        };
        assert!((by_id("1") - 0.65).abs() < 1e-12);
        assert!((by_id("3") - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_disaster_cluster_against_normal_alert_contradicts() {
        let messages = vec![message("1", "flood", Some("City A"), true)];
        let communities = communities_for(&["1"], 0);
        let hazards = vec![hazard("Clear Weather", Severity::Normal, 40.7128, -74.0060)];
        let scored = ScoredAlerts {
            alerts: vec![alert_record("1", 0.5)],
            summary: Default::default(),
        };

        let report = CrossValidator::default().validate(
            &messages,
            &communities,
            &hazards,
            &scored,
            &resolved_city_a(),
        );

        let verdict = &report.cross_validation[&0];
        assert_eq!(verdict.status, ClusterStatus::Contradicted);
        assert!((verdict.alignment_score + 0.3).abs() < 1e-12);
        // Penalty = min(0.15, 0.3·0.2) = 0.06
        let alert = &report.adjusted_alerts[0];
        assert!((alert.gov_penalty.unwrap() - 0.06).abs() < 1e-12);
        assert!((alert.alert_score - 0.44).abs() < 1e-12);
        assert_eq!(report.summary.contradicted_clusters, 1);
    }

    #[test]
    fn test_calm_cluster_against_active_alert_contradicts() {
        let messages = vec![message("1", "flood", Some("City A"), false)];
        let communities = communities_for(&["1"], 0);
        let hazards = vec![hazard("Flood Warning", Severity::Critical, 40.7128, -74.0060)];
        let scored = ScoredAlerts {
            alerts: vec![alert_record("1", 0.5)],
            summary: Default::default(),
        };

        let report = CrossValidator::default().validate(
            &messages,
            &communities,
            &hazards,
            &scored,
            &resolved_city_a(),
        );

        let verdict = &report.cross_validation[&0];
        assert_eq!(verdict.status, ClusterStatus::Contradicted);
        assert!((verdict.alignment_score + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_neutral_cluster_counts_toward_no_match() {
        let messages = vec![message("1", "flood", Some("City A"), false)];
        let communities = communities_for(&["1"], 0);
        let hazards = vec![hazard("Flood Watch", Severity::Normal, 40.7128, -74.0060)];
        let scored = ScoredAlerts {
            alerts: vec![alert_record("1", 0.5)],
            summary: Default::default(),
        };

        let report = CrossValidator::default().validate(
            &messages,
            &communities,
            &hazards,
            &scored,
            &resolved_city_a(),
        );

        let verdict = &report.cross_validation[&0];
        assert_eq!(verdict.status, ClusterStatus::Neutral);
        assert_eq!(verdict.alignment_score, 0.0);
        assert_eq!(report.summary.no_match_clusters, 1);
        assert_eq!(
            report.adjusted_alerts[0].gov_alignment,
            Some(Alignment::Neutral)
        );
        assert_eq!(report.adjusted_alerts[0].alert_score, 0.5);
    }

    #[test]
    fn test_cluster_without_resolvable_location_is_counted_not_keyed() {
        let messages = vec![
            message("1", "flood", None, true),
            message("2", "fire", Some("Atlantis"), true),
        ];
        let mut communities = HashMap::new();
        communities.insert("1".to_string(), 0u32);
        communities.insert("2".to_string(), 1u32);
        let hazards = vec![hazard("Flood Warning", Severity::High, 40.7128, -74.0060)];
        let scored = ScoredAlerts {
            alerts: vec![alert_record("1", 0.5), alert_record("2", 0.5)],
            summary: Default::default(),
        };

        // "Atlantis" is deliberately absent from the resolved map
        let report = CrossValidator::default().validate(
            &messages,
            &communities,
            &hazards,
            &scored,
            &resolved_city_a(),
        );

        assert!(report.cross_validation.is_empty());
        assert_eq!(report.summary.no_match_clusters, 2);
        assert_eq!(report.summary.total_clusters, 2);
    }

    #[test]
    fn test_alert_outside_radius_yields_no_match_entry() {
        let messages = vec![message("1", "flood", Some("City A"), true)];
        let communities = communities_for(&["1"], 0);
        // ~100 km away
        let hazards = vec![hazard("Flood Warning", Severity::High, 41.6, -74.0)];
        let scored = ScoredAlerts {
            alerts: vec![alert_record("1", 0.5)],
            summary: Default::default(),
        };

        let report = CrossValidator::default().validate(
            &messages,
            &communities,
            &hazards,
            &scored,
            &resolved_city_a(),
        );

        let verdict = &report.cross_validation[&0];
        assert_eq!(verdict.status, ClusterStatus::NoMatch);
        assert!(verdict.matched_alert.is_none());
        assert_eq!(report.summary.no_match_clusters, 1);
    }

    #[test]
    fn test_empty_feed_passes_alerts_through_with_cluster_count() {
        let messages = vec![
            message("1", "flood", Some("City A"), true),
            message("2", "fire", Some("City A"), true),
        ];
        let mut communities = HashMap::new();
        communities.insert("1".to_string(), 0u32);
        communities.insert("2".to_string(), 1u32);
        let scored = ScoredAlerts {
            alerts: vec![alert_record("1", 0.5), alert_record("2", 0.4)],
            summary: Default::default(),
        };

        let report = CrossValidator::default().validate(
            &messages,
            &communities,
            &[],
            &scored,
            &resolved_city_a(),
        );

        assert!(report.cross_validation.is_empty());
        assert_eq!(report.adjusted_alerts.len(), 2);
        assert_eq!(report.summary.no_match_clusters, 2);
        assert_eq!(report.summary.aligned_clusters, 0);
    }

    #[test]
    fn test_no_communities_yields_zeroed_summary() {
        let messages = vec![message("1", "flood", Some("City A"), true)];
        let scored = ScoredAlerts {
            alerts: vec![alert_record("1", 0.5)],
            summary: Default::default(),
        };

        let report = CrossValidator::default().validate(
            &messages,
            &HashMap::new(),
            &[hazard("Flood Warning", Severity::High, 40.7128, -74.0060)],
            &scored,
            &resolved_city_a(),
        );

        assert!(report.cross_validation.is_empty());
        assert_eq!(report.summary, CrossValidationSummary::default());
        assert_eq!(report.adjusted_alerts[0].alert_score, 0.5);
    }

    #[test]
    fn test_keyword_substring_matches_either_direction() {
        assert!(keyword_matches(&["flood".to_string()], "Flood Warning"));
        assert!(keyword_matches(
            &["severe thunderstorm with hail".to_string()],
            "Thunderstorm"
        ));
        assert!(!keyword_matches(&["earthquake".to_string()], "Flood Warning"));
    }

    #[test]
    fn test_boost_clamped_at_one() {
        let messages = vec![message("1", "flood", Some("City A"), true)];
        let communities = communities_for(&["1"], 0);
        let hazards = vec![hazard("Flood Warning", Severity::Critical, 40.7128, -74.0060)];
        let scored = ScoredAlerts {
            alerts: vec![alert_record("1", 0.95)],
            summary: Default::default(),
        };

        let report = CrossValidator::default().validate(
            &messages,
            &communities,
            &hazards,
            &scored,
            &resolved_city_a(),
        );

        assert_eq!(report.adjusted_alerts[0].alert_score, 1.0);
    }

    #[test]
    fn test_adjusted_alerts_resorted_descending() {
        let messages = vec![
            message("1", "flood", Some("City A"), true),
            message("2", "flood", Some("City A"), true),
        ];
        let communities = communities_for(&["1"], 0);
        let hazards = vec![hazard("Flood Warning", Severity::High, 40.7128, -74.0060)];
        // Member "1" starts below "2" but gets boosted past it
        let scored = ScoredAlerts {
            alerts: vec![alert_record("2", 0.5), alert_record("1", 0.45)],
            summary: Default::default(),
        };

        let report = CrossValidator::default().validate(
            &messages,
            &communities,
            &hazards,
            &scored,
            &resolved_city_a(),
        );

        assert_eq!(report.adjusted_alerts[0].id, "1");
        assert!((report.adjusted_alerts[0].alert_score - 0.60).abs() < 1e-12);
    }
}
