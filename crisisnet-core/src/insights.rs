//! Corpus aggregates: temporal timeline and per-location rollups

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::records::{Message, SignalBundle};

/// One day-bucket of the corpus timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// Bucket start (midnight UTC)
    pub timestamp: DateTime<Utc>,
    pub total: usize,
    pub disaster: usize,
    pub non_disaster: usize,
}

/// Day-bucketed disaster vs non-disaster message counts
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Timeline {
    pub points: Vec<TimelinePoint>,
    /// False when no message carried a timestamp
    pub has_real_timestamp: bool,
}

/// Bucket timestamped messages by UTC day, ascending
pub fn build_timeline(messages: &[Message]) -> Timeline {
    let mut buckets: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();

    for message in messages {
        let Some(ts) = message.timestamp else { continue };
        let entry = buckets.entry(ts.date_naive()).or_insert((0, 0));
        entry.0 += 1;
        if message.disaster {
            entry.1 += 1;
        }
    }

    let points: Vec<TimelinePoint> = buckets
        .into_iter()
        .filter_map(|(date, (total, disaster))| {
            let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
            Some(TimelinePoint {
                timestamp: midnight,
                total,
                disaster,
                non_disaster: total - disaster,
            })
        })
        .collect();

    Timeline {
        has_real_timestamp: !points.is_empty(),
        points,
    }
}

/// Aggregates for one geocoded location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInsight {
    pub location: String,
    pub lat: f64,
    pub lon: f64,
    pub total_messages: usize,
    pub disaster_messages: usize,
    pub non_disaster_messages: usize,
    /// Up to 3 most frequent keywords at this location
    pub top_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_sentiment: Option<f64>,
    pub disaster_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoHotspot {
    pub location: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoSummary {
    pub total_geocoded_locations: usize,
    /// Location with the most messages
    pub highest_activity: GeoHotspot,
    /// Location with the highest disaster ratio
    pub highest_risk: GeoHotspot,
}

/// Per-location rollups over geocoded corpus locations, sorted by volume
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeoInsights {
    pub locations: Vec<LocationInsight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<GeoSummary>,
}

/// Aggregate geographic insights per resolvable location.
///
/// `resolved` maps lowercased location names to coordinates; locations
/// without an entry are skipped.
pub fn geo_insights(
    messages: &[Message],
    signals: &SignalBundle,
    resolved: &HashMap<String, Coordinates>,
) -> GeoInsights {
    // Group message indices by location, first-seen order
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, message) in messages.iter().enumerate() {
        let Some(location) = message.location.as_deref().filter(|l| !l.is_empty()) else {
            continue;
        };
        let entry = groups.entry(location.to_string()).or_default();
        if entry.is_empty() {
            order.push(location.to_string());
        }
        entry.push(idx);
    }

    let mut locations: Vec<LocationInsight> = Vec::new();
    for location in order {
        let Some(coords) = resolved.get(&location.trim().to_lowercase()) else {
            continue;
        };
        let group = &groups[&location];

        let total = group.len();
        let disaster = group.iter().filter(|&&i| messages[i].disaster).count();

        // Keyword leaderboard, ties by first appearance
        let mut keyword_order: Vec<String> = Vec::new();
        let mut keyword_counts: HashMap<String, usize> = HashMap::new();
        for &i in group {
            let Some(kw) = messages[i].keyword.as_deref().filter(|k| !k.is_empty()) else {
                continue;
            };
            let count = keyword_counts.entry(kw.to_string()).or_insert(0);
            if *count == 0 {
                keyword_order.push(kw.to_string());
            }
            *count += 1;
        }
        keyword_order.sort_by(|a, b| keyword_counts[b].cmp(&keyword_counts[a]));
        keyword_order.truncate(3);

        let sentiments: Vec<f64> = group
            .iter()
            .filter_map(|&i| signals.sentiment_for(&messages[i].id).map(|s| s.compound))
            .collect();
        let average_sentiment = if sentiments.is_empty() {
            None
        } else {
            Some(sentiments.iter().sum::<f64>() / sentiments.len() as f64)
        };

        locations.push(LocationInsight {
            location,
            lat: coords.lat,
            lon: coords.lon,
            total_messages: total,
            disaster_messages: disaster,
            non_disaster_messages: total - disaster,
            top_keywords: keyword_order,
            average_sentiment,
            disaster_ratio: if total > 0 {
                disaster as f64 / total as f64
            } else {
                0.0
            },
        });
    }

    if locations.is_empty() {
        return GeoInsights::default();
    }

    let highest_activity = locations
        .iter()
        .max_by_key(|l| l.total_messages)
        .map(|l| GeoHotspot {
            location: l.location.clone(),
            value: l.total_messages as f64,
        });
    let highest_risk = locations
        .iter()
        .max_by(|a, b| a.disaster_ratio.total_cmp(&b.disaster_ratio))
        .map(|l| GeoHotspot {
            location: l.location.clone(),
            value: l.disaster_ratio,
        });

    let summary = match (highest_activity, highest_risk) {
        (Some(activity), Some(risk)) => Some(GeoSummary {
            total_geocoded_locations: locations.len(),
            highest_activity: activity,
            highest_risk: risk,
        }),
        _ => None,
    };

    locations.sort_by(|a, b| b.total_messages.cmp(&a.total_messages));

    GeoInsights { locations, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SentimentSignal;
    use chrono::TimeZone;

    fn message(
        id: &str,
        keyword: Option<&str>,
        location: Option<&str>,
        disaster: bool,
        day: Option<u32>,
    ) -> Message {
        Message {
            id: id.to_string(),
            text: format!("m {id}"),
            keyword: keyword.map(str::to_string),
            location: location.map(str::to_string),
            disaster,
            timestamp: day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 12, 30, 0).unwrap()),
        }
    }

    #[test]
    fn test_timeline_buckets_by_day() {
        let messages = vec![
            message("1", None, None, true, Some(1)),
            message("2", None, None, false, Some(1)),
            message("3", None, None, true, Some(2)),
        ];
        let timeline = build_timeline(&messages);
        assert!(timeline.has_real_timestamp);
        assert_eq!(timeline.points.len(), 2);
        assert_eq!(timeline.points[0].total, 2);
        assert_eq!(timeline.points[0].disaster, 1);
        assert_eq!(timeline.points[0].non_disaster, 1);
        assert_eq!(timeline.points[1].total, 1);
        assert!(timeline.points[0].timestamp < timeline.points[1].timestamp);
    }

    #[test]
    fn test_timeline_empty_without_timestamps() {
        let messages = vec![message("1", None, None, true, None)];
        let timeline = build_timeline(&messages);
        assert!(!timeline.has_real_timestamp);
        assert!(timeline.points.is_empty());
    }

    #[test]
    fn test_geo_insights_aggregates_per_location() {
        let messages = vec![
            message("1", Some("flood"), Some("City A"), true, None),
            message("2", Some("flood"), Some("City A"), true, None),
            message("3", Some("fire"), Some("City A"), false, None),
            message("4", Some("fire"), Some("City B"), false, None),
        ];
        let mut signals = SignalBundle::default();
        signals.sentiments.insert(
            "1".to_string(),
            SentimentSignal {
                compound: -0.5,
                ..Default::default()
            },
        );
        signals.sentiments.insert(
            "2".to_string(),
            SentimentSignal {
                compound: -0.7,
                ..Default::default()
            },
        );
        let resolved = HashMap::from([
            ("city a".to_string(), Coordinates::new(1.0, 2.0)),
            ("city b".to_string(), Coordinates::new(3.0, 4.0)),
        ]);

        let insights = geo_insights(&messages, &signals, &resolved);
        assert_eq!(insights.locations.len(), 2);

        let city_a = &insights.locations[0];
        assert_eq!(city_a.location, "City A");
        assert_eq!(city_a.total_messages, 3);
        assert_eq!(city_a.disaster_messages, 2);
        assert_eq!(city_a.top_keywords[0], "flood");
        assert!((city_a.average_sentiment.unwrap() + 0.6).abs() < 1e-12);
        assert!((city_a.disaster_ratio - 2.0 / 3.0).abs() < 1e-12);

        let summary = insights.summary.unwrap();
        assert_eq!(summary.highest_activity.location, "City A");
        assert_eq!(summary.highest_risk.location, "City A");
        assert_eq!(summary.total_geocoded_locations, 2);
    }

    #[test]
    fn test_geo_insights_skips_unresolved_locations() {
        let messages = vec![message("1", None, Some("Atlantis"), true, None)];
        let insights = geo_insights(&messages, &SignalBundle::default(), &HashMap::new());
        assert!(insights.locations.is_empty());
        assert!(insights.summary.is_none());
    }
}
