//! Rolling aggregation over the live event window
//!
//! The window keeps the most recent [`MAX_LIVE_EVENTS`] events in arrival
//! order; every insertion recomputes the summary from scratch and pushes
//! an update through the broadcaster. Publishing happens outside the lock.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crisisnet_core::{LiveEvent, LiveSummary, LocationCount, MAX_LIVE_EVENTS};

use crate::broadcast::{Broadcaster, LiveUpdate};

/// Entries kept on each summary leaderboard
const TOP_N: usize = 5;

#[derive(Default)]
struct AggregatorState {
    events: VecDeque<LiveEvent>,
    summary: LiveSummary,
}

pub struct LiveAggregator {
    inner: Mutex<AggregatorState>,
    broadcaster: Arc<Broadcaster>,
    capacity: usize,
}

impl LiveAggregator {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self::with_capacity(broadcaster, MAX_LIVE_EVENTS)
    }

    pub fn with_capacity(broadcaster: Arc<Broadcaster>, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(AggregatorState::default()),
            broadcaster,
            capacity: capacity.max(1),
        }
    }

    /// Append an event, evict the oldest past capacity, refresh the summary,
    /// and notify subscribers
    pub fn ingest(&self, event: LiveEvent) {
        let update = {
            let mut state = self.inner.lock();
            state.events.push_back(event.clone());
            while state.events.len() > self.capacity {
                state.events.pop_front();
            }
            state.summary = summarize(&state.events);
            LiveUpdate {
                event,
                summary: state.summary.clone(),
            }
        };
        self.broadcaster.publish(&update);
    }

    /// Snapshot of the current window, oldest first
    pub fn events(&self) -> Vec<LiveEvent> {
        self.inner.lock().events.iter().cloned().collect()
    }

    pub fn summary(&self) -> LiveSummary {
        self.inner.lock().summary.clone()
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.broadcaster.clone()
    }
}

fn summarize(events: &VecDeque<LiveEvent>) -> LiveSummary {
    let mut sentiment_sum = 0.0;
    let mut sentiment_count = 0usize;

    // First-seen orderings break count ties
    let mut location_order: Vec<String> = Vec::new();
    let mut location_counts: HashMap<String, usize> = HashMap::new();
    let mut location_coords: HashMap<String, (f64, f64)> = HashMap::new();
    let mut keyword_order: Vec<String> = Vec::new();
    let mut keyword_counts: HashMap<String, usize> = HashMap::new();

    for event in events {
        if let Some(sentiment) = &event.sentiment {
            sentiment_sum += sentiment.compound;
            sentiment_count += 1;
        }

        if let Some(location) = event.location.as_deref() {
            let location = location.trim();
            if !location.is_empty() {
                let key = location.to_string();
                if !location_counts.contains_key(&key) {
                    location_order.push(key.clone());
                }
                *location_counts.entry(key.clone()).or_insert(0) += 1;
                if let (Some(lat), Some(lon)) = (event.lat, event.lon) {
                    location_coords.entry(key).or_insert((lat, lon));
                }
            }
        }

        for keyword in &event.keywords {
            if !keyword_counts.contains_key(keyword) {
                keyword_order.push(keyword.clone());
            }
            *keyword_counts.entry(keyword.clone()).or_insert(0) += 1;
        }
    }

    // Stable sort keeps first-seen order among equal counts
    location_order.sort_by_key(|l| std::cmp::Reverse(location_counts[l]));
    keyword_order.sort_by_key(|k| std::cmp::Reverse(keyword_counts[k]));

    let top_locations = location_order
        .into_iter()
        .take(TOP_N)
        .map(|location| {
            let coords = location_coords.get(&location).copied();
            LocationCount {
                count: location_counts[&location],
                lat: coords.map(|c| c.0),
                lon: coords.map(|c| c.1),
                location,
            }
        })
        .collect();

    LiveSummary {
        total_events: events.len(),
        avg_sentiment: if sentiment_count > 0 {
            sentiment_sum / sentiment_count as f64
        } else {
            0.0
        },
        top_locations,
        top_keywords: keyword_order.into_iter().take(TOP_N).collect(),
        last_event: events.back().cloned(),
    }
}
