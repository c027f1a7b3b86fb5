//! Replay event source - streams recorded events as if they were live

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crisisnet_core::{extract_keywords, LiveEvent};
use crisisnet_ports::{EventSource, PortError};

/// Default events delivered per poll
const DEFAULT_BATCH_SIZE: usize = 10;

/// An [`EventSource`] that replays a JSON-lines file of [`LiveEvent`]s
pub struct ReplaySource {
    pending: VecDeque<LiveEvent>,
    batch_size: usize,
    interval: Duration,
}

impl ReplaySource {
    pub fn new(events: Vec<LiveEvent>, interval: Duration) -> Self {
        Self {
            pending: events.into_iter().collect(),
            batch_size: DEFAULT_BATCH_SIZE,
            interval,
        }
    }

    /// Load one `LiveEvent` JSON object per line; blank lines are skipped
    pub fn from_path(path: &Path, interval: Duration) -> Result<Self, PortError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PortError::Unavailable(format!("{}: {e}", path.display())))?;

        let mut events = Vec::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event: LiveEvent =
                serde_json::from_str(line).map_err(|e| PortError::Parse(e.to_string()))?;
            events.push(event);
        }

        debug!("loaded {} replay events from {}", events.len(), path.display());
        Ok(Self::new(events, interval))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait]
impl EventSource for ReplaySource {
    async fn poll(&mut self) -> Result<Vec<LiveEvent>, PortError> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            let Some(mut event) = self.pending.pop_front() else {
                break;
            };
            // Recorded events without keywords get them detected from text
            if event.keywords.is_empty() {
                event.keywords = extract_keywords(&event.text);
            }
            batch.push(event);
        }
        Ok(batch)
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}
