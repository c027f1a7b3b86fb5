//! Background polling of an event source into the live aggregator
//!
//! A producer task polls the source on its own interval and hands events
//! to a consumer task over a bounded queue; the consumer feeds the
//! aggregator. Shutdown is signalled over a watch channel and `stop`
//! waits for both tasks to finish.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crisisnet_ports::EventSource;

use crate::live::LiveAggregator;

/// Events buffered between producer and consumer
const EVENT_QUEUE_DEPTH: usize = 256;

pub struct LivePoller {
    aggregator: Arc<LiveAggregator>,
    shutdown_tx: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl LivePoller {
    pub fn new(aggregator: Arc<LiveAggregator>) -> Self {
        Self {
            aggregator,
            shutdown_tx: None,
            handles: Vec::new(),
        }
    }

    /// Start polling. Calling while already running is a no-op.
    pub fn start(&mut self, mut source: Box<dyn EventSource>) {
        if self.is_running() {
            warn!("poller already running, ignoring start");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

        let producer = tokio::spawn(async move {
            loop {
                let interval = source.interval();
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(interval) => {
                        match source.poll().await {
                            Ok(events) => {
                                if !events.is_empty() {
                                    debug!("polled {} events", events.len());
                                }
                                for event in events {
                                    if tx.send(event).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Err(e) => warn!("event poll failed: {e}"),
                        }
                    }
                }
            }
        });

        let aggregator = self.aggregator.clone();
        let consumer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                aggregator.ingest(event);
            }
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.handles = vec![producer, consumer];
        info!("live poller started");
    }

    /// Signal shutdown and wait for the tasks to drain and exit
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
        info!("live poller stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.handles.iter().any(|h| !h.is_finished())
    }
}
