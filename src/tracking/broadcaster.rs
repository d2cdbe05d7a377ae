use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::pose::Keypoint;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TickUpdate {
    pub repetitions: u32,
    pub accuracy: f64,
    pub latest_feedback: Option<String>,
    pub tracking: bool,
    pub keypoints: Vec<Keypoint>,
}

/// Receiving end of the push channel. Delivery must return immediately; a sink
/// that cannot keep up drops the update instead of blocking the tick.
pub trait UpdateSink: Send + Sync {
    fn deliver(&self, update: TickUpdate) -> anyhow::Result<()>;
}

impl UpdateSink for mpsc::UnboundedSender<TickUpdate> {
    fn deliver(&self, update: TickUpdate) -> anyhow::Result<()> {
        self.send(update)
            .map_err(|_| anyhow::anyhow!("update receiver closed"))
    }
}

impl UpdateSink for mpsc::Sender<TickUpdate> {
    fn deliver(&self, update: TickUpdate) -> anyhow::Result<()> {
        self.try_send(update)
            .map_err(|err| anyhow::anyhow!("update dropped: {err}"))
    }
}

/// Single-subscriber slot. The last attach wins.
#[derive(Default)]
pub struct Broadcaster {
    subscriber: Option<Box<dyn UpdateSink>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, sink: Box<dyn UpdateSink>) {
        if self.subscriber.replace(sink).is_some() {
            debug!("Replacing existing update subscriber");
        }
    }

    pub fn detach(&mut self) {
        self.subscriber = None;
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.is_some()
    }

    /// Hands `update` to the subscriber, if any. Never retried or buffered.
    pub fn publish(&self, update: TickUpdate) {
        let Some(sink) = self.subscriber.as_ref() else {
            return;
        };
        if let Err(err) = sink.deliver(update) {
            debug!("Tick update not delivered: {err}");
        }
    }
}
