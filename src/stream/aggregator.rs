//! Channel-fed aggregator task with throttled emission.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::frame::{StreamFrame, DEFAULT_FRAME_MARKER, DEFAULT_MAX_LINES};

/// Tuning for a [`StreamAggregator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Finalized lines retained.
    pub max_lines: usize,
    /// Emission cadence.
    pub interval: Duration,
    /// Case-insensitive frame-start marker; empty disables detection.
    pub frame_marker: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            interval: Duration::from_millis(75),
            frame_marker: DEFAULT_FRAME_MARKER.to_string(),
        }
    }
}

#[derive(Debug)]
enum FeedMessage {
    Text(String),
    Bytes(Vec<u8>),
    Reset(Option<String>),
}

/// Producer handle for a running aggregator task.
///
/// Clones may be used from any thread; all frame mutation happens on the
/// single consumer task, which exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct StreamAggregator {
    tx: mpsc::UnboundedSender<FeedMessage>,
}

impl StreamAggregator {
    /// Start the consumer task. Snapshots arrive on the returned receiver.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: AggregatorConfig) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let frame = StreamFrame::new(config.max_lines, config.frame_marker);
        let interval = config.interval.max(Duration::from_millis(1));

        tokio::spawn(consume(rx, frame, out_tx, interval));
        (Self { tx }, out_rx)
    }

    /// Queue a text chunk.
    pub fn feed_text(&self, text: impl Into<String>) {
        self.send(FeedMessage::Text(text.into()));
    }

    /// Queue a raw byte chunk.
    pub fn feed_bytes(&self, bytes: impl Into<Vec<u8>>) {
        self.send(FeedMessage::Bytes(bytes.into()));
    }

    /// Queue a full reset, optionally seeding a header line.
    pub fn reset(&self, header: Option<&str>) {
        self.send(FeedMessage::Reset(header.map(str::to_string)));
    }

    /// Whether the consumer task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, message: FeedMessage) {
        if self.tx.send(message).is_err() {
            trace!("Stream aggregator closed; dropping chunk");
        }
    }
}

async fn consume(
    mut rx: mpsc::UnboundedReceiver<FeedMessage>,
    mut frame: StreamFrame,
    out: mpsc::UnboundedSender<String>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(FeedMessage::Text(text)) => frame.feed_text(&text),
                Some(FeedMessage::Bytes(bytes)) => frame.feed_bytes(&bytes),
                Some(FeedMessage::Reset(header)) => frame.reset(header.as_deref()),
                None => {
                    if let Some(snapshot) = frame.take_snapshot() {
                        let _ = out.send(snapshot);
                    }
                    break;
                }
            },
            _ = ticker.tick() => {
                if let Some(snapshot) = frame.take_snapshot()
                    && out.send(snapshot).is_err()
                {
                    break;
                }
            }
        }
    }

    debug!("Stream aggregator stopped");
}
