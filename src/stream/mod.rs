//! Terminal-stream aggregation for the scan HUD.
//!
//! Capture tools such as airodump-ng redraw a full-screen table with
//! cursor-home sequences and carriage returns. [`StreamFrame`] applies those
//! semantics to produce a clean multi-line frame; [`StreamAggregator`] runs a
//! frame on a single consumer task fed through a channel and emits throttled
//! snapshots on a fixed interval.
//!
//! The aggregator only decorates output for a viewer. Nothing it produces is
//! fed back into the attack loop.

mod aggregator;
mod frame;

pub use aggregator::{AggregatorConfig, StreamAggregator};
pub use frame::{StreamFrame, DEFAULT_FRAME_MARKER, DEFAULT_MAX_LINES};
