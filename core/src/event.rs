//! Change notifications.
//!
//! RULE: Every externally visible change produces exactly one snapshot,
//! delivered synchronously to every sink in registration order,
//! after the mutation that caused it has been applied.

use crate::types::Lives;
use serde::Serialize;
use std::sync::mpsc;

/// What subscribers see after each change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub current: Lives,
    pub max: Lives,
    pub is_unlimited: bool,
}

/// A subscriber to pool changes. Fire-and-forget: sinks cannot fail
/// the mutation that notified them.
pub trait EventSink: Send {
    fn notify(&mut self, snapshot: &PoolSnapshot);
}

/// Channel sink. A disconnected receiver is not an error.
impl EventSink for mpsc::Sender<PoolSnapshot> {
    fn notify(&mut self, snapshot: &PoolSnapshot) {
        if self.send(*snapshot).is_err() {
            log::trace!("lives: snapshot receiver dropped");
        }
    }
}

/// Sink that logs each snapshot. Handy for headless tooling.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn notify(&mut self, snapshot: &PoolSnapshot) {
        log::info!(
            "lives changed: {}/{} unlimited={}",
            snapshot.current,
            snapshot.max,
            snapshot.is_unlimited
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_flat() {
        let snapshot = PoolSnapshot { current: 3, max: 5, is_unlimited: false };
        assert_eq!(
            serde_json::to_value(snapshot).unwrap(),
            serde_json::json!({ "current": 3, "max": 5, "is_unlimited": false })
        );
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (mut tx, rx) = mpsc::channel::<PoolSnapshot>();
        drop(rx);
        tx.notify(&PoolSnapshot { current: 0, max: 5, is_unlimited: true });
    }
}
