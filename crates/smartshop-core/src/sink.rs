//! Sink trait and in-process implementations.
//!
//! The tick loop hands every payload to a [`Sink`] and never looks at the
//! outcome. Transport, serialization and per-message failure handling all
//! belong to the sink: a failed delivery is logged and dropped inside the
//! implementation, so one bad message can never stall or abort the loop.
//!
//! This crate ships two sinks that need no message bus:
//!
//! - [`DryRunSink`] -- counts payloads per topic and delivers nothing.
//! - [`RecordingSink`] -- keeps every emitted record, for tests and tooling.

use std::collections::BTreeMap;

use smartshop_types::{Payload, Topic};
use tracing::trace;

/// Destination for emitted payloads.
pub trait Sink {
    /// Deliver `payload` to `topic`, keyed by `key` (the session id).
    ///
    /// Implementations must not block for long and must not fail: errors are
    /// logged and the message is dropped.
    fn emit(&mut self, topic: Topic, key: &str, payload: &Payload);
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn emit(&mut self, topic: Topic, key: &str, payload: &Payload) {
        (**self).emit(topic, key, payload);
    }
}

/// A sink that delivers nothing and only counts what it was given.
#[derive(Debug, Clone, Default)]
pub struct DryRunSink {
    counts: BTreeMap<Topic, u64>,
}

impl DryRunSink {
    /// Create an empty dry-run sink.
    pub const fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }

    /// Number of payloads emitted to `topic` so far.
    pub fn count(&self, topic: Topic) -> u64 {
        self.counts.get(&topic).copied().unwrap_or(0)
    }

    /// Total number of payloads emitted so far.
    pub fn total(&self) -> u64 {
        self.counts.values().copied().fold(0, u64::saturating_add)
    }
}

impl Sink for DryRunSink {
    fn emit(&mut self, topic: Topic, key: &str, _payload: &Payload) {
        trace!(topic = %topic, key, "dry-run: payload not delivered");
        let count = self.counts.entry(topic).or_insert(0);
        *count = count.saturating_add(1);
    }
}

/// One payload captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedRecord {
    /// Topic the payload was emitted to.
    pub topic: Topic,
    /// Message key.
    pub key: String,
    /// The payload itself.
    pub payload: Payload,
}

/// A sink that keeps every payload in emission order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Vec<EmittedRecord>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// All captured records, oldest first.
    pub fn records(&self) -> &[EmittedRecord] {
        &self.records
    }

    /// Captured records emitted to `topic`.
    pub fn on_topic(&self, topic: Topic) -> impl Iterator<Item = &EmittedRecord> {
        self.records.iter().filter(move |r| r.topic == topic)
    }

    /// Drop all captured records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Sink for RecordingSink {
    fn emit(&mut self, topic: Topic, key: &str, payload: &Payload) {
        self.records.push(EmittedRecord {
            topic,
            key: key.to_owned(),
            payload: payload.clone(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use smartshop_types::{PayloadBody, SessionId};

    use super::*;

    fn heartbeat() -> Payload {
        Payload {
            ts: 0,
            session_id: SessionId::new("s"),
            body: PayloadBody::Heartbeat {},
        }
    }

    #[test]
    fn dry_run_counts_per_topic() {
        let mut sink = DryRunSink::new();
        sink.emit(Topic::Basket, "s", &heartbeat());
        sink.emit(Topic::Basket, "s", &heartbeat());
        sink.emit(Topic::Checkout, "s", &heartbeat());
        assert_eq!(sink.count(Topic::Basket), 2);
        assert_eq!(sink.count(Topic::Checkin), 0);
        assert_eq!(sink.total(), 3);
    }

    #[test]
    fn recording_keeps_order_and_filters() {
        let mut sink = RecordingSink::new();
        {
            let mut borrowed = &mut sink;
            borrowed.emit(Topic::Checkin, "a", &heartbeat());
        }
        sink.emit(Topic::Checkout, "b", &heartbeat());
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.records()[0].key, "a");
        assert_eq!(sink.on_topic(Topic::Checkout).count(), 1);
        sink.clear();
        assert!(sink.records().is_empty());
    }
}
