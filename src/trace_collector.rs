//! TraceCollector (C12, §4.12) — a bounded, append-only event log. Backed
//! by a ring buffer (`VecDeque` used strictly as a fixed-capacity FIFO, as
//! the teacher's storage modules use it for bounded in-memory queues) so
//! eviction is O(1), never the source's O(n) list head-pop (§9).

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

use crate::contracts::{RetrievalTrace, TraceKind};

struct Inner {
    events: VecDeque<RetrievalTrace>,
    /// `trace_id -> event ids currently present in `events``, letting
    /// `get_by_id` avoid a linear scan (§4.12: "O(1) average").
    index: HashMap<String, Vec<u64>>,
    next_id: u64,
}

pub struct TraceCollector {
    inner: RwLock<Inner>,
    max_events: usize,
}

impl TraceCollector {
    pub fn new(max_events: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                events: VecDeque::with_capacity(max_events.min(1024)),
                index: HashMap::new(),
                next_id: 0,
            }),
            max_events,
        }
    }

    pub fn record(&self, trace_id: impl Into<String>, kind: TraceKind, attrs: HashMap<String, serde_json::Value>) -> u64 {
        let trace_id = trace_id.into();
        let mut inner = self.inner.write();

        let id = inner.next_id;
        inner.next_id += 1;

        let event = RetrievalTrace {
            id,
            trace_id: trace_id.clone(),
            ts: Utc::now(),
            kind,
            attrs,
        };

        inner.events.push_back(event);
        inner.index.entry(trace_id).or_default().push(id);

        if inner.events.len() > self.max_events {
            if let Some(evicted) = inner.events.pop_front() {
                if let Some(ids) = inner.index.get_mut(&evicted.trace_id) {
                    ids.retain(|&i| i != evicted.id);
                    if ids.is_empty() {
                        inner.index.remove(&evicted.trace_id);
                    }
                }
            }
        }

        id
    }

    /// Looks up events by id directly rather than scanning the buffer:
    /// ids are assigned in strictly increasing order and `events` holds
    /// them in that same order, so an id's offset from the oldest event
    /// still present (`events.front()`) is its slot in the `VecDeque`,
    /// which is an O(1) indexed access (§4.12: "O(1) average").
    pub fn get_by_id(&self, trace_id: &str) -> Vec<RetrievalTrace> {
        let inner = self.inner.read();
        let Some(ids) = inner.index.get(trace_id) else {
            return Vec::new();
        };
        let Some(base_id) = inner.events.front().map(|e| e.id) else {
            return Vec::new();
        };

        ids.iter()
            .filter_map(|&id| {
                let offset = id.checked_sub(base_id)?;
                inner.events.get(offset as usize).filter(|e| e.id == id).cloned()
            })
            .collect()
    }

    pub fn recent(&self, n: usize) -> Vec<RetrievalTrace> {
        let inner = self.inner.read();
        inner.events.iter().rev().take(n).cloned().collect::<Vec<_>>().into_iter().rev().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_keeps_buffer_bounded() {
        let collector = TraceCollector::new(5);
        for i in 0..10 {
            collector.record(format!("trace-{i}"), TraceKind::RecallBegin, HashMap::new());
        }
        assert_eq!(collector.len(), 5);
    }

    #[test]
    fn get_by_id_returns_events_for_that_trace_only() {
        let collector = TraceCollector::new(100);
        collector.record("trace-a", TraceKind::RecallBegin, HashMap::new());
        collector.record("trace-a", TraceKind::RecallEnd, HashMap::new());
        collector.record("trace-b", TraceKind::RecallBegin, HashMap::new());

        let events = collector.get_by_id("trace-a");
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.trace_id == "trace-a"));
    }

    #[test]
    fn evicted_events_are_removed_from_the_index() {
        let collector = TraceCollector::new(2);
        collector.record("trace-a", TraceKind::RecallBegin, HashMap::new());
        collector.record("trace-b", TraceKind::RecallBegin, HashMap::new());
        collector.record("trace-c", TraceKind::RecallBegin, HashMap::new());
        assert!(collector.get_by_id("trace-a").is_empty());
        assert_eq!(collector.get_by_id("trace-c").len(), 1);
    }
}
