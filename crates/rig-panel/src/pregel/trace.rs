//! Run trace
//!
//! Timestamped scheduling events recorded by the runtime. Used to inspect
//! ordering after a run (e.g. that a join was invoked only after every
//! predecessor committed).

use serde::Serialize;
use std::time::{Duration, Instant};

use super::vertex::VertexId;
use crate::error::ErrorKind;

/// What happened to a vertex
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// Admitted to the frontier
    Scheduled,
    /// A join predecessor arrived but others are still missing
    BlockedOnJoin { waiting_for: Vec<VertexId> },
    /// Computation started
    Invoked,
    /// Update committed with the given sequence number
    Committed { commit: u64 },
    /// Computation failed
    Failed { kind: ErrorKind },
}

/// One trace entry
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub vertex: VertexId,
    #[serde(flatten)]
    pub kind: TraceEventKind,
    /// Time since the run started
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    #[serde(skip)]
    pub at: Instant,
}

/// Ordered list of trace events for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunTrace {
    #[serde(skip)]
    started: Instant,
    #[serde(skip)]
    enabled: bool,
    events: Vec<TraceEvent>,
}

impl Default for RunTrace {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RunTrace {
    pub fn new(enabled: bool) -> Self {
        Self {
            started: Instant::now(),
            enabled,
            events: Vec::new(),
        }
    }

    /// Record an event happening now
    pub fn record(&mut self, vertex: &VertexId, kind: TraceEventKind) {
        self.record_at(vertex, kind, Instant::now());
    }

    /// Record an event observed at `at`
    pub fn record_at(&mut self, vertex: &VertexId, kind: TraceEventKind, at: Instant) {
        if !self.enabled {
            return;
        }
        self.events.push(TraceEvent {
            vertex: vertex.clone(),
            kind,
            elapsed: at.saturating_duration_since(self.started),
            at,
        });
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events of one vertex, in recording order
    pub fn events_for<'a>(&'a self, vertex: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |e| e.vertex.as_str() == vertex)
    }

    /// Invocation timestamps of a vertex
    pub fn invocations(&self, vertex: &str) -> Vec<Instant> {
        self.events_for(vertex)
            .filter(|e| e.kind == TraceEventKind::Invoked)
            .map(|e| e.at)
            .collect()
    }

    /// Commit timestamps of a vertex
    pub fn commits(&self, vertex: &str) -> Vec<Instant> {
        self.events_for(vertex)
            .filter(|e| matches!(e.kind, TraceEventKind::Committed { .. }))
            .map(|e| e.at)
            .collect()
    }

    /// Commit sequence numbers of a vertex
    pub fn commit_sequence(&self, vertex: &str) -> Vec<u64> {
        self.events_for(vertex)
            .filter_map(|e| match e.kind {
                TraceEventKind::Committed { commit } => Some(commit),
                _ => None,
            })
            .collect()
    }

    /// Check if a vertex was ever invoked
    pub fn was_invoked(&self, vertex: &str) -> bool {
        !self.invocations(vertex).is_empty()
    }
}
