//! Outbound notifications from the engine.
//!
//! The engine never calls into rendering or UI code directly. Structural
//! changes are queued on the graph, merge transitions are returned by the
//! detector, and the [`EventBus`] fans both out to subscribers in emission
//! order, exactly once each.

use crate::graph::{NodeId, SegmentId, WallId};
use crate::proximity::ProximityMerge;
use serde::{Deserialize, Serialize};

/// A structural change to the wall graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum TopologyEvent {
    NodeCreated(NodeId),
    NodeRemoved(NodeId),
    NodeMoved(NodeId),
    SegmentCreated(SegmentId),
    SegmentRemoved(SegmentId),
    WallCreated(WallId),
    WallUpdated(WallId),
    WallRemoved(WallId),
    /// The whole graph was replaced (undo/redo). Subscribers should re-read it.
    GraphRestored,
}

/// A proximity merge transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "merge", rename_all = "snake_case")]
pub enum MergeEvent {
    Created(ProximityMerge),
    Separated(ProximityMerge),
}

impl MergeEvent {
    /// The merge record this event refers to.
    pub fn merge(&self) -> &ProximityMerge {
        match self {
            MergeEvent::Created(merge) | MergeEvent::Separated(merge) => merge,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, MergeEvent::Created(_))
    }
}

/// Any event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineEvent {
    Topology(TopologyEvent),
    Merge(MergeEvent),
}

impl From<TopologyEvent> for EngineEvent {
    fn from(event: TopologyEvent) -> Self {
        EngineEvent::Topology(event)
    }
}

impl From<MergeEvent> for EngineEvent {
    fn from(event: MergeEvent) -> Self {
        EngineEvent::Merge(event)
    }
}

/// Receives engine events synchronously.
pub trait EventListener {
    fn on_event(&mut self, event: &EngineEvent);
}

impl<F> EventListener for F
where
    F: FnMut(&EngineEvent),
{
    fn on_event(&mut self, event: &EngineEvent) {
        self(event)
    }
}

/// Delivers events to listeners and keeps an outbox for polling hosts.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn EventListener>>,
    outbox: Vec<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It only sees events published after this call.
    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver `events` in order to every listener, then queue them in the
    /// outbox.
    pub fn publish<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = EngineEvent>,
    {
        for event in events {
            for listener in &mut self.listeners {
                listener.on_event(&event);
            }
            self.outbox.push(event);
        }
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("outbox", &self.outbox)
            .finish()
    }
}
