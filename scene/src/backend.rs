//! The contract between the scene graph and a rendering backend.
//!
//! Backends differ in when they want State attribute values. Some keep a state
//! object per node and want every change pushed as soon as an attribute is attached,
//! detached or modified; others take the fully resolved state with each draw of a
//! traversal. [`RenderSink::strategy`] picks one, and either way the value visible
//! at draw time is the same.

use std::cell::RefCell;
use std::rc::Rc;

use cgmath::Matrix4;

use crate::attribute::StateKind;
use crate::graphics_state::ResolvedState;
use crate::node::{NodeId, NodeStateSlot};

/// When a sink wants State attribute values delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushStrategy {
    /// Per-node state sets, updated at attach, detach and modify time
    Attach,
    /// Resolved state per draw only
    #[default]
    Traversal,
}

/// One geometry node drawn during a render traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub node: NodeId,
    pub world_transform: Matrix4<f32>,
    pub state: ResolvedState,
    /// Depth offset accumulated from decal attributes above the node
    pub decal_offset: f32,
}

pub trait RenderSink {
    fn strategy(&self) -> PushStrategy;

    /// A node's state set changed. Only called for [`PushStrategy::Attach`] sinks.
    fn node_state_changed(&mut self, _node: NodeId, _kind: StateKind, _slot: &NodeStateSlot) {}

    fn draw(&mut self, call: &DrawCall);
}

/// Discards everything. The default sink of a new scene.
#[derive(Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn strategy(&self) -> PushStrategy {
        PushStrategy::Traversal
    }

    fn draw(&mut self, _call: &DrawCall) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    StateChanged {
        node: NodeId,
        kind: StateKind,
        slot: NodeStateSlot,
    },
    Draw(DrawCall),
}

/// Event log shared between a [`RecordingSink`] and whoever inspects it.
pub type SinkLog = Rc<RefCell<Vec<SinkEvent>>>;

/// Records every call it receives, for tests and diagnostics.
#[derive(Debug)]
pub struct RecordingSink {
    strategy: PushStrategy,
    log: SinkLog,
}

impl RecordingSink {
    pub fn new(strategy: PushStrategy) -> Self {
        Self {
            strategy,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A handle to the event log that stays valid after the sink is boxed.
    pub fn log(&self) -> SinkLog {
        self.log.clone()
    }
}

impl RenderSink for RecordingSink {
    fn strategy(&self) -> PushStrategy {
        self.strategy
    }

    fn node_state_changed(&mut self, node: NodeId, kind: StateKind, slot: &NodeStateSlot) {
        self.log.borrow_mut().push(SinkEvent::StateChanged {
            node,
            kind,
            slot: *slot,
        });
    }

    fn draw(&mut self, call: &DrawCall) {
        self.log.borrow_mut().push(SinkEvent::Draw(call.clone()));
    }
}

/// The draw calls in a recorded log, in order.
pub fn recorded_draws(log: &SinkLog) -> Vec<DrawCall> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            SinkEvent::Draw(call) => Some(call.clone()),
            SinkEvent::StateChanged { .. } => None,
        })
        .collect()
}
