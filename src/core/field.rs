use serde::Serialize;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{Result, TronError};
use crate::node::{Node, NodeConfig, NodeKey};
use crate::registry::Registry;
use crate::root::{Connectable, Root, RootConfig, RootKey, Transmission};
use crate::scheduler::{PendingPulse, Scheduler};
use crate::state::NodeState;

/// Outcome of one [`Field::step`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepReport {
    pub tick: u64,
    /// `(node, emitted value)` in key order.
    pub fired: Vec<(NodeKey, f64)>,
    /// Enabled transmissions sent by the nodes that fired.
    pub transmissions: usize,
    /// Delayed pulses that landed at the end of this tick.
    pub delivered: usize,
}

/// Owns nodes and roots and runs the propagation protocol.
///
/// Driving contract:
/// - [`transmit`](Self::transmit) only delivers into the target's activity; it
///   never fires anything.
/// - [`step`](Self::step) advances one tick: every node whose predicate holds
///   (evaluated before any of this tick's arrivals) fires, the emitted values
///   are transmitted along outgoing roots, then queued pulses due on this tick
///   land. Arrivals are evaluated on the next step.
///
/// Propagation therefore advances one hop per tick and a cyclic graph cannot
/// recurse.
#[derive(Debug, Default)]
pub struct Field {
    nodes: Vec<Node>,
    roots: Vec<Root>,
    registry: Option<Registry>,
    scheduler: Scheduler,
    tick: u64,
}

impl Field {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry: Some(registry),
            ..Self::default()
        }
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    /// Hand the registry back, e.g. to close it.
    pub fn into_registry(self) -> Option<Registry> {
        self.registry
    }

    /// Flush and close the registry, if any.
    pub fn close(self) -> Result<()> {
        match self.registry {
            Some(registry) => registry.close(),
            None => Ok(()),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn add_node(&mut self, config: NodeConfig) -> Result<NodeKey> {
        rejected(config.validate(), "node")?;
        Ok(self.insert_node(Node::new(config)))
    }

    /// Add a node anchored to `label` in this field's registry.
    pub fn add_bound_node(&mut self, label: &str, config: NodeConfig) -> Result<NodeKey> {
        rejected(config.validate(), "node")?;
        let registry = self
            .registry
            .as_mut()
            .ok_or_else(|| TronError::RegistryRequired(label.to_string()))?;
        let node = Node::bound(label, config, registry)?;
        Ok(self.insert_node(node))
    }

    /// Adopt a node built elsewhere (for example bound to an external registry).
    ///
    /// Freshly constructed nodes carry no adjacency, so the field's
    /// bookkeeping stays consistent.
    pub fn insert_node(&mut self, node: Node) -> NodeKey {
        let key = NodeKey(self.nodes.len());
        self.nodes.push(node);
        key
    }

    /// Create a root from `source` to `target` and attach it to both ends.
    pub fn connect(
        &mut self,
        source: NodeKey,
        target: NodeKey,
        config: RootConfig,
    ) -> Result<RootKey> {
        rejected(config.validate(), "root")?;
        self.check_node(source)?;
        self.check_node(target)?;

        let key = RootKey(self.roots.len());
        let source_id = self.nodes[source.0].unit_id();
        let target_id = self.nodes[target.0].unit_id();

        if source == target {
            let node = &mut self.nodes[source.0];
            node.attach_outgoing(key);
            node.attach_incoming(key);
        } else {
            let (src, dst) = pair_mut(&mut self.nodes, source.0, target.0);
            wire(src, dst, key);
        }

        self.roots
            .push(Root::new(key, (source, source_id), (target, target_id), config));
        debug!(root = key.0, source = source.0, target = target.0, "connected");
        Ok(key)
    }

    pub fn transmit(&mut self, root: RootKey, signal: f64) -> Result<Transmission> {
        let r = self
            .roots
            .get_mut(root.0)
            .ok_or(TronError::UnknownRoot(root.0))?;
        let target = &mut self.nodes[r.target().0];
        Ok(r.transmit(signal, target, self.tick, &mut self.scheduler))
    }

    /// Deliver `signal` straight into a node, as an external stimulus.
    pub fn inject(&mut self, key: NodeKey, signal: f64) -> Result<()> {
        self.node_mut(key)?.receive_pulse(signal);
        Ok(())
    }

    /// Mutate a node's state, mirroring into the registry when it is bound.
    pub fn mutate<F>(&mut self, key: NodeKey, transform: F) -> Result<&NodeState>
    where
        F: FnOnce(&NodeState) -> NodeState,
    {
        let node = self
            .nodes
            .get_mut(key.0)
            .ok_or(TronError::UnknownNode(key.0))?;
        node.mutate(self.registry.as_mut(), transform)
    }

    /// Tag a node, mirroring into the registry when it is bound.
    pub fn add_tag(&mut self, key: NodeKey, tag: &str) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(key.0)
            .ok_or(TronError::UnknownNode(key.0))?;
        node.add_tag(self.registry.as_mut(), tag)
    }

    pub fn step(&mut self) -> StepReport {
        self.tick = self.tick.saturating_add(1);
        let tick = self.tick;

        let mut fired = Vec::new();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if let Some(value) = node.emit_pulse() {
                fired.push((NodeKey(i), value));
            }
        }

        let mut transmissions = 0;
        for &(key, value) in &fired {
            for &rk in self.nodes[key.0].outgoing().to_vec().iter() {
                let root = &mut self.roots[rk.0];
                let target = &mut self.nodes[root.target().0];
                if root.transmit(value, target, tick, &mut self.scheduler) != Transmission::Disabled {
                    transmissions += 1;
                }
            }
        }

        let due = self.scheduler.drain_due(tick);
        for pulse in &due {
            self.nodes[pulse.target.0].receive_pulse(pulse.value);
        }

        trace!(tick, fired = fired.len(), transmissions, delivered = due.len(), "step");
        StepReport {
            tick,
            fired,
            transmissions,
            delivered: due.len(),
        }
    }

    pub fn run(&mut self, ticks: u64) -> Vec<StepReport> {
        (0..ticks).map(|_| self.step()).collect()
    }

    /// Queued deliveries, in delivery order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingPulse> + '_ {
        self.scheduler.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.scheduler.len()
    }

    pub fn node(&self, key: NodeKey) -> Result<&Node> {
        self.nodes.get(key.0).ok_or(TronError::UnknownNode(key.0))
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node> {
        self.nodes.get_mut(key.0).ok_or(TronError::UnknownNode(key.0))
    }

    pub fn root(&self, key: RootKey) -> Result<&Root> {
        self.roots.get(key.0).ok_or(TronError::UnknownRoot(key.0))
    }

    pub fn root_mut(&mut self, key: RootKey) -> Result<&mut Root> {
        self.roots.get_mut(key.0).ok_or(TronError::UnknownRoot(key.0))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeKey(i), n))
    }

    pub fn roots(&self) -> impl Iterator<Item = (RootKey, &Root)> + '_ {
        self.roots.iter().enumerate().map(|(i, r)| (RootKey(i), r))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn find_by_label(&self, label: &str) -> Option<NodeKey> {
        self.nodes
            .iter()
            .position(|n| n.label() == Some(label))
            .map(NodeKey)
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<NodeKey> {
        self.nodes.iter().position(|n| n.id() == id).map(NodeKey)
    }

    fn check_node(&self, key: NodeKey) -> Result<()> {
        if key.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(TronError::UnknownNode(key.0))
        }
    }
}

fn rejected(outcome: Result<()>, what: &'static str) -> Result<()> {
    if let Err(e) = &outcome {
        warn!(what, error = %e, "config rejected");
    }
    outcome
}

fn wire<S, T>(source: &mut S, target: &mut T, key: RootKey)
where
    S: Connectable + ?Sized,
    T: Connectable + ?Sized,
{
    source.attach_outgoing(key);
    target.attach_incoming(key);
}

/// Two distinct mutable elements of a slice.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = items.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}
