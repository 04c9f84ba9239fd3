use core::fmt;
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, TronError};
use crate::registry::Registry;
use crate::root::{Connectable, PulseSink, RootKey};
use crate::state::{NodeState, Provenance};

/// Handle of a node inside a [`Field`](crate::field::Field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(pub(crate) usize);

impl NodeKey {
    pub fn index(self) -> usize {
        self.0
    }
}

/// `(current_activity, signal) -> new_activity`
pub type Combinator = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// `activity -> fires?`
pub type FiringPredicate = Arc<dyn Fn(f64) -> bool + Send + Sync>;

/// How an incoming signal combines with the current activity.
#[derive(Clone, Default)]
pub enum AccumulationMode {
    #[default]
    Accumulate,
    Overwrite,
    Custom(Combinator),
}

impl AccumulationMode {
    pub fn custom(f: impl Fn(f64, f64) -> f64 + Send + Sync + 'static) -> Self {
        AccumulationMode::Custom(Arc::new(f))
    }

    /// Parse a textual mode. Only `accumulate` and `overwrite` have names.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "accumulate" => Ok(AccumulationMode::Accumulate),
            "overwrite" => Ok(AccumulationMode::Overwrite),
            _ => Err(TronError::InvalidMode(tag.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            AccumulationMode::Accumulate => "accumulate",
            AccumulationMode::Overwrite => "overwrite",
            AccumulationMode::Custom(_) => "custom",
        }
    }

    #[inline]
    pub fn combine(&self, current: f64, signal: f64) -> f64 {
        match self {
            AccumulationMode::Accumulate => current + signal,
            AccumulationMode::Overwrite => signal,
            AccumulationMode::Custom(f) => f(current, signal),
        }
    }
}

impl fmt::Debug for AccumulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Overflow policy for activity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ActivityBound {
    /// Plain f64; Accumulate can grow without limit (up to ±inf).
    #[default]
    Unbounded,
    /// Clamp to `[-limit, limit]` after every pulse.
    Saturating(f64),
}

impl ActivityBound {
    #[inline]
    pub fn apply(self, activity: f64) -> f64 {
        match self {
            ActivityBound::Unbounded => activity,
            ActivityBound::Saturating(limit) => activity.clamp(-limit, limit),
        }
    }
}

/// Which state a label-bound node starts from when its record already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rehydration {
    /// Use the state passed in the config, ignoring the persisted one.
    #[default]
    Constructor,
    /// Use the record's persisted state unless it is unset.
    Resume,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub state: NodeState,
    pub threshold: f64,
    pub mode: AccumulationMode,
    pub bound: ActivityBound,
    pub provenance: Provenance,
    pub rehydration: Rehydration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            state: NodeState::Unset,
            threshold: 1.0,
            mode: AccumulationMode::Accumulate,
            bound: ActivityBound::Unbounded,
            provenance: Provenance::node_default(),
            rehydration: Rehydration::Constructor,
        }
    }
}

impl NodeConfig {
    pub fn with_state(mut self, state: impl Into<NodeState>) -> Self {
        self.state = state.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_mode(mut self, mode: AccumulationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_bound(mut self, bound: ActivityBound) -> Self {
        self.bound = bound;
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.provenance.owner = owner.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.provenance.kind = kind.into();
        self
    }

    pub fn with_rehydration(mut self, rehydration: Rehydration) -> Self {
        self.rehydration = rehydration;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(TronError::InvalidConfig("threshold must be finite"));
        }
        if let ActivityBound::Saturating(limit) = self.bound {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(TronError::InvalidConfig(
                    "saturation limit must be finite and > 0",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEvent {
    /// A signal arrived; `value` is the raw signal.
    Pulse,
    /// The node fired; `value` is the emitted pulse.
    Fire,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub time: DateTime<Utc>,
    pub event: TraceEvent,
    pub value: f64,
}

impl TraceEntry {
    fn now(event: TraceEvent, value: f64) -> Self {
        Self {
            time: Utc::now(),
            event,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Connections {
    pub incoming: usize,
    pub outgoing: usize,
}

/// Read-only snapshot of a node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeObservation {
    pub id: Uuid,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub state: NodeState,
    pub activity: f64,
    pub threshold: f64,
    pub mode: &'static str,
    pub origin: String,
    pub reason: String,
    pub owner: String,
    pub kind: String,
    pub tags: Vec<String>,
    pub connections: Connections,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
}

/// Activation unit.
///
/// Idle until the firing predicate holds on `activity`; [`emit_pulse`](Self::emit_pulse)
/// then yields a value derived from the state and resets activity to zero.
/// Activity is never reset on any other path.
pub struct Node {
    id: Uuid,
    label: Option<String>,
    created_at: DateTime<Utc>,

    state: NodeState,
    activity: f64,
    threshold: f64,
    predicate: Option<FiringPredicate>,
    mode: AccumulationMode,
    bound: ActivityBound,

    provenance: Provenance,
    tags: BTreeSet<String>,

    // Back-references; the owning field holds the roots.
    incoming: Vec<RootKey>,
    outgoing: Vec<RootKey>,

    trace: Vec<TraceEntry>,
    state_history: Vec<NodeState>,
}

impl Node {
    /// Anonymous node: random id, nothing persisted.
    pub fn new(config: NodeConfig) -> Self {
        let NodeConfig {
            state,
            threshold,
            mode,
            bound,
            provenance,
            rehydration: _,
        } = config;
        Self {
            id: Uuid::new_v4(),
            label: None,
            created_at: Utc::now(),
            state,
            activity: 0.0,
            threshold,
            predicate: None,
            mode,
            bound,
            provenance,
            tags: BTreeSet::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            trace: Vec::new(),
            state_history: Vec::new(),
        }
    }

    /// Node anchored to `label`; registers the label if it is new.
    ///
    /// Identity, provenance and tags come from the record. The starting state
    /// follows `config.rehydration`.
    pub fn bound(label: &str, config: NodeConfig, registry: &mut Registry) -> Result<Self> {
        let record = registry.register(label, config.state.clone(), &config.provenance)?;
        let id = record.id;
        let provenance = record.provenance();
        let tags = record.tags.clone();
        let persisted = match config.rehydration {
            Rehydration::Resume if !record.state.is_unset() => Some(record.state.clone()),
            _ => None,
        };

        let mut node = Node::new(config);
        node.id = id;
        node.label = Some(label.to_string());
        node.provenance = provenance;
        node.tags = tags;
        if let Some(state) = persisted {
            node.state = state;
        }
        Ok(node)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn activity(&self) -> f64 {
        self.activity
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn mode(&self) -> &AccumulationMode {
        &self.mode
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn incoming(&self) -> &[RootKey] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[RootKey] {
        &self.outgoing
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn state_history(&self) -> &[NodeState] {
        &self.state_history
    }

    /// Add a tag; `Ok(false)` when it was already present.
    ///
    /// Like [`mutate`](Self::mutate), a label-bound node writes the tag to
    /// `registry` first and needs one.
    pub fn add_tag(&mut self, registry: Option<&mut Registry>, tag: &str) -> Result<bool> {
        if self.tags.contains(tag) {
            return Ok(false);
        }
        if let Some(label) = &self.label {
            let Some(registry) = registry else {
                return Err(TronError::RegistryRequired(label.clone()));
            };
            registry.add_tag(label, tag)?;
        }
        Ok(self.tags.insert(tag.to_string()))
    }

    /// Replace the default `activity >= threshold` predicate.
    pub fn set_firing_predicate(&mut self, f: impl Fn(f64) -> bool + Send + Sync + 'static) {
        self.predicate = Some(Arc::new(f));
    }

    pub fn clear_firing_predicate(&mut self) {
        self.predicate = None;
    }

    pub fn receive_pulse(&mut self, signal: f64) {
        let next = self.mode.combine(self.activity, signal);
        self.activity = self.bound.apply(next);
        self.trace.push(TraceEntry::now(TraceEvent::Pulse, signal));
    }

    pub fn should_fire(&self) -> bool {
        match &self.predicate {
            Some(f) => f(self.activity),
            None => self.activity >= self.threshold,
        }
    }

    /// The value this node would emit, without firing.
    pub fn pulse_value(&self) -> f64 {
        self.state.pulse_value()
    }

    pub fn emit_pulse(&mut self) -> Option<f64> {
        if !self.should_fire() {
            return None;
        }
        let value = self.pulse_value();
        debug!(node = %self.short_name(), activity = self.activity, value, "fire");
        self.activity = 0.0;
        self.trace.push(TraceEntry::now(TraceEvent::Fire, value));
        Some(value)
    }

    /// Replace the state with `transform(state)` and record it.
    ///
    /// A label-bound node pushes the new state to `registry` first; if that
    /// fails the node is left unchanged. Passing `None` for a bound node is
    /// an error.
    pub fn mutate<F>(&mut self, registry: Option<&mut Registry>, transform: F) -> Result<&NodeState>
    where
        F: FnOnce(&NodeState) -> NodeState,
    {
        if let Some(label) = &self.label {
            let Some(registry) = registry else {
                return Err(TronError::RegistryRequired(label.clone()));
            };
            let next = transform(&self.state);
            registry.update_state(label, next.clone())?;
            self.commit_state(next);
        } else {
            let next = transform(&self.state);
            self.commit_state(next);
        }
        Ok(&self.state)
    }

    fn commit_state(&mut self, next: NodeState) {
        self.state_history.push(next.clone());
        self.state = next;
    }

    pub fn observe(&self, include_trace: bool) -> NodeObservation {
        NodeObservation {
            id: self.id,
            label: self.label.clone(),
            created_at: self.created_at,
            state: self.state.clone(),
            activity: self.activity,
            threshold: self.threshold,
            mode: self.mode.tag(),
            origin: self.provenance.origin.clone(),
            reason: self.provenance.reason.clone(),
            owner: self.provenance.owner.clone(),
            kind: self.provenance.kind.clone(),
            tags: self.tags.iter().cloned().collect(),
            connections: Connections {
                incoming: self.incoming.len(),
                outgoing: self.outgoing.len(),
            },
            trace: include_trace.then(|| self.trace.clone()),
        }
    }

    fn short_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.id.simple().to_string()[..8].to_string(),
        }
    }
}

impl Connectable for Node {
    fn unit_id(&self) -> Uuid {
        self.id
    }

    fn attach_outgoing(&mut self, root: RootKey) {
        self.outgoing.push(root);
    }

    fn attach_incoming(&mut self, root: RootKey) {
        self.incoming.push(root);
    }
}

impl PulseSink for Node {
    fn receive_pulse(&mut self, signal: f64) {
        Node::receive_pulse(self, signal);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.state)
            .field("activity", &self.activity)
            .field("threshold", &self.threshold)
            .field("mode", &self.mode)
            .field("incoming", &self.incoming.len())
            .field("outgoing", &self.outgoing.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Node {} | {} | {}>",
            self.short_name(),
            self.provenance.kind,
            self.state.kind_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn registry_in(dir: &tempfile::TempDir) -> Registry {
        Registry::open_at(dir.path().join("registry.json")).unwrap()
    }

    #[test]
    fn accumulate_reaches_threshold_then_resets_on_fire() {
        let mut node = Node::new(NodeConfig::default().with_state(0.5).with_threshold(2.0));
        node.receive_pulse(1.0);
        assert!(!node.should_fire());
        node.receive_pulse(1.5);
        assert_eq!(node.activity(), 2.5);
        assert!(node.should_fire());

        assert_eq!(node.emit_pulse(), Some(0.5));
        assert_eq!(node.activity(), 0.0);
        assert!(!node.should_fire());
    }

    #[test]
    fn emit_without_firing_leaves_activity() {
        let mut node = Node::new(NodeConfig::default().with_threshold(2.0));
        node.receive_pulse(1.25);
        assert_eq!(node.emit_pulse(), None);
        assert_eq!(node.activity(), 1.25);
    }

    #[test]
    fn overwrite_keeps_last_signal() {
        let mut node = Node::new(NodeConfig::default().with_mode(AccumulationMode::Overwrite));
        node.receive_pulse(1.0);
        node.receive_pulse(3.0);
        assert_eq!(node.activity(), 3.0);
    }

    #[test]
    fn custom_combinator_sees_current_and_signal() {
        let mode = AccumulationMode::custom(|current, signal| current.max(signal) * 0.5);
        let mut node = Node::new(NodeConfig::default().with_mode(mode));
        node.receive_pulse(4.0);
        assert_eq!(node.activity(), 2.0);
        node.receive_pulse(1.0);
        assert_eq!(node.activity(), 1.0);
    }

    #[test]
    fn mode_tags_parse_or_reject() {
        assert!(matches!(
            AccumulationMode::from_tag("Overwrite"),
            Ok(AccumulationMode::Overwrite)
        ));
        assert!(matches!(
            AccumulationMode::from_tag("accumulate"),
            Ok(AccumulationMode::Accumulate)
        ));
        assert!(matches!(
            AccumulationMode::from_tag("sum"),
            Err(TronError::InvalidMode(ref t)) if t == "sum"
        ));
    }

    #[test]
    fn saturating_bound_clamps_without_reset() {
        let mut node = Node::new(
            NodeConfig::default()
                .with_threshold(100.0)
                .with_bound(ActivityBound::Saturating(3.0)),
        );
        for _ in 0..10 {
            node.receive_pulse(1.0);
        }
        assert_eq!(node.activity(), 3.0);
        node.receive_pulse(-10.0);
        assert_eq!(node.activity(), -3.0);

        let bad = NodeConfig::default().with_bound(ActivityBound::Saturating(0.0));
        assert!(matches!(bad.validate(), Err(TronError::InvalidConfig(_))));
    }

    #[test]
    fn custom_predicate_replaces_threshold() {
        let mut node = Node::new(NodeConfig::default().with_threshold(10.0));
        node.set_firing_predicate(|a| a < 0.0);
        node.receive_pulse(-0.1);
        assert!(node.should_fire());
        assert_eq!(node.emit_pulse(), Some(1.0));
        node.clear_firing_predicate();
        node.receive_pulse(-0.1);
        assert!(!node.should_fire());
    }

    #[test]
    fn trace_records_pulses_and_fires() {
        let mut node = Node::new(NodeConfig::default().with_state(vec![2.0, 4.0]));
        node.receive_pulse(0.4);
        node.receive_pulse(0.7);
        assert_eq!(node.emit_pulse(), Some(3.0));

        let events: Vec<_> = node.trace().iter().map(|e| (e.event, e.value)).collect();
        assert_eq!(
            events,
            vec![
                (TraceEvent::Pulse, 0.4),
                (TraceEvent::Pulse, 0.7),
                (TraceEvent::Fire, 3.0)
            ]
        );
    }

    #[test]
    fn anonymous_ids_are_unique_and_mutate_needs_no_registry() {
        let mut a = Node::new(NodeConfig::default().with_state(1.0));
        let b = Node::new(NodeConfig::default());
        assert_ne!(a.id(), b.id());

        let state = a
            .mutate(None, |s| NodeState::Scalar(s.as_scalar().unwrap_or(0.0) + 3.0))
            .unwrap();
        assert_eq!(state, &NodeState::Scalar(4.0));
        assert_eq!(a.state_history(), &[NodeState::Scalar(4.0)]);
    }

    #[test]
    fn bound_node_copies_record_identity() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry_in(&dir);
        reg.register("seen", NodeState::Unset, &Provenance::node_default())
            .unwrap();
        reg.add_tag("seen", "vision").unwrap();

        let node = Node::bound(
            "seen",
            NodeConfig::default().with_state(0.5).with_kind("embedding"),
            &mut reg,
        )
        .unwrap();
        assert_eq!(node.id(), crate::registry::label_id("seen"));
        assert_eq!(node.label(), Some("seen"));
        // Provenance comes from the existing record, not the config.
        assert_eq!(node.provenance().kind, "general");
        assert!(node.tags().contains("vision"));
    }

    #[test]
    fn bound_mutate_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry_in(&dir);
        let mut node = Node::bound(
            "token.hi",
            NodeConfig::default().with_state(0.5).with_owner("llm-agent"),
            &mut reg,
        )
        .unwrap();

        node.mutate(Some(&mut reg), |s| {
            NodeState::Scalar(s.as_scalar().unwrap_or(0.0) + 3.0)
        })
        .unwrap();

        let reopened = registry_in(&dir);
        let rec = reopened.get_by_label("token.hi").unwrap();
        assert_eq!(rec.state, NodeState::Scalar(3.5));
        assert_eq!(
            rec.history,
            vec![NodeState::Scalar(0.5), NodeState::Scalar(3.5)]
        );
    }

    #[test]
    fn bound_mutate_without_registry_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry_in(&dir);
        let mut node =
            Node::bound("needs.store", NodeConfig::default().with_state(1.0), &mut reg).unwrap();
        let err = node.mutate(None, |_| NodeState::Scalar(2.0)).unwrap_err();
        assert!(matches!(err, TronError::RegistryRequired(_)));
        assert_eq!(node.state(), &NodeState::Scalar(1.0));
        assert!(node.state_history().is_empty());
    }

    #[test]
    fn bound_tags_reach_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut reg = registry_in(&dir);
            let mut node =
                Node::bound("tagged", NodeConfig::default().with_state(1.0), &mut reg).unwrap();
            assert!(matches!(
                node.add_tag(None, "vision"),
                Err(TronError::RegistryRequired(_))
            ));
            assert!(node.tags().is_empty());
            assert!(node.add_tag(Some(&mut reg), "vision").unwrap());
        }

        let mut reg = registry_in(&dir);
        let node = Node::bound("tagged", NodeConfig::default(), &mut reg).unwrap();
        assert!(node.tags().contains("vision"));
    }

    #[test]
    fn failed_mutate_write_leaves_node_and_record_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry_in(&dir);
        let mut node =
            Node::bound("fragile", NodeConfig::default().with_state(1.0), &mut reg).unwrap();
        let tmp = crate::store::temp_sibling(reg.path());
        std::fs::create_dir(&tmp).unwrap();

        let err = node
            .mutate(Some(&mut reg), |_| NodeState::Scalar(2.0))
            .unwrap_err();
        assert!(matches!(err, TronError::StoreIo { .. }));
        assert_eq!(node.state(), &NodeState::Scalar(1.0));
        assert!(node.state_history().is_empty());
        let rec = reg.get_by_label("fragile").unwrap();
        assert_eq!(rec.state, NodeState::Scalar(1.0));
        assert_eq!(rec.history, vec![NodeState::Scalar(1.0)]);
    }

    #[test]
    fn infinite_threshold_is_rejected() {
        let config = NodeConfig::default().with_threshold(f64::INFINITY);
        assert!(matches!(config.validate(), Err(TronError::InvalidConfig(_))));
        assert!(NodeConfig::default().with_threshold(f64::NAN).validate().is_err());
    }

    #[test]
    fn rebinding_starts_from_constructor_state_by_default() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut reg = registry_in(&dir);
            let mut node =
                Node::bound("resume.me", NodeConfig::default().with_state(1.0), &mut reg).unwrap();
            node.mutate(Some(&mut reg), |_| NodeState::Scalar(7.0))
                .unwrap();
        }

        let mut reg = registry_in(&dir);
        let node =
            Node::bound("resume.me", NodeConfig::default().with_state(1.0), &mut reg).unwrap();
        assert_eq!(node.state(), &NodeState::Scalar(1.0));
        // The registry still has the later state.
        assert_eq!(
            reg.get_by_label("resume.me").unwrap().state,
            NodeState::Scalar(7.0)
        );
    }

    #[test]
    fn rebinding_with_resume_takes_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut reg = registry_in(&dir);
            let mut node =
                Node::bound("resume.me", NodeConfig::default().with_state(1.0), &mut reg).unwrap();
            node.mutate(Some(&mut reg), |_| NodeState::Scalar(7.0))
                .unwrap();
        }

        let mut reg = registry_in(&dir);
        let node = Node::bound(
            "resume.me",
            NodeConfig::default()
                .with_state(1.0)
                .with_rehydration(Rehydration::Resume),
            &mut reg,
        )
        .unwrap();
        assert_eq!(node.state(), &NodeState::Scalar(7.0));

        // Nothing persisted yet: Resume falls back to the config state.
        let fresh = Node::bound(
            "brand.new",
            NodeConfig::default()
                .with_state(2.0)
                .with_rehydration(Rehydration::Resume),
            &mut reg,
        )
        .unwrap();
        assert_eq!(fresh.state(), &NodeState::Scalar(2.0));
    }

    #[test]
    fn observe_reports_counts_and_optional_trace() {
        let mut node = Node::new(NodeConfig::default().with_state("txt"));
        node.attach_incoming(RootKey(0));
        node.attach_outgoing(RootKey(1));
        node.attach_outgoing(RootKey(2));
        node.receive_pulse(0.2);
        assert!(node.add_tag(None, "b").unwrap());
        assert!(node.add_tag(None, "a").unwrap());
        assert!(!node.add_tag(None, "a").unwrap());

        let obs = node.observe(false);
        assert_eq!(
            obs.connections,
            Connections {
                incoming: 1,
                outgoing: 2
            }
        );
        assert_eq!(obs.tags, vec!["a".to_string(), "b".to_string()]);
        assert!(obs.trace.is_none());
        assert_eq!(node.observe(true).trace.map(|t| t.len()), Some(1));

        let json = serde_json::to_value(&obs).unwrap();
        assert!(json.get("trace").is_none());
        assert_eq!(json["mode"], "accumulate");
    }

    #[test]
    fn display_uses_label_or_short_id() {
        let node = Node::new(NodeConfig::default().with_state(0.5));
        let shown = node.to_string();
        assert!(shown.starts_with("<Node "));
        assert!(shown.ends_with("| general | scalar>"));
    }
}
