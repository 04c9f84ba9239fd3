use core::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, TronError};
use crate::node::NodeKey;
use crate::scheduler::{PendingPulse, Scheduler};

/// Handle of a root inside a [`Field`](crate::field::Field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RootKey(pub(crate) usize);

impl RootKey {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An entity a root can attach to.
///
/// Only [`Field::connect`](crate::field::Field::connect) calls the attach
/// methods; each new root is attached exactly once on each end.
pub trait Connectable {
    fn unit_id(&self) -> Uuid;
    fn attach_outgoing(&mut self, root: RootKey);
    fn attach_incoming(&mut self, root: RootKey);
}

/// An entity that accepts delivered signals.
pub trait PulseSink {
    fn receive_pulse(&mut self, signal: f64);
}

/// `(signal, weight) -> adjusted`
pub type TransmissionRule = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// `(weight, signal) -> new_weight`
pub type PlasticityRule = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// Hebbian-style drift: `w + rate * x`.
pub fn hebbian(rate: f64) -> PlasticityRule {
    Arc::new(move |w, x| w + rate * x)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogicKind {
    #[default]
    Excitatory,
    Inhibitory,
    Symbolic,
    Other(String),
}

impl LogicKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "excitatory" => LogicKind::Excitatory,
            "inhibitory" => LogicKind::Inhibitory,
            "symbolic" => LogicKind::Symbolic,
            _ => LogicKind::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LogicKind::Excitatory => "excitatory",
            LogicKind::Inhibitory => "inhibitory",
            LogicKind::Symbolic => "symbolic",
            LogicKind::Other(s) => s,
        }
    }
}

impl Serialize for LogicKind {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl fmt::Display for LogicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct RootConfig {
    pub weight: f64,
    /// Ticks between transmission and delivery. 0 delivers immediately.
    pub delay: u32,
    pub logic: LogicKind,
    pub enabled: bool,
    pub label: Option<String>,
    pub symbolic_tag: Option<String>,
    pub origin: String,
    pub owner: String,
    pub transmission: Option<TransmissionRule>,
    pub plasticity: Option<PlasticityRule>,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            weight: 1.0,
            delay: 0,
            logic: LogicKind::Excitatory,
            enabled: true,
            label: None,
            symbolic_tag: None,
            origin: "system".to_string(),
            owner: "system".to_string(),
            transmission: None,
            plasticity: None,
        }
    }
}

impl fmt::Debug for RootConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootConfig")
            .field("weight", &self.weight)
            .field("delay", &self.delay)
            .field("logic", &self.logic)
            .field("enabled", &self.enabled)
            .field("label", &self.label)
            .field("symbolic_tag", &self.symbolic_tag)
            .field("transmission", &self.transmission.is_some())
            .field("plasticity", &self.plasticity.is_some())
            .finish_non_exhaustive()
    }
}

impl RootConfig {
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_logic(mut self, logic: LogicKind) -> Self {
        self.logic = logic;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_symbolic_tag(mut self, tag: impl Into<String>) -> Self {
        self.symbolic_tag = Some(tag.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_transmission(
        mut self,
        rule: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.transmission = Some(Arc::new(rule));
        self
    }

    pub fn with_plasticity(mut self, rule: PlasticityRule) -> Self {
        self.plasticity = Some(rule);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.weight.is_finite() {
            return Err(TronError::InvalidConfig("weight must be finite"));
        }
        Ok(())
    }
}

/// One entry of a root's own audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub timestamp: DateTime<Utc>,
    pub tick: u64,
    pub source: Uuid,
    pub target: Uuid,
    pub original: f64,
    pub adjusted: f64,
    /// Weight at transmission time, before any drift.
    pub weight: f64,
    pub symbolic_tag: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transmission {
    /// The root is disabled; nothing was logged, delivered or adapted.
    Disabled,
    Delivered { adjusted: f64 },
    Scheduled { adjusted: f64, due: u64 },
}

impl Transmission {
    pub fn adjusted(&self) -> Option<f64> {
        match *self {
            Transmission::Disabled => None,
            Transmission::Delivered { adjusted } | Transmission::Scheduled { adjusted, .. } => {
                Some(adjusted)
            }
        }
    }
}

/// Read-only snapshot of a root.
#[derive(Debug, Clone, Serialize)]
pub struct RootObservation {
    pub id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
    pub weight: f64,
    pub enabled: bool,
    pub delay: u32,
    pub logic: LogicKind,
    pub label: Option<String>,
    pub symbolic_tag: Option<String>,
    pub origin: String,
    pub owner: String,
    pub transmissions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_log: Option<Vec<ActivityRecord>>,
}

/// Directed, weighted link between two nodes of a field.
pub struct Root {
    id: Uuid,
    key: RootKey,
    source: NodeKey,
    target: NodeKey,
    source_id: Uuid,
    target_id: Uuid,

    weight: f64,
    delay: u32,
    logic: LogicKind,
    enabled: bool,

    label: Option<String>,
    symbolic_tag: Option<String>,
    origin: String,
    owner: String,

    transmission: Option<TransmissionRule>,
    plasticity: Option<PlasticityRule>,

    log: Vec<ActivityRecord>,
}

impl Root {
    pub(crate) fn new(
        key: RootKey,
        source: (NodeKey, Uuid),
        target: (NodeKey, Uuid),
        config: RootConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            source: source.0,
            target: target.0,
            source_id: source.1,
            target_id: target.1,
            weight: config.weight,
            delay: config.delay,
            logic: config.logic,
            enabled: config.enabled,
            label: config.label,
            symbolic_tag: config.symbolic_tag,
            origin: config.origin,
            owner: config.owner,
            transmission: config.transmission,
            plasticity: config.plasticity,
            log: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> RootKey {
        self.key
    }

    pub fn source(&self) -> NodeKey {
        self.source
    }

    pub fn target(&self) -> NodeKey {
        self.target
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn delay(&self) -> u32 {
        self.delay
    }

    pub fn logic(&self) -> &LogicKind {
        &self.logic
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn symbolic_tag(&self) -> Option<&str> {
        self.symbolic_tag.as_deref()
    }

    pub fn activity_log(&self) -> &[ActivityRecord] {
        &self.log
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn set_plasticity_rule(&mut self, rule: PlasticityRule) {
        self.plasticity = Some(rule);
    }

    pub fn clear_plasticity_rule(&mut self) {
        self.plasticity = None;
    }

    pub fn set_transmission_rule(
        &mut self,
        rule: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
    ) {
        self.transmission = Some(Arc::new(rule));
    }

    /// Scale a signal by the current weight (or the configured rule).
    pub fn adjust(&self, signal: f64) -> f64 {
        match &self.transmission {
            Some(rule) => rule(signal, self.weight),
            None => signal * self.weight,
        }
    }

    /// Send `signal` to `target`.
    ///
    /// `target` must be the node this root points at. With `delay == 0` the
    /// adjusted value is delivered now; otherwise it is queued for
    /// `tick + delay`. The plasticity rule runs after delivery on every
    /// enabled transmission, independent of whether the target fires.
    pub fn transmit<T>(
        &mut self,
        signal: f64,
        target: &mut T,
        tick: u64,
        scheduler: &mut Scheduler,
    ) -> Transmission
    where
        T: PulseSink + ?Sized,
    {
        if !self.enabled {
            return Transmission::Disabled;
        }

        let adjusted = self.adjust(signal);
        self.log.push(ActivityRecord {
            timestamp: Utc::now(),
            tick,
            source: self.source_id,
            target: self.target_id,
            original: signal,
            adjusted,
            weight: self.weight,
            symbolic_tag: self.symbolic_tag.clone(),
            label: self.label.clone(),
        });

        let outcome = if self.delay == 0 {
            target.receive_pulse(adjusted);
            Transmission::Delivered { adjusted }
        } else {
            let due = tick.saturating_add(u64::from(self.delay));
            scheduler.schedule(PendingPulse {
                due,
                root: self.key,
                target: self.target,
                value: adjusted,
            });
            Transmission::Scheduled { adjusted, due }
        };

        if let Some(rule) = &self.plasticity {
            self.weight = rule(self.weight, signal);
        }

        debug!(root = %self.id, signal, adjusted, weight = self.weight, "transmit");
        outcome
    }

    pub fn observe(&self, include_log: bool) -> RootObservation {
        RootObservation {
            id: self.id,
            source: self.source_id,
            target: self.target_id,
            weight: self.weight,
            enabled: self.enabled,
            delay: self.delay,
            logic: self.logic.clone(),
            label: self.label.clone(),
            symbolic_tag: self.symbolic_tag.clone(),
            origin: self.origin.clone(),
            owner: self.owner.clone(),
            transmissions: self.log.len(),
            activity_log: include_log.then(|| self.log.clone()),
        }
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("weight", &self.weight)
            .field("delay", &self.delay)
            .field("logic", &self.logic)
            .field("enabled", &self.enabled)
            .field("log", &self.log.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = |id: &Uuid| id.simple().to_string()[..8].to_string();
        write!(f, "<Root {} | {}", short(&self.id), self.logic.as_str().to_uppercase())?;
        if let Some(tag) = &self.symbolic_tag {
            write!(f, " [{tag}]")?;
        }
        if let Some(label) = &self.label {
            write!(f, " {label}")?;
        }
        write!(
            f,
            " | W: {} | {} → {}>",
            self.weight,
            &short(&self.source_id)[..6],
            &short(&self.target_id)[..6]
        )
    }
}
