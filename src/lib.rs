//! # tron
//!
//! A small directed graph of stateful activation units ("nodes") joined by
//! weighted, adaptive links ("roots"), with a durable registry that binds
//! symbolic labels to deterministic identities and state history.
//!
//! ## Quick Start
//!
//! ```
//! use tron::prelude::*;
//!
//! let mut field = Field::new();
//! let eye = field.add_node(NodeConfig::default().with_state(0.5)).unwrap();
//! let parse = field.add_node(NodeConfig::default().with_threshold(0.5)).unwrap();
//!
//! let root = field
//!     .connect(eye, parse, RootConfig::default().with_weight(1.2).with_plasticity(hebbian(0.01)))
//!     .unwrap();
//!
//! let pulse = field.node(eye).unwrap().pulse_value();
//! field.transmit(root, pulse).unwrap();
//! assert!(field.node(parse).unwrap().should_fire());
//!
//! // Firing and onward propagation happen one hop per tick.
//! let report = field.step();
//! assert_eq!(report.fired.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`registry`]: label → record store, written through to a JSON document
//! - [`node`]: activation units and their accumulation / firing rules
//! - [`root`]: directed weighted edges with transmission and plasticity rules
//! - [`field`]: the arena that wires roots and steps propagation
//! - [`scheduler`]: delayed delivery queue
//! - [`observer`]: read-only snapshot adapters

#[path = "core/error.rs"]
pub mod error;

#[path = "core/state.rs"]
pub mod state;

#[path = "core/store.rs"]
pub mod store;

#[path = "core/registry.rs"]
pub mod registry;

#[path = "core/node.rs"]
pub mod node;

#[path = "core/root.rs"]
pub mod root;

#[path = "core/scheduler.rs"]
pub mod scheduler;

#[path = "core/field.rs"]
pub mod field;

pub mod observer;

pub use error::{Result, TronError};

/// Prelude module for convenient imports.
///
/// ```
/// use tron::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Result, TronError};
    pub use crate::field::{Field, StepReport};
    pub use crate::node::{
        AccumulationMode, ActivityBound, Node, NodeConfig, NodeKey, Rehydration, TraceEvent,
    };
    pub use crate::observer::{FieldAdapter, RegistryView};
    pub use crate::registry::{label_id, DuplicatePolicy, Record, Registry, RegistryConfig};
    pub use crate::root::{hebbian, LogicKind, Root, RootConfig, RootKey, Transmission};
    pub use crate::state::{NodeState, Provenance};
}
