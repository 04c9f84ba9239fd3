use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, TronError};
use crate::state::{NodeState, Provenance};
use crate::store;

/// Default store location, relative to the working directory.
pub const DEFAULT_REGISTRY_FILE: &str = ".tron_registry.json";

/// Environment variable that overrides the store location.
pub const REGISTRY_ENV: &str = "TRON_REGISTRY";

/// Deterministic identity for a label: UUID v5 in the DNS namespace.
pub fn label_id(label: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, label.as_bytes())
}

/// What `register` does when a label already exists with different provenance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Keep the existing record and log a warning.
    #[default]
    Warn,
    /// Fail with [`TronError::DuplicateRegistration`].
    Reject,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub path: PathBuf,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REGISTRY_FILE),
            duplicate_policy: DuplicatePolicy::Warn,
        }
    }
}

impl RegistryConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// `$TRON_REGISTRY` if set and non-empty, else [`DEFAULT_REGISTRY_FILE`].
    pub fn from_env() -> Self {
        match std::env::var_os(REGISTRY_ENV) {
            Some(p) if !p.is_empty() => Self::at(p),
            _ => Self::default(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// One persisted label binding.
///
/// Older documents spelled `id` as `nodeID`, `kind` as `nodalType` and stored
/// `timestamp` as epoch seconds; all of those still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub label: String,
    #[serde(alias = "nodeID")]
    pub id: Uuid,
    #[serde(default)]
    pub state: NodeState,
    pub origin: String,
    pub reason: String,
    pub owner: String,
    #[serde(alias = "nodalType")]
    pub kind: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub history: Vec<NodeState>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
}

impl Record {
    fn new(label: &str, state: NodeState, provenance: &Provenance) -> Self {
        let history = if state.is_unset() {
            Vec::new()
        } else {
            vec![state.clone()]
        };
        Self {
            label: label.to_string(),
            id: label_id(label),
            state,
            origin: provenance.origin.clone(),
            reason: provenance.reason.clone(),
            owner: provenance.owner.clone(),
            kind: provenance.kind.clone(),
            tags: BTreeSet::new(),
            history,
            timestamp: Utc::now(),
        }
    }

    pub fn provenance(&self) -> Provenance {
        Provenance::new(&self.origin, &self.reason, &self.owner, &self.kind)
    }
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(DateTime<Utc>),
        Epoch(f64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Text(t) => Ok(t),
            Raw::Epoch(secs) => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9) as u32;
                DateTime::<Utc>::from_timestamp(whole as i64, nanos)
                    .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}")))
            }
        }
    }
}

/// Durable label → record store.
///
/// Explicitly opened, written through on every mutation, closed by value.
/// Lookup by id goes through a secondary index rather than a scan.
#[derive(Debug)]
pub struct Registry {
    config: RegistryConfig,
    records: BTreeMap<String, Record>,
    by_id: HashMap<Uuid, String>,
}

impl Registry {
    pub fn open(config: RegistryConfig) -> Result<Self> {
        let path = config.path.clone();
        let records: BTreeMap<String, Record> = store::read_document(&path)?.unwrap_or_default();

        let mut by_id = HashMap::with_capacity(records.len());
        for (key, record) in &records {
            if key != &record.label {
                return Err(TronError::store_corrupt(
                    &path,
                    format!("key {key:?} holds record labelled {:?}", record.label),
                ));
            }
            if record.id != label_id(key) {
                return Err(TronError::store_corrupt(
                    &path,
                    format!("record {key:?} has id {} not derived from its label", record.id),
                ));
            }
            by_id.insert(record.id, key.clone());
        }

        info!(path = ?path, records = records.len(), "registry opened");
        Ok(Self {
            config,
            records,
            by_id,
        })
    }

    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(RegistryConfig::at(path))
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bind `label` to a record, creating and persisting it on first use.
    ///
    /// An existing record is returned untouched. A differing `state` is
    /// ignored; differing provenance is handled per [`DuplicatePolicy`].
    pub fn register(
        &mut self,
        label: &str,
        state: NodeState,
        provenance: &Provenance,
    ) -> Result<&Record> {
        if self.records.contains_key(label) {
            let existing = &self.records[label];
            if let Some(field) = existing.provenance().first_difference(provenance) {
                match self.config.duplicate_policy {
                    DuplicatePolicy::Warn => {
                        warn!(label, field, "label already registered; keeping existing record");
                    }
                    DuplicatePolicy::Reject => {
                        return Err(TronError::DuplicateRegistration {
                            label: label.to_string(),
                            field,
                        });
                    }
                }
            }
            return Ok(&self.records[label]);
        }

        check_finite(&state)?;
        let record = Record::new(label, state, provenance);
        let id = record.id;
        debug!(label, id = %id, "registering label");
        self.by_id.insert(id, label.to_string());
        self.records.insert(label.to_string(), record);
        if let Err(e) = self.persist() {
            self.records.remove(label);
            self.by_id.remove(&id);
            return Err(e);
        }
        Ok(&self.records[label])
    }

    pub fn get_by_label(&self, label: &str) -> Option<&Record> {
        self.records.get(label)
    }

    pub fn get_by_id(&self, id: &Uuid) -> Option<&Record> {
        self.by_id.get(id).and_then(|label| self.records.get(label))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.records.contains_key(label)
    }

    /// Set the current state and append it to the history.
    ///
    /// On a write failure the record is restored and the error is returned.
    pub fn update_state(&mut self, label: &str, state: NodeState) -> Result<()> {
        check_finite(&state)?;
        let record = self
            .records
            .get_mut(label)
            .ok_or_else(|| TronError::UnknownLabel(label.to_string()))?;
        record.history.push(state.clone());
        let previous = std::mem::replace(&mut record.state, state);

        if let Err(e) = self.persist() {
            if let Some(record) = self.records.get_mut(label) {
                record.history.pop();
                record.state = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Returns `false` when the tag was already present (nothing is written).
    pub fn add_tag(&mut self, label: &str, tag: &str) -> Result<bool> {
        let record = self
            .records
            .get_mut(label)
            .ok_or_else(|| TronError::UnknownLabel(label.to_string()))?;
        if !record.tags.insert(tag.to_string()) {
            return Ok(false);
        }
        if let Err(e) = self.persist() {
            if let Some(record) = self.records.get_mut(label) {
                record.tags.remove(tag);
            }
            return Err(e);
        }
        Ok(true)
    }

    pub fn all_labels(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    pub fn all_records(&self) -> Vec<&Record> {
        self.records.values().collect()
    }

    pub fn search_by_owner(&self, owner: &str) -> Vec<&Record> {
        self.records.values().filter(|r| r.owner == owner).collect()
    }

    /// Write the full document to an arbitrary path.
    pub fn export(&self, path: &Path) -> Result<()> {
        store::write_document(path, &self.records)?;
        info!(path = ?path, records = self.records.len(), "registry exported");
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.persist()
    }

    pub fn close(self) -> Result<()> {
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        store::write_document(&self.config.path, &self.records)
    }
}

/// JSON has no encoding for NaN or infinity; they would reload as unset.
fn check_finite(state: &NodeState) -> Result<()> {
    if state.is_finite() {
        Ok(())
    } else {
        Err(TronError::InvalidConfig("state must not contain NaN or infinity"))
    }
}
