//! Change sets and plan calculation
//!
//! [`Changes`] groups endpoints into the four buckets a provider applies.
//! [`Plan`] computes them from the current and desired endpoint sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::endpoint::{Endpoint, RecordKey};
use crate::error::{Error, Result};

/// The kind of change applied to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Create,
    /// The previous value of an updated record
    UpdateOld,
    /// The new value of an updated record
    UpdateNew,
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeAction::Create => "create",
            ChangeAction::UpdateOld => "update-old",
            ChangeAction::UpdateNew => "update-new",
            ChangeAction::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Endpoints grouped by the action a provider must take
///
/// `update_old[i]` and `update_new[i]` always describe the same record:
/// the previous and the desired value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    pub create: Vec<Endpoint>,
    pub update_old: Vec<Endpoint>,
    pub update_new: Vec<Endpoint>,
    pub delete: Vec<Endpoint>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update_old.is_empty()
            && self.update_new.is_empty()
            && self.delete.is_empty()
    }

    /// Number of logical updates (pairs)
    pub fn update_count(&self) -> usize {
        self.update_new.len()
    }

    /// Check that every update pair is well formed
    ///
    /// The buckets must have equal lengths and each pair must share the same
    /// `(name, type)` key. Renames are rejected rather than guessed at.
    pub fn validate(&self) -> Result<()> {
        if self.update_old.len() != self.update_new.len() {
            return Err(Error::invalid_input(format!(
                "update buckets differ in length: {} old vs {} new",
                self.update_old.len(),
                self.update_new.len()
            )));
        }

        for (i, (old, new)) in self.update_old.iter().zip(&self.update_new).enumerate() {
            if old.key() != new.key() {
                return Err(Error::invalid_input(format!(
                    "update pair {i} changes record identity: {} -> {}",
                    old.key(),
                    new.key()
                )));
            }
        }

        Ok(())
    }

    /// Iterate over the update pairs
    pub fn updates(&self) -> impl Iterator<Item = (&Endpoint, &Endpoint)> {
        self.update_old.iter().zip(&self.update_new)
    }
}

/// Which kinds of changes a plan may produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Create, update and delete
    Sync,
    /// Create and update, never delete
    #[default]
    UpsertOnly,
    /// Only create missing records
    CreateOnly,
}

impl Policy {
    fn allows_updates(self) -> bool {
        !matches!(self, Policy::CreateOnly)
    }

    fn allows_deletes(self) -> bool {
        matches!(self, Policy::Sync)
    }
}

impl std::str::FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(Policy::Sync),
            "upsert-only" => Ok(Policy::UpsertOnly),
            "create-only" => Ok(Policy::CreateOnly),
            other => Err(Error::config(format!(
                "Unknown policy '{other}'. Valid: sync, upsert-only, create-only"
            ))),
        }
    }
}

/// Desired-vs-current diff for one reconciliation pass
#[derive(Debug, Clone)]
pub struct Plan {
    pub current: Vec<Endpoint>,
    pub desired: Vec<Endpoint>,
    pub policy: Policy,
}

impl Plan {
    pub fn new(current: Vec<Endpoint>, desired: Vec<Endpoint>, policy: Policy) -> Self {
        Self {
            current,
            desired,
            policy,
        }
    }

    /// Compute the changes that converge `current` to `desired`
    ///
    /// Records are matched by `(name, type)`. When the same key appears more
    /// than once in either set the first occurrence wins. Output order
    /// follows the key order so that repeated passes produce identical
    /// change sets.
    pub fn calculate(&self) -> Changes {
        let current = index_by_key(&self.current);
        let desired = index_by_key(&self.desired);
        let mut changes = Changes::new();

        for (key, want) in &desired {
            match current.get(key) {
                None => changes.create.push((*want).clone()),
                Some(have) if have.target != want.target && self.policy.allows_updates() => {
                    changes.update_old.push((*have).clone());
                    changes.update_new.push((*want).clone());
                }
                Some(_) => {}
            }
        }

        if self.policy.allows_deletes() {
            changes.delete = current
                .iter()
                .filter(|(key, _)| !desired.contains_key(*key))
                .map(|(_, have)| (*have).clone())
                .collect();
        }

        changes
    }
}

fn index_by_key(endpoints: &[Endpoint]) -> BTreeMap<RecordKey, &Endpoint> {
    let mut index = BTreeMap::new();
    for endpoint in endpoints {
        index.entry(endpoint.key()).or_insert(endpoint);
    }
    index
}
