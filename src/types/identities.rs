/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the [Identity] and [IdentityList] types and their associated methods.

use std::{collections::HashMap, slice};

pub use ed25519_dalek::{Signature, SigningKey, VerifyingKey};

use super::basic::{Identifier, Weight};

/// A committee member: its node ID, the key it signs votes with, and its voting weight.
///
/// The node ID of an identity is the bytes of its verifying key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub node_id: Identifier,
    pub verifying_key: VerifyingKey,
    pub weight: Weight,
}

impl Identity {
    pub fn new(verifying_key: VerifyingKey, weight: Weight) -> Identity {
        Identity {
            node_id: Identifier::new(verifying_key.to_bytes()),
            verifying_key,
            weight,
        }
    }
}

/// A set of [identities](Identity), e.g. the participants of a committee.
///
/// The list maintains its identities in ascending (canonical) order of their node IDs, and avails
/// [IdentityList::iter] and [IdentityList::node_ids] to walk through them in this order.
#[derive(Clone, Debug, Default)]
pub struct IdentityList {
    // Identities are kept here in ascending order of node ID.
    identities: Vec<Identity>,
    positions: HashMap<Identifier, usize>,
}

impl IdentityList {
    pub fn new() -> IdentityList {
        Self {
            identities: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Insert `identity` into the list, replacing any identity with the same node ID.
    pub fn put(&mut self, identity: Identity) {
        match self
            .identities
            .binary_search_by(|i| i.node_id.cmp(&identity.node_id))
        {
            Ok(pos) => self.identities[pos] = identity,
            Err(pos) => {
                self.identities.insert(pos, identity);
                self.reindex();
            }
        }
    }

    pub fn remove(&mut self, node_id: &Identifier) -> Option<Identity> {
        let pos = self.position(node_id)?;
        let removed = self.identities.remove(pos);
        self.reindex();
        Some(removed)
    }

    fn reindex(&mut self) {
        self.positions = self
            .identities
            .iter()
            .enumerate()
            .map(|(pos, identity)| (identity.node_id, pos))
            .collect();
    }

    pub fn get(&self, node_id: &Identifier) -> Option<&Identity> {
        self.position(node_id).map(|pos| &self.identities[pos])
    }

    pub fn contains(&self, node_id: &Identifier) -> bool {
        self.positions.contains_key(node_id)
    }

    /// Position of `node_id` in canonical order.
    pub fn position(&self, node_id: &Identifier) -> Option<usize> {
        self.positions.get(node_id).copied()
    }

    pub fn weight(&self, node_id: &Identifier) -> Option<Weight> {
        self.get(node_id).map(|identity| identity.weight)
    }

    pub fn total_weight(&self) -> Weight {
        self.identities
            .iter()
            .fold(Weight::zero(), |total, identity| total + identity.weight)
    }

    /// Get an iterator through the identities which walks through them in canonical order.
    pub fn iter(&self) -> slice::Iter<'_, Identity> {
        self.identities.iter()
    }

    /// The node IDs of the identities, in canonical order.
    pub fn node_ids(&self) -> Vec<Identifier> {
        self.identities.iter().map(|i| i.node_id).collect()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Identity> for IdentityList {
    fn from_iter<T: IntoIterator<Item = Identity>>(iter: T) -> Self {
        let mut list = IdentityList::new();
        for identity in iter {
            list.put(identity);
        }
        list
    }
}
