/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [InMemoryRegisterStore]: speculative register updates of executed but not yet finalized blocks.
//!
//! ## Structure
//!
//! Every saved block has a delta: the registers that executing it updated. Deltas are kept per block,
//! never merged. Blocks are linked to their parents, and all of them descend from the *pruned block*:
//! the latest finalized and executed block, whose state is held by durable storage instead.
//!
//! ```text
//!                 ┌── B (h+1) ── D (h+2)
//!   pruned (h) ───┤
//!                 └── C (h+1)
//! ```
//!
//! Reading a register at a block walks from the block towards the pruned block, returning the first
//! delta that updated the register.
//!
//! ## Pruning
//!
//! Pruning to a finalized block walks its fork down to the pruned block, and then, from the lowest
//! height up, removes each finalized block together with every other block at the same height and all
//! of their descendants. The finalized block becomes the new pruned block.
//!
//! `prune` finds the fork under the read lock and mutates under the write lock, releasing the lock in
//! between. Calls to `prune` must not run concurrently with each other.

use std::{
    collections::{HashMap, HashSet},
    sync::mpsc::Sender,
    time::SystemTime,
};

use parking_lot::RwLock;

use crate::{
    events::{Event, PruneRegistersEvent, SaveRegistersEvent},
    types::{
        basic::{BlockHeight, Identifier},
        register::{RegisterEntry, RegisterID, RegisterValue},
    },
};

pub struct InMemoryRegisterStore {
    state: RwLock<RegisterStoreState>,
    event_publisher: Option<Sender<Event>>,
}

struct RegisterStoreState {
    registers_by_block_id: HashMap<Identifier, HashMap<RegisterID, RegisterValue>>,
    parent_by_block_id: HashMap<Identifier, Identifier>,
    block_ids_by_height: HashMap<BlockHeight, HashSet<Identifier>>,
    pruned_height: BlockHeight,
    pruned_id: Identifier,
}

impl InMemoryRegisterStore {
    /// Create an empty store whose pruned block is `pruned_id` at `pruned_height`.
    pub fn new(pruned_height: BlockHeight, pruned_id: Identifier) -> InMemoryRegisterStore {
        InMemoryRegisterStore {
            state: RwLock::new(RegisterStoreState {
                registers_by_block_id: HashMap::new(),
                parent_by_block_id: HashMap::new(),
                block_ids_by_height: HashMap::new(),
                pruned_height,
                pruned_id,
            }),
            event_publisher: None,
        }
    }

    pub(crate) fn with_event_publisher(mut self, event_publisher: Option<Sender<Event>>) -> Self {
        self.event_publisher = event_publisher;
        self
    }

    /// Save the registers updated by executing `block_id`, a child of `parent_id`, at `height`.
    ///
    /// The parent must be either a saved block or the pruned block. Nothing is saved if this fails.
    pub fn save_registers(
        &self,
        height: BlockHeight,
        block_id: Identifier,
        parent_id: Identifier,
        registers: Vec<RegisterEntry>,
    ) -> Result<(), RegisterStoreError> {
        let registers_len = registers.len();
        let regs: HashMap<RegisterID, RegisterValue> = registers
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect();

        {
            let mut state = self.state.write();

            if height <= state.pruned_height {
                return Err(RegisterStoreError::SavePrunedHeight {
                    height,
                    pruned_height: state.pruned_height,
                });
            }

            if state.registers_by_block_id.contains_key(&block_id) {
                return Err(RegisterStoreError::AlreadySaved { block_id });
            }

            if !state.registers_by_block_id.contains_key(&parent_id) && parent_id != state.pruned_id {
                return Err(RegisterStoreError::ParentNotSaved {
                    block_id,
                    parent_id,
                });
            }

            state.registers_by_block_id.insert(block_id, regs);
            state.parent_by_block_id.insert(block_id, parent_id);
            state
                .block_ids_by_height
                .entry(height)
                .or_default()
                .insert(block_id);
        }

        Event::publish(
            &self.event_publisher,
            Event::SaveRegisters(SaveRegistersEvent {
                timestamp: SystemTime::now(),
                height,
                block_id,
                registers: registers_len,
            }),
        );

        Ok(())
    }

    /// Get the latest value of `register_id` as of block `block_id` at `height`.
    ///
    /// A register that was not updated by any block between the pruned block and `block_id` yields
    /// [RegisterStoreError::Pruned]. The store cannot tell such a register apart from one that was
    /// never written.
    pub fn get_register(
        &self,
        height: BlockHeight,
        block_id: &Identifier,
        register_id: &RegisterID,
    ) -> Result<RegisterValue, RegisterStoreError> {
        let state = self.state.read();
        state.ensure_executed(height, block_id)?;

        let mut block = *block_id;
        loop {
            if let Some(value) = state
                .registers_by_block_id
                .get(&block)
                .and_then(|registers| registers.get(register_id))
            {
                return Ok(value.clone());
            }

            match state.parent_by_block_id.get(&block) {
                Some(parent) => block = *parent,
                None if block == state.pruned_id => {
                    return Err(RegisterStoreError::Pruned {
                        height,
                        pruned_height: state.pruned_height,
                    })
                }
                None => {
                    let err = RegisterStoreError::InconsistentParentIndex {
                        missing: block,
                        block_id: *block_id,
                    };
                    log::error!("{}", err);
                    return Err(err);
                }
            }
        }
    }

    /// Get the registers updated by executing `block_id` itself, sorted by register ID.
    pub fn get_updated_registers(
        &self,
        height: BlockHeight,
        block_id: &Identifier,
    ) -> Result<Vec<RegisterEntry>, RegisterStoreError> {
        let state = self.state.read();
        state.ensure_executed(height, block_id)?;

        let mut entries: Vec<RegisterEntry> = state
            .registers_by_block_id
            .get(block_id)
            .into_iter()
            .flatten()
            .map(|(key, value)| RegisterEntry::new(key.clone(), value.clone()))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(entries)
    }

    /// Finalize `block_id` at `height`: discard every block that does not descend from it, and make it
    /// the new pruned block.
    ///
    /// `block_id` must have been saved with [save_registers](Self::save_registers).
    pub fn prune(&self, height: BlockHeight, block_id: &Identifier) -> Result<(), RegisterStoreError> {
        let finalized_fork = self.find_finalized_fork(height, block_id).map_err(|err| {
            if err.is_inconsistent() {
                log::error!("cannot find finalized fork: {}", err);
            }
            err
        })?;

        {
            let mut state = self.state.write();

            // Blocks may have been saved since the fork was found, but the frontier must not have moved.
            let fork_base = BlockHeight::new(height.int() - finalized_fork.len() as u64);
            let lowest = finalized_fork.last().copied().unwrap_or(*block_id);
            if fork_base != state.pruned_height
                || state.parent_by_block_id.get(&lowest) != Some(&state.pruned_id)
            {
                let err = RegisterStoreError::InconsistentForkHeight {
                    block_id: *block_id,
                    fork_base,
                    pruned_height: state.pruned_height,
                };
                log::error!("{}", err);
                return Err(err);
            }

            // Lowest height first.
            for block in finalized_fork.iter().rev() {
                let next_height = state.pruned_height + 1;
                state.prune_by_height(next_height, *block)?;
            }
        }

        log::info!("pruned register store to block {} at height {}", block_id, height);
        Event::publish(
            &self.event_publisher,
            Event::PruneRegisters(PruneRegistersEvent {
                timestamp: SystemTime::now(),
                pruned_height: height,
                pruned_block: *block_id,
            }),
        );

        Ok(())
    }

    pub fn pruned_height(&self) -> BlockHeight {
        self.state.read().pruned_height
    }

    pub fn pruned_id(&self) -> Identifier {
        self.state.read().pruned_id
    }

    /// Whether the registers of `block_id` have been saved. Heights at or below the pruned height
    /// yield [RegisterStoreError::Pruned], since finalized blocks are no longer tracked.
    pub fn is_block_executed(
        &self,
        height: BlockHeight,
        block_id: &Identifier,
    ) -> Result<bool, RegisterStoreError> {
        let state = self.state.read();
        state.ensure_not_pruned(height)?;
        Ok(state.registers_by_block_id.contains_key(block_id))
    }

    /// The blocks from `block_id` at `height` down to the child of the pruned block, highest first.
    fn find_finalized_fork(
        &self,
        height: BlockHeight,
        block_id: &Identifier,
    ) -> Result<Vec<Identifier>, RegisterStoreError> {
        let state = self.state.read();
        state.ensure_not_pruned(height)?;

        let mut fork = Vec::new();
        let mut block = *block_id;
        // Height of `block`'s parent.
        let mut parent_height = height;
        loop {
            fork.push(block);
            parent_height = BlockHeight::new(parent_height.int() - 1);

            let parent = *state.parent_by_block_id.get(&block).ok_or(
                RegisterStoreError::InconsistentParentIndex {
                    missing: block,
                    block_id: *block_id,
                },
            )?;
            if parent == state.pruned_id {
                break;
            }
            if parent_height <= state.pruned_height {
                break;
            }
            block = parent;
        }

        if parent_height != state.pruned_height
            || state.parent_by_block_id.get(&block) != Some(&state.pruned_id)
        {
            return Err(RegisterStoreError::InconsistentForkHeight {
                block_id: *block_id,
                fork_base: parent_height,
                pruned_height: state.pruned_height,
            });
        }

        Ok(fork)
    }
}

impl RegisterStoreState {
    fn ensure_not_pruned(&self, height: BlockHeight) -> Result<(), RegisterStoreError> {
        if height <= self.pruned_height {
            return Err(RegisterStoreError::Pruned {
                height,
                pruned_height: self.pruned_height,
            });
        }
        Ok(())
    }

    fn ensure_executed(&self, height: BlockHeight, block_id: &Identifier) -> Result<(), RegisterStoreError> {
        self.ensure_not_pruned(height)?;
        if !self.registers_by_block_id.contains_key(block_id) {
            return Err(RegisterStoreError::NotExecuted {
                height,
                block_id: *block_id,
            });
        }
        Ok(())
    }

    fn prune_by_height(&mut self, height: BlockHeight, finalized: Identifier) -> Result<(), RegisterStoreError> {
        self.remove_block(height, &finalized);

        let conflicting: Vec<Identifier> = self
            .block_ids_by_height
            .get(&height)
            .map(|blocks| blocks.iter().copied().collect())
            .unwrap_or_default();
        for block in conflicting {
            self.prune_fork(height, block);
        }

        if let Some(remaining) = self.block_ids_by_height.get(&height).filter(|blocks| !blocks.is_empty()) {
            return Err(RegisterStoreError::ForkNotPruned {
                height,
                remaining: remaining.len(),
            });
        }

        self.block_ids_by_height.remove(&height);
        self.pruned_height = height;
        self.pruned_id = finalized;
        Ok(())
    }

    fn remove_block(&mut self, height: BlockHeight, block_id: &Identifier) {
        self.registers_by_block_id.remove(block_id);
        self.parent_by_block_id.remove(block_id);
        if let Some(blocks) = self.block_ids_by_height.get_mut(&height) {
            blocks.remove(block_id);
        }
    }

    /// Remove `block_id` and all of its descendants.
    fn prune_fork(&mut self, height: BlockHeight, block_id: Identifier) {
        self.remove_block(height, &block_id);

        let next_height = height + 1;
        let children: Vec<Identifier> = match self.block_ids_by_height.get(&next_height) {
            Some(blocks) => blocks
                .iter()
                .filter(|block| self.parent_by_block_id.get(*block) == Some(&block_id))
                .copied()
                .collect(),
            None => return,
        };
        for child in children {
            self.prune_fork(next_height, child);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterStoreError {
    #[error("cannot save registers at height {height}, at or below the pruned height {pruned_height}")]
    SavePrunedHeight {
        height: BlockHeight,
        pruned_height: BlockHeight,
    },

    #[error("registers for block {block_id} are already saved")]
    AlreadySaved { block_id: Identifier },

    #[error("cannot save registers for block {block_id}, its parent {parent_id} is not saved")]
    ParentNotSaved {
        block_id: Identifier,
        parent_id: Identifier,
    },

    /// The height is at or below the pruned height, or the register was not updated since the pruned
    /// block.
    #[error("height {height} is pruned (pruned height: {pruned_height})")]
    Pruned {
        height: BlockHeight,
        pruned_height: BlockHeight,
    },

    #[error("block {block_id} at height {height} is not executed")]
    NotExecuted {
        height: BlockHeight,
        block_id: Identifier,
    },

    /// A block's ancestor is missing before the pruned block is reached. Indicates a bug in the store.
    #[error("inconsistent parent index: ancestor {missing} of block {block_id} is not found")]
    InconsistentParentIndex {
        missing: Identifier,
        block_id: Identifier,
    },

    /// The fork of a block does not end at the pruned block. Indicates a bug in the store, or a
    /// concurrent prune.
    #[error("inconsistent parent index: fork of block {block_id} ends at height {fork_base}, but the pruned height is {pruned_height}")]
    InconsistentForkHeight {
        block_id: Identifier,
        fork_base: BlockHeight,
        pruned_height: BlockHeight,
    },

    #[error("{remaining} blocks remain at height {height} after pruning conflicting forks")]
    ForkNotPruned { height: BlockHeight, remaining: usize },
}

impl RegisterStoreError {
    pub fn is_pruned(&self) -> bool {
        matches!(self, RegisterStoreError::Pruned { .. })
    }

    pub fn is_not_executed(&self) -> bool {
        matches!(self, RegisterStoreError::NotExecuted { .. })
    }

    pub fn is_inconsistent(&self) -> bool {
        matches!(
            self,
            RegisterStoreError::InconsistentParentIndex { .. }
                | RegisterStoreError::InconsistentForkHeight { .. }
                | RegisterStoreError::ForkNotPruned { .. }
        )
    }
}
