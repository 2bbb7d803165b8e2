/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Reads of finalized registers from a durable [RegisterIndex] that may not be available yet.

use std::sync::{Arc, OnceLock};

use crate::types::{
    basic::BlockHeight,
    register::{RegisterID, RegisterValue},
};

/// Durable, height-indexed storage of register values. Queried for heights below the in-memory
/// pruning frontier.
pub trait RegisterIndex: Send + Sync {
    /// The value of `register_id` as of `height`.
    fn get(&self, register_id: &RegisterID, height: BlockHeight) -> Result<RegisterValue, RegisterIndexError>;

    /// The first height stored in the index.
    fn first_height(&self) -> BlockHeight;

    /// The latest height stored in the index.
    fn latest_height(&self) -> BlockHeight;
}

/// Reports the range of heights that indexing has completed for.
pub trait IndexReporter: Send + Sync {
    fn lowest_indexed_height(&self) -> BlockHeight;

    fn highest_indexed_height(&self) -> BlockHeight;
}

/// Serves register values once the register index has been bootstrapped.
///
/// Until [init_data_available](Self::init_data_available) is called, every read yields
/// [RegistersAsyncError::HeightNotIndexed]: a store that is still bootstrapping cannot be told apart
/// from one that is simply behind.
#[derive(Default)]
pub struct RegistersAsyncStore {
    data: OnceLock<(Arc<dyn IndexReporter>, Arc<dyn RegisterIndex>)>,
}

impl RegistersAsyncStore {
    pub fn new() -> RegistersAsyncStore {
        RegistersAsyncStore::default()
    }

    /// Make the register index available for reads. Only the first call has an effect.
    pub fn init_data_available(&self, reporter: Arc<dyn IndexReporter>, registers: Arc<dyn RegisterIndex>) {
        if self.data.set((reporter, registers)).is_err() {
            log::debug!("register index already initialized, ignoring");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.data.get().is_some()
    }

    /// Get the values of `ids` as of `height`, in the same order as `ids`.
    ///
    /// Expected errors: [RegistersAsyncError::HeightNotIndexed] if the store is still bootstrapping or
    /// `height` is outside the indexed range.
    pub fn register_values(
        &self,
        ids: &[RegisterID],
        height: BlockHeight,
    ) -> Result<Vec<RegisterValue>, RegistersAsyncError> {
        let (_, registers) = match self.data.get() {
            Some((reporter, registers)) if Self::is_indexed(reporter.as_ref(), height) => (reporter, registers),
            _ => return Err(RegistersAsyncError::HeightNotIndexed { height }),
        };

        ids.iter()
            .map(|register_id| {
                registers
                    .get(register_id, height)
                    .map_err(|source| RegistersAsyncError::RegisterIndex {
                        register_id: register_id.clone(),
                        source,
                    })
            })
            .collect()
    }

    fn is_indexed(reporter: &dyn IndexReporter, height: BlockHeight) -> bool {
        height >= reporter.lowest_indexed_height() && height <= reporter.highest_indexed_height()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistersAsyncError {
    #[error("height {height} is not indexed")]
    HeightNotIndexed { height: BlockHeight },

    #[error("failed to get register value for id {register_id}: {source}")]
    RegisterIndex {
        register_id: RegisterID,
        #[source]
        source: RegisterIndexError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterIndexError {
    #[error("register {register_id} not found at height {height}")]
    NotFound {
        register_id: RegisterID,
        height: BlockHeight,
    },

    #[error("height {height} is not indexed")]
    HeightNotIndexed { height: BlockHeight },

    #[error("register index failure: {0}")]
    Internal(String),
}
