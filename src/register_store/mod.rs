/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Storage of the registers produced by executing blocks.
//!
//! Executed but unfinalized blocks keep their register updates in the fork-aware
//! [InMemoryRegisterStore]. Once a block is finalized and pruned from it, its state is read from a
//! durable [RegisterIndex] through the [RegistersAsyncStore].

pub mod in_memory;
pub use in_memory::{InMemoryRegisterStore, RegisterStoreError};

pub mod registers_async;
pub use registers_async::{
    IndexReporter, RegisterIndex, RegisterIndexError, RegistersAsyncError, RegistersAsyncStore,
};
