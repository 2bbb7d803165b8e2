/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The consensus and execution-state core of a permissioned blockchain node.
//!
//! The crate holds two subsystems:
//! 1. [Vote aggregation](vote_aggregation): collecting the HotStuff votes of a weighted committee for a
//!    proposed block, and building the block's [quorum certificate](hotstuff::types::QuorumCertificate)
//!    exactly once when enough weight has voted.
//! 2. [Register storage](register_store): holding the speculative register updates of executed but
//!    unfinalized blocks, fork by fork, and discarding the forks that lose once a block is finalized.
//!
//! Both can be used directly, or assembled into a [replica] which also runs an event bus that
//! publishes [events] to user-defined handlers and, optionally, [logs](logging) them.

pub mod committee;

pub mod communicator;

pub mod config;

pub(crate) mod event_bus;

pub mod events;

pub mod hotstuff;

pub mod logging;

pub mod register_store;

pub mod replica;

pub mod types;

pub mod vote_aggregation;
