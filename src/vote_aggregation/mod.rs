/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Aggregation of votes into quorum certificates.
//!
//! ## Components
//!
//! From the bottom up:
//! 1. [aggregator]: verifies signatures and accumulates the weight of the signers.
//! 2. [processor]: consumes the votes for a single block, and builds the block's
//!    [QuorumCertificate](crate::hotstuff::types::QuorumCertificate) exactly once when the accumulated
//!    weight reaches the quorum threshold.
//! 3. [factory]: builds a processor for a proposal, using the participants and threshold reported by the
//!    [Committee](crate::committee::Committee), and feeds it the proposer's own vote.
//! 4. [collector]: per view, caches votes until the proposal arrives, then routes them to the processor.
//!    Detects double voting and double proposals.
//! 5. [collectors]: the registry of collectors, one per retained view.
//!
//! Protocol violations are reported to a [ViolationConsumer](violations::ViolationConsumer).
//!
//! ## Errors
//!
//! See [errors] for how errors are classified. In short: incompatible votes are routing mistakes,
//! invalid votes are evidence of misbehavior, and everything else is unexpected.

pub mod aggregator;

pub mod collector;

pub mod collectors;

pub mod errors;

pub mod factory;

pub mod processor;

pub mod violations;

pub mod votes_cache;
