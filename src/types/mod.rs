/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that are used across multiple components of the crate.
//!
//! Types specific to a single component, e.g. the [quorum certificate](crate::hotstuff::types::QuorumCertificate),
//! can be found in the "types" submodules of their components.

pub mod basic;

pub mod block;

pub mod identities;

pub mod register;

pub mod signer_indices;
