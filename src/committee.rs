/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The committee service: who may vote on a block, with what weight, and how much weight is needed to
//! form a quorum.
//!
//! Committee and epoch lookups are external to vote aggregation. They are handed to the
//! [vote processor factory](crate::vote_aggregation::factory::StakingVoteProcessorFactory) as an
//! explicit [Committee] trait object rather than consulted through global state.

use crate::types::{
    basic::{Identifier, ViewNumber, Weight},
    identities::IdentityList,
};

/// Minimum weight that a set of signers must have to build a quorum certificate, given the total
/// weight of the committee: strictly more than two thirds.
pub fn weight_threshold_to_build_qc(total_weight: Weight) -> Weight {
    Weight::new(((total_weight.int() as u128 * 2 / 3) + 1) as u64)
}

pub trait Committee: Send + Sync {
    /// The participants eligible to vote for the block with ID `block_id`.
    fn identities_by_block(&self, block_id: &Identifier) -> Result<IdentityList, CommitteeError>;

    /// The participants of the epoch that `view` belongs to.
    fn identities_by_view(&self, view: ViewNumber) -> Result<IdentityList, CommitteeError>;

    /// Minimum weight of votes required to build a quorum certificate in `view`.
    fn quorum_threshold_for_view(&self, view: ViewNumber) -> Result<Weight, CommitteeError>;
}

/// A [Committee] whose membership never changes.
#[derive(Clone)]
pub struct StaticCommittee {
    identities: IdentityList,
}

impl StaticCommittee {
    pub fn new(identities: IdentityList) -> StaticCommittee {
        StaticCommittee { identities }
    }

    pub fn identities(&self) -> &IdentityList {
        &self.identities
    }
}

impl Committee for StaticCommittee {
    fn identities_by_block(&self, _block_id: &Identifier) -> Result<IdentityList, CommitteeError> {
        Ok(self.identities.clone())
    }

    fn identities_by_view(&self, _view: ViewNumber) -> Result<IdentityList, CommitteeError> {
        Ok(self.identities.clone())
    }

    fn quorum_threshold_for_view(&self, _view: ViewNumber) -> Result<Weight, CommitteeError> {
        Ok(weight_threshold_to_build_qc(self.identities.total_weight()))
    }
}

/// The ways a [Committee] lookup can fail.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommitteeError {
    #[error("no epoch is known for view {view}")]
    UnknownEpoch { view: ViewNumber },

    #[error("block {block_id} is unknown to the committee service")]
    UnknownBlock { block_id: Identifier },

    #[error("committee service failure: {0}")]
    Internal(String),
}
