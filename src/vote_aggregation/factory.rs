/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Construction of [vote processors](super::processor::VoteProcessor) bound to a proposal.

use std::sync::Arc;

use crate::{
    committee::Committee,
    hotstuff::messages::vote_message_bytes,
    types::block::Proposal,
};

use super::{
    aggregator::Ed25519SignatureAggregator,
    errors::{FactoryError, VoteError},
    processor::{OnQCCreated, StakingVoteProcessor, VoteProcessor},
};

pub trait VoteProcessorFactory: Send + Sync {
    /// Create a vote processor for the block in `proposal`, and process the proposer's own vote with it.
    ///
    /// Expected errors: [FactoryError::InvalidProposal] if the proposer's vote is invalid.
    fn create(&self, proposal: &Proposal) -> Result<Arc<dyn VoteProcessor>, FactoryError>;
}

/// Creates [StakingVoteProcessor]s over Ed25519 staking signatures, using the participants and quorum
/// threshold that the [Committee] reports for the proposed block.
pub struct StakingVoteProcessorFactory {
    committee: Arc<dyn Committee>,
    on_qc_created: OnQCCreated,
}

impl StakingVoteProcessorFactory {
    pub fn new(committee: Arc<dyn Committee>, on_qc_created: OnQCCreated) -> StakingVoteProcessorFactory {
        StakingVoteProcessorFactory {
            committee,
            on_qc_created,
        }
    }
}

impl VoteProcessorFactory for StakingVoteProcessorFactory {
    fn create(&self, proposal: &Proposal) -> Result<Arc<dyn VoteProcessor>, FactoryError> {
        let block = &proposal.block;
        let all_participants = self.committee.identities_by_block(&block.block_id)?;
        let min_required_weight = self.committee.quorum_threshold_for_view(block.view)?;

        let aggregator = Ed25519SignatureAggregator::new(
            all_participants.clone(),
            vote_message_bytes(block.view, &block.block_id)?,
        );
        let processor = StakingVoteProcessor::new(
            block.clone(),
            Box::new(aggregator),
            self.on_qc_created.clone(),
            min_required_weight,
            all_participants,
        );

        match processor.process(&proposal.proposer_vote()) {
            Ok(()) => (),
            Err(VoteError::InvalidVote(source)) => {
                return Err(FactoryError::InvalidProposal {
                    proposal: Box::new(proposal.clone()),
                    source,
                })
            }
            Err(err) => return Err(FactoryError::Unexpected(err)),
        }

        log::debug!(
            "created vote processor for block {} in view {}",
            block.block_id,
            block.view
        );
        Ok(Arc::new(processor))
    }
}
