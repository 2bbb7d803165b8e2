/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The ways processing votes and proposals can fail.
//!
//! Errors fall into four classes that callers must treat differently:
//! 1. **Incompatible votes** ([VoteError::VoteForIncompatibleView], [VoteError::VoteForIncompatibleBlock]):
//!    the vote was routed to the wrong place. This is not by itself evidence of misbehavior.
//! 2. **Invalid votes** ([VoteError::InvalidVote], see [VoteError::is_invalid_vote]): the vote's signer
//!    or signature is wrong, and the caller may penalize the sender.
//! 3. **Double votes** ([VoteError::DoubleVote], see [VoteError::is_double_vote]): the signer voted
//!    twice in the view. Each of its votes is valid on its own, so this is reported separately from
//!    invalid votes.
//! 4. **Unexpected errors** ([VoteError::Aggregator], [VoteError::BuildQC]): infrastructure faults.
//!    These are never classified as invalid votes.

use crate::{
    committee::CommitteeError,
    hotstuff::messages::Vote,
    types::{
        basic::{Identifier, ViewNumber},
        block::Proposal,
        signer_indices::SignerIndicesError,
    },
};

use super::aggregator::SignatureError;

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("vote is for view {vote_view}, expected view {expected}")]
    VoteForIncompatibleView {
        vote_view: ViewNumber,
        expected: ViewNumber,
    },

    #[error("vote is for block {vote_block}, expected block {expected}")]
    VoteForIncompatibleBlock {
        vote_block: Identifier,
        expected: Identifier,
    },

    #[error(transparent)]
    InvalidVote(#[from] InvalidVoteError),

    #[error(transparent)]
    DoubleVote(#[from] DoubleVoteError),

    /// Unexpected failure of the signature aggregator.
    #[error("unexpected signature aggregator failure: {0}")]
    Aggregator(#[source] SignatureError),

    /// Unexpected failure while encoding the signers of a quorum certificate.
    #[error("could not build quorum certificate: {0}")]
    BuildQC(#[from] SignerIndicesError),
}

impl VoteError {
    pub fn is_invalid_vote(&self) -> bool {
        matches!(self, VoteError::InvalidVote(_))
    }

    pub fn is_invalid_signer(&self) -> bool {
        matches!(self, VoteError::InvalidVote(err) if err.source.is_invalid_signer())
    }

    pub fn is_invalid_signature(&self) -> bool {
        matches!(self, VoteError::InvalidVote(err) if err.source.is_invalid_signature())
    }

    pub fn is_double_vote(&self) -> bool {
        matches!(self, VoteError::DoubleVote(_))
    }

    /// Whether the error is an infrastructure fault rather than a problem with the vote.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, VoteError::Aggregator(_) | VoteError::BuildQC(_))
    }

    pub fn is_incompatible(&self) -> bool {
        matches!(
            self,
            VoteError::VoteForIncompatibleView { .. } | VoteError::VoteForIncompatibleBlock { .. }
        )
    }
}

/// A vote whose signer or signature is invalid. The underlying [SignatureError] is kept as the source.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid vote from {} for block {}: {source}", .vote.signer_id, .vote.block_id)]
pub struct InvalidVoteError {
    pub vote: Vote,
    #[source]
    pub source: SignatureError,
}

impl InvalidVoteError {
    pub fn new(vote: Vote, source: SignatureError) -> InvalidVoteError {
        InvalidVoteError { vote, source }
    }
}

/// The same signer voted twice in one view, with different votes.
#[derive(Debug, Clone, thiserror::Error)]
#[error("double vote from {} in view {}: blocks {} and {}", .first.signer_id, .first.view, .first.block_id, .conflicting.block_id)]
pub struct DoubleVoteError {
    pub first: Vote,
    pub conflicting: Vote,
}

/// The ways [VoteProcessorFactory::create](super::factory::VoteProcessorFactory::create) can fail.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// The proposer's own vote, carried in the proposal, is invalid. This makes the proposal invalid.
    #[error("invalid proposal for block {}: {source}", .proposal.block.block_id)]
    InvalidProposal {
        proposal: Box<Proposal>,
        #[source]
        source: InvalidVoteError,
    },

    #[error(transparent)]
    Committee(#[from] CommitteeError),

    #[error("failed to encode the vote message: {0}")]
    MessageEncoding(#[from] std::io::Error),

    /// Unexpected failure while processing the proposer's vote.
    #[error("unexpected error processing proposer vote: {0}")]
    Unexpected(#[source] VoteError),
}

impl FactoryError {
    pub fn is_invalid_proposal(&self) -> bool {
        matches!(self, FactoryError::InvalidProposal { .. })
    }
}

/// The ways [VoteCollector::process_block](super::collector::VoteCollector::process_block) can fail.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("proposal is for view {proposal_view}, expected view {expected}")]
    ProposalForIncompatibleView {
        proposal_view: ViewNumber,
        expected: ViewNumber,
    },

    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// Unexpected error while replaying cached votes into a new vote processor.
    #[error("unexpected error processing cached vote: {0}")]
    CachedVote(#[source] VoteError),
}
