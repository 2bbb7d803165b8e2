/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Reporting of protocol violations detected while aggregating votes.

use crate::{hotstuff::messages::Vote, types::block::Proposal};

use super::errors::{FactoryError, InvalidVoteError};

/// Notified when vote aggregation detects that a committee member misbehaved. All methods do nothing
/// by default.
///
/// Methods are called synchronously from the thread processing the offending vote or proposal, and
/// should return quickly.
pub trait ViolationConsumer: Send + Sync {
    /// A vote with an invalid signer or signature was received.
    fn on_invalid_vote_detected(&self, _err: &InvalidVoteError) {}

    /// `first` and `conflicting` are both from the same signer in the same view, but differ.
    fn on_double_voting_detected(&self, _first: &Vote, _conflicting: &Vote) {}

    /// A vote was received for a proposal that is known to be invalid.
    fn on_vote_for_invalid_block_detected(&self, _vote: &Vote, _invalid_proposal: &Proposal) {}

    /// A proposal was rejected because the proposer's own vote in it is invalid.
    fn on_invalid_block_detected(&self, _err: &FactoryError) {}

    /// The leader of a view proposed two different blocks.
    fn on_double_propose_detected(&self, _first: &Proposal, _conflicting: &Proposal) {}
}

/// A [ViolationConsumer] that ignores every violation.
pub struct NoopViolationConsumer;

impl ViolationConsumer for NoopViolationConsumer {}

/// A [ViolationConsumer] that logs every violation with `log::warn!`.
pub struct LoggingViolationConsumer;

impl ViolationConsumer for LoggingViolationConsumer {
    fn on_invalid_vote_detected(&self, err: &InvalidVoteError) {
        log::warn!("invalid vote detected: {}", err);
    }

    fn on_double_voting_detected(&self, first: &Vote, conflicting: &Vote) {
        log::warn!(
            "double voting detected: {} voted for {} and {} in view {}",
            first.signer_id,
            first.block_id,
            conflicting.block_id,
            first.view
        );
    }

    fn on_vote_for_invalid_block_detected(&self, vote: &Vote, invalid_proposal: &Proposal) {
        log::warn!(
            "vote from {} for invalid block {} in view {}",
            vote.signer_id,
            invalid_proposal.block.block_id,
            vote.view
        );
    }

    fn on_invalid_block_detected(&self, err: &FactoryError) {
        log::warn!("invalid block detected: {}", err);
    }

    fn on_double_propose_detected(&self, first: &Proposal, conflicting: &Proposal) {
        log::warn!(
            "double proposal detected: {} proposed {} and {} in view {}",
            first.block.proposer_id,
            first.block.block_id,
            conflicting.block.block_id,
            first.block.view
        );
    }
}
