/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [VoteProcessor] trait, and [StakingVoteProcessor], which builds a quorum certificate out of
//! staking signatures.
//!
//! ## Building the QC exactly once
//!
//! Votes for the same block may be processed by many threads at once, and several of them may observe
//! that the accumulated weight crossed the quorum threshold. Only one of them may build the QC. The
//! processor keeps a `done` flag, and a thread that wants to build the QC must first flip the flag from
//! `false` to `true` with a single compare-and-swap. The winner calls
//! [aggregate](super::aggregator::WeightedSignatureAggregator::aggregate) and `on_qc_created`; every
//! other thread sees the flag set and returns `Ok(())`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    hotstuff::{
        messages::Vote,
        types::{QuorumCertificate, VoteCollectorStatus},
    },
    types::{
        basic::Weight, block::Block, identities::IdentityList, signer_indices::SignerIndices,
    },
};

use super::{
    aggregator::WeightedSignatureAggregator,
    errors::{InvalidVoteError, VoteError},
};

/// Callback invoked synchronously with a newly built quorum certificate. Called at most once per
/// vote processor.
pub type OnQCCreated = Arc<dyn Fn(QuorumCertificate) + Send + Sync>;

/// Consumes votes for a single block, and builds a quorum certificate once enough weight has voted.
pub trait VoteProcessor: Send + Sync {
    /// The block this processor collects votes for.
    fn block(&self) -> &Block;

    /// Verify `vote` and accumulate its weight, building the QC if the threshold is crossed.
    ///
    /// Once the processor is [Done](VoteCollectorStatus::Done), votes for its block are accepted as
    /// no-ops.
    fn process(&self, vote: &Vote) -> Result<(), VoteError>;

    /// [Verifying](VoteCollectorStatus::Verifying) until building the QC is claimed,
    /// [Done](VoteCollectorStatus::Done) afterwards.
    fn status(&self) -> VoteCollectorStatus;
}

/// A [VoteProcessor] for votes carrying staking signatures.
pub struct StakingVoteProcessor {
    block: Block,
    staking_sig_aggregator: Box<dyn WeightedSignatureAggregator>,
    on_qc_created: OnQCCreated,
    min_required_weight: Weight,
    done: AtomicBool,
    all_participants: IdentityList,
}

impl StakingVoteProcessor {
    pub fn new(
        block: Block,
        staking_sig_aggregator: Box<dyn WeightedSignatureAggregator>,
        on_qc_created: OnQCCreated,
        min_required_weight: Weight,
        all_participants: IdentityList,
    ) -> StakingVoteProcessor {
        StakingVoteProcessor {
            block,
            staking_sig_aggregator,
            on_qc_created,
            min_required_weight,
            done: AtomicBool::new(false),
            all_participants,
        }
    }

    pub fn min_required_weight(&self) -> Weight {
        self.min_required_weight
    }

    fn ensure_vote_for_block(&self, vote: &Vote) -> Result<(), VoteError> {
        if vote.view != self.block.view {
            return Err(VoteError::VoteForIncompatibleView {
                vote_view: vote.view,
                expected: self.block.view,
            });
        }
        if vote.block_id != self.block.block_id {
            return Err(VoteError::VoteForIncompatibleBlock {
                vote_block: vote.block_id,
                expected: self.block.block_id,
            });
        }
        Ok(())
    }

    /// Aggregate the collected signatures into a quorum certificate.
    ///
    /// # Precondition
    /// The caller won the claim on `done`.
    fn build_qc(&self) -> Result<QuorumCertificate, VoteError> {
        let (signers, sig_data) = self
            .staking_sig_aggregator
            .aggregate()
            .map_err(VoteError::Aggregator)?;
        let signer_indices = SignerIndices::encode(&self.all_participants, &signers)?;

        Ok(QuorumCertificate {
            view: self.block.view,
            block_id: self.block.block_id,
            signer_indices,
            sig_data,
        })
    }
}

impl VoteProcessor for StakingVoteProcessor {
    fn block(&self) -> &Block {
        &self.block
    }

    fn process(&self, vote: &Vote) -> Result<(), VoteError> {
        self.ensure_vote_for_block(vote)?;

        if self.done.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Err(err) = self
            .staking_sig_aggregator
            .verify(&vote.signer_id, &vote.sig_data)
        {
            if err.is_invalid_signer() || err.is_invalid_signature() {
                return Err(InvalidVoteError::new(vote.clone(), err).into());
            }
            return Err(VoteError::Aggregator(err));
        }

        if self.done.load(Ordering::Acquire) {
            return Ok(());
        }

        let total_weight = self
            .staking_sig_aggregator
            .trusted_add(&vote.signer_id, &vote.sig_data)
            .map_err(VoteError::Aggregator)?;

        if total_weight < self.min_required_weight {
            return Ok(());
        }

        if self
            .done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let qc = self.build_qc()?;
        log::info!(
            "built QC for block {} in view {} with weight {} (required {})",
            qc.block_id,
            qc.view,
            total_weight,
            self.min_required_weight
        );
        (self.on_qc_created)(qc);

        Ok(())
    }

    fn status(&self) -> VoteCollectorStatus {
        if self.done.load(Ordering::Acquire) {
            VoteCollectorStatus::Done
        } else {
            VoteCollectorStatus::Verifying
        }
    }
}
