/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [VoteCollector]: routes the votes and proposal of a single view to the vote processor for that
//! view's block.
//!
//! ## Lifecycle
//!
//! ```text
//!                process_block (valid)            QC built
//!   Caching ──────────────────────────▶ Verifying ─────────▶ Done
//!      │                                    │
//!      │ process_block (invalid)            │ process_block (different block)
//!      ▼                                    ▼
//!   Invalid ◀──────────────────────────────────
//! ```
//!
//! - In `Caching`, votes are only cached: no proposal has been seen, so there is nothing to verify
//!   them against.
//! - On a valid proposal, a vote processor is created with the
//!   [factory](super::factory::VoteProcessorFactory) and every cached vote for the proposed block is
//!   replayed into it.
//! - In `Verifying` and `Done`, the status is that of the processor. Votes for the proposed block are
//!   processed; votes for other blocks are only cached.
//! - In `Invalid`, proposals are ignored and votes are only cached.
//!
//! Every state transition happens under the collector's lock. The lock is never held while a vote
//! processor is created or fed, or while a [ViolationConsumer] is called, so these may call back into
//! the collector, and concurrent votes for the same view are not serialized by the collector.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    hotstuff::{messages::Vote, types::VoteCollectorStatus},
    types::{basic::ViewNumber, block::Proposal},
};

use super::{
    errors::{DoubleVoteError, ProposalError, VoteError},
    factory::VoteProcessorFactory,
    processor::VoteProcessor,
    violations::ViolationConsumer,
    votes_cache::{VoteConsumer, VotesCache, VotesCacheError},
};

pub struct VoteCollector {
    view: ViewNumber,
    factory: Arc<dyn VoteProcessorFactory>,
    violations: Arc<dyn ViolationConsumer>,
    state: Mutex<CollectorState>,
}

impl std::fmt::Debug for VoteCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteCollector")
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

struct CollectorState {
    votes_cache: VotesCache,
    // The first proposal seen for the view, valid or not.
    proposal: Option<Proposal>,
    processor: Option<Arc<dyn VoteProcessor>>,
    invalid: bool,
}

impl VoteCollector {
    pub fn new(
        view: ViewNumber,
        factory: Arc<dyn VoteProcessorFactory>,
        violations: Arc<dyn ViolationConsumer>,
    ) -> VoteCollector {
        VoteCollector {
            view,
            factory,
            violations,
            state: Mutex::new(CollectorState {
                votes_cache: VotesCache::new(view),
                proposal: None,
                processor: None,
                invalid: false,
            }),
        }
    }

    pub fn view(&self) -> ViewNumber {
        self.view
    }

    pub fn status(&self) -> VoteCollectorStatus {
        let state = self.state.lock();
        if state.invalid {
            return VoteCollectorStatus::Invalid;
        }
        match &state.processor {
            Some(processor) => processor.status(),
            None => VoteCollectorStatus::Caching,
        }
    }

    /// Number of distinct votes received for the view so far.
    pub fn cached_votes(&self) -> usize {
        self.state.lock().votes_cache.len()
    }

    /// Register an observer that will be handed every distinct vote for the view, including those
    /// received before registration.
    pub fn register_vote_consumer(&self, consumer: VoteConsumer) {
        self.state.lock().votes_cache.register_vote_consumer(consumer)
    }

    /// Add a vote for this collector's view.
    ///
    /// Exact duplicates of a vote already received are accepted as no-ops. A signer voting twice with
    /// different votes is reported to the [ViolationConsumer] and rejected with
    /// [VoteError::DoubleVote].
    pub fn add_vote(&self, vote: &Vote) -> Result<(), VoteError> {
        let mut state = self.state.lock();
        let cached = state.votes_cache.add_vote(vote);
        match cached {
            Ok(()) => (),
            Err(VotesCacheError::RepeatedVote) => return Ok(()),
            Err(VotesCacheError::VoteForIncompatibleView) => {
                return Err(VoteError::VoteForIncompatibleView {
                    vote_view: vote.view,
                    expected: self.view,
                })
            }
            Err(VotesCacheError::DoubleVote { first }) => {
                drop(state);
                self.violations.on_double_voting_detected(&first, vote);
                return Err(DoubleVoteError {
                    first,
                    conflicting: vote.clone(),
                }
                .into());
            }
        }

        if state.invalid {
            let invalid_proposal = state
                .proposal
                .clone()
                .filter(|proposal| proposal.block.block_id == vote.block_id);
            drop(state);
            if let Some(proposal) = invalid_proposal {
                self.violations
                    .on_vote_for_invalid_block_detected(vote, &proposal);
            }
            return Ok(());
        }

        let processor = match &state.processor {
            Some(processor) if processor.block().block_id == vote.block_id => processor.clone(),
            _ => return Ok(()),
        };
        drop(state);

        self.process_vote(processor.as_ref(), vote)
    }

    /// Process the proposal for this collector's view.
    ///
    /// The first valid proposal creates the vote processor and replays the cached votes for its block.
    /// An invalid proposal, or a second proposal for a different block, makes the collector
    /// [Invalid](VoteCollectorStatus::Invalid); both are reported to the [ViolationConsumer] rather than
    /// returned as errors.
    ///
    /// The processor is created without holding the collector's lock, since creating it verifies the
    /// proposer's signature and may build the QC. Votes that arrive in the meantime are cached and
    /// replayed once the processor is installed.
    pub fn process_block(&self, proposal: &Proposal) -> Result<(), ProposalError> {
        if proposal.view() != self.view {
            return Err(ProposalError::ProposalForIncompatibleView {
                proposal_view: proposal.view(),
                expected: self.view,
            });
        }

        {
            let mut state = self.state.lock();
            if state.invalid {
                return Ok(());
            }

            if let Some(first) = state.proposal.clone() {
                if first.block.block_id != proposal.block.block_id {
                    state.invalid = true;
                    drop(state);
                    self.violations.on_double_propose_detected(&first, proposal);
                }
                return Ok(());
            }

            // Claim the view for this proposal. A concurrent proposal for the same block is now a
            // repeat, and one for another block is a double proposal.
            state.proposal = Some(proposal.clone());
        }

        let created = self.factory.create(proposal);

        let (processor, cached_votes) = {
            let mut state = self.state.lock();
            let processor = match created {
                Ok(processor) => processor,
                Err(err) if err.is_invalid_proposal() => {
                    state.invalid = true;
                    let votes = state.votes_cache.votes_for_block(&proposal.block.block_id);
                    drop(state);
                    self.violations.on_invalid_block_detected(&err);
                    for vote in votes {
                        self.violations
                            .on_vote_for_invalid_block_detected(&vote, proposal);
                    }
                    return Ok(());
                }
                Err(err) => {
                    // Release the claim so that the proposal can be processed again.
                    if !state.invalid {
                        state.proposal = None;
                    }
                    return Err(err.into());
                }
            };

            // A conflicting proposal arrived while the processor was being created.
            if state.invalid {
                return Ok(());
            }

            // The factory already processed the proposer's vote. Cache it so that the same vote
            // arriving separately is recognized as a repeat.
            let proposer_vote = proposal.proposer_vote();
            let double_vote = match state.votes_cache.add_vote(&proposer_vote) {
                Err(VotesCacheError::DoubleVote { first }) => Some(first),
                _ => None,
            };

            state.processor = Some(processor.clone());

            let cached_votes: Vec<Vote> = state
                .votes_cache
                .votes_for_block(&proposal.block.block_id)
                .into_iter()
                .filter(|vote| vote.signer_id != proposal.block.proposer_id)
                .collect();
            drop(state);

            if let Some(first) = double_vote {
                self.violations
                    .on_double_voting_detected(&first, &proposer_vote);
            }
            (processor, cached_votes)
        };

        log::debug!(
            "replaying {} cached votes for block {} in view {}",
            cached_votes.len(),
            proposal.block.block_id,
            self.view
        );
        for vote in cached_votes {
            match self.process_vote(processor.as_ref(), &vote) {
                Ok(()) => (),
                Err(err) if err.is_invalid_vote() => (),
                Err(err) => return Err(ProposalError::CachedVote(err)),
            }
        }

        Ok(())
    }

    fn process_vote(&self, processor: &dyn VoteProcessor, vote: &Vote) -> Result<(), VoteError> {
        match processor.process(vote) {
            Err(VoteError::InvalidVote(err)) => {
                self.violations.on_invalid_vote_detected(&err);
                Err(VoteError::InvalidVote(err))
            }
            result => result,
        }
    }
}
