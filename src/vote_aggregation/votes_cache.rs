/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-view cache of every vote received, used to detect double voting and to hold votes until the
//! proposal they are for arrives.

use std::collections::HashMap;

use crate::{
    hotstuff::messages::Vote,
    types::basic::{Identifier, ViewNumber},
};

/// Observer of the votes received for a view. Called once for every distinct vote.
pub type VoteConsumer = Box<dyn Fn(&Vote) + Send + Sync>;

pub(crate) struct VotesCache {
    view: ViewNumber,
    // Votes in the order they were received.
    votes: Vec<Vote>,
    by_signer: HashMap<Identifier, usize>,
    consumers: Vec<VoteConsumer>,
}

impl VotesCache {
    pub(crate) fn new(view: ViewNumber) -> VotesCache {
        VotesCache {
            view,
            votes: Vec::new(),
            by_signer: HashMap::new(),
            consumers: Vec::new(),
        }
    }

    /// Cache `vote` and hand it to the registered vote consumers.
    ///
    /// A vote identical to one already cached yields [VotesCacheError::RepeatedVote]. A different vote
    /// from a signer that already voted in this view yields [VotesCacheError::DoubleVote], carrying the
    /// first vote.
    pub(crate) fn add_vote(&mut self, vote: &Vote) -> Result<(), VotesCacheError> {
        if vote.view != self.view {
            return Err(VotesCacheError::VoteForIncompatibleView);
        }

        if let Some(pos) = self.by_signer.get(&vote.signer_id) {
            let first = &self.votes[*pos];
            if first == vote {
                return Err(VotesCacheError::RepeatedVote);
            }
            return Err(VotesCacheError::DoubleVote {
                first: first.clone(),
            });
        }

        self.by_signer.insert(vote.signer_id, self.votes.len());
        self.votes.push(vote.clone());
        self.consumers.iter().for_each(|consumer| consumer(vote));

        Ok(())
    }

    /// Register `consumer`, first replaying every vote cached so far to it.
    pub(crate) fn register_vote_consumer(&mut self, consumer: VoteConsumer) {
        self.votes.iter().for_each(|vote| consumer(vote));
        self.consumers.push(consumer);
    }

    pub(crate) fn votes_for_block(&self, block_id: &Identifier) -> Vec<Vote> {
        self.votes
            .iter()
            .filter(|vote| vote.block_id == *block_id)
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.votes.len()
    }
}

#[derive(Debug)]
pub(crate) enum VotesCacheError {
    VoteForIncompatibleView,
    RepeatedVote,
    DoubleVote { first: Vote },
}
