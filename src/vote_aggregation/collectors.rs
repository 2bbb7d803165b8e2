/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [VoteCollectors]: the registry of [VoteCollector]s, one per view, for the views that are still
//! retained.

use std::{collections::BTreeMap, sync::mpsc::Sender, sync::Arc, time::SystemTime};

use parking_lot::RwLock;

use crate::{
    events::{Event, InvalidVoteEvent, ReceiveProposalEvent, ReceiveVoteEvent},
    hotstuff::messages::Vote,
    types::{basic::ViewNumber, block::Proposal},
};

use super::{
    collector::VoteCollector,
    errors::{ProposalError, VoteError},
    factory::VoteProcessorFactory,
    violations::ViolationConsumer,
};

pub struct VoteCollectors {
    factory: Arc<dyn VoteProcessorFactory>,
    violations: Arc<dyn ViolationConsumer>,
    event_publisher: Option<Sender<Event>>,
    state: RwLock<CollectorsState>,
}

struct CollectorsState {
    lowest_retained_view: ViewNumber,
    collectors: BTreeMap<ViewNumber, Arc<VoteCollector>>,
}

impl VoteCollectors {
    pub fn new(
        lowest_retained_view: ViewNumber,
        factory: Arc<dyn VoteProcessorFactory>,
        violations: Arc<dyn ViolationConsumer>,
        event_publisher: Option<Sender<Event>>,
    ) -> VoteCollectors {
        VoteCollectors {
            factory,
            violations,
            event_publisher,
            state: RwLock::new(CollectorsState {
                lowest_retained_view,
                collectors: BTreeMap::new(),
            }),
        }
    }

    /// Get the collector for `view`, creating it if it does not exist yet. The returned flag is `true`
    /// if the collector was created by this call.
    pub fn get_or_create_collector(
        &self,
        view: ViewNumber,
    ) -> Result<(Arc<VoteCollector>, bool), VoteCollectorsError> {
        {
            let state = self.state.read();
            state.ensure_retained(view)?;
            if let Some(collector) = state.collectors.get(&view) {
                return Ok((collector.clone(), false));
            }
        }

        let mut state = self.state.write();
        // Pruning may have happened between releasing the read lock and taking the write lock.
        state.ensure_retained(view)?;
        if let Some(collector) = state.collectors.get(&view) {
            return Ok((collector.clone(), false));
        }

        let collector = Arc::new(VoteCollector::new(
            view,
            self.factory.clone(),
            self.violations.clone(),
        ));
        state.collectors.insert(view, collector.clone());
        log::debug!("created vote collector for view {}", view);

        Ok((collector, true))
    }

    /// Drop the collectors of every view lower than `view`, and refuse to create collectors for those
    /// views from now on. Calls with a view lower than the current threshold do nothing.
    pub fn prune_up_to_view(&self, view: ViewNumber) {
        let mut state = self.state.write();
        if view <= state.lowest_retained_view {
            return;
        }

        let retained = state.collectors.split_off(&view);
        let pruned = std::mem::replace(&mut state.collectors, retained).len();
        state.lowest_retained_view = view;

        log::debug!(
            "pruned {} vote collectors, lowest retained view is now {}",
            pruned,
            view
        );
    }

    pub fn lowest_retained_view(&self) -> ViewNumber {
        self.state.read().lowest_retained_view
    }

    /// Number of collectors currently retained.
    pub fn len(&self) -> usize {
        self.state.read().collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Route `vote` to the collector of its view.
    ///
    /// Votes for views that have already been pruned are stale, and are dropped.
    pub fn add_vote(&self, vote: &Vote) -> Result<(), VoteError> {
        Event::publish(
            &self.event_publisher,
            Event::ReceiveVote(ReceiveVoteEvent {
                timestamp: SystemTime::now(),
                vote: vote.clone(),
            }),
        );

        let collector = match self.get_or_create_collector(vote.view) {
            Ok((collector, _)) => collector,
            Err(VoteCollectorsError::BelowPrunedThreshold { .. }) => {
                log::debug!(
                    "dropping stale vote from {} for view {}",
                    vote.signer_id,
                    vote.view
                );
                return Ok(());
            }
        };

        let result = collector.add_vote(vote);
        if let Err(VoteError::InvalidVote(err)) = &result {
            Event::publish(
                &self.event_publisher,
                Event::InvalidVote(InvalidVoteEvent {
                    timestamp: SystemTime::now(),
                    vote: err.vote.clone(),
                }),
            );
        }
        result
    }

    /// Route `proposal` to the collector of its view.
    ///
    /// Proposals for views that have already been pruned are stale, and are dropped.
    pub fn process_block(&self, proposal: &Proposal) -> Result<(), ProposalError> {
        Event::publish(
            &self.event_publisher,
            Event::ReceiveProposal(ReceiveProposalEvent {
                timestamp: SystemTime::now(),
                proposal: proposal.clone(),
            }),
        );

        match self.get_or_create_collector(proposal.view()) {
            Ok((collector, _)) => collector.process_block(proposal),
            Err(VoteCollectorsError::BelowPrunedThreshold { .. }) => {
                log::debug!(
                    "dropping stale proposal for block {} in view {}",
                    proposal.block.block_id,
                    proposal.view()
                );
                Ok(())
            }
        }
    }
}

impl CollectorsState {
    fn ensure_retained(&self, view: ViewNumber) -> Result<(), VoteCollectorsError> {
        if view < self.lowest_retained_view {
            return Err(VoteCollectorsError::BelowPrunedThreshold {
                view,
                lowest_retained_view: self.lowest_retained_view,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteCollectorsError {
    #[error("view {view} is below the lowest retained view {lowest_retained_view}")]
    BelowPrunedThreshold {
        view: ViewNumber,
        lowest_retained_view: ViewNumber,
    },
}
