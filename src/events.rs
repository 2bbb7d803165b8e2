/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by vote aggregation and the register store, for event handling
//! and logging.
//!
//! Note: an event for a given action indicates that the action has been completed.

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::{
    hotstuff::{messages::Vote, types::QuorumCertificate},
    types::{
        basic::{BlockHeight, Identifier},
        block::Proposal,
    },
};

pub enum Event {
    // Events that involve receiving a message.
    ReceiveVote(ReceiveVoteEvent),
    ReceiveProposal(ReceiveProposalEvent),
    // Vote aggregation outcomes.
    CollectQC(CollectQCEvent),
    InvalidVote(InvalidVoteEvent),
    // Events that change the register store.
    SaveRegisters(SaveRegistersEvent),
    PruneRegisters(PruneRegistersEvent),
}

impl Event {
    /// Send `event` on `event_publisher` if there is one.
    ///
    /// Events are dropped silently once the event bus has shut down.
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            let _ = event_publisher.send(event);
        }
    }
}

pub struct ReceiveVoteEvent {
    pub timestamp: SystemTime,
    pub vote: Vote,
}

pub struct ReceiveProposalEvent {
    pub timestamp: SystemTime,
    pub proposal: Proposal,
}

pub struct CollectQCEvent {
    pub timestamp: SystemTime,
    pub quorum_certificate: QuorumCertificate,
}

pub struct InvalidVoteEvent {
    pub timestamp: SystemTime,
    pub vote: Vote,
}

pub struct SaveRegistersEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub block_id: Identifier,
    pub registers: usize,
}

pub struct PruneRegistersEvent {
    pub timestamp: SystemTime,
    pub pruned_height: BlockHeight,
    pub pruned_block: Identifier,
}
