/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the replica's
//! [configuration](crate::config::Configuration).
//!
//! quorum_core logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [CollectQC](crate::events::CollectQCEvent) is printed:
//!
//! ```text
//! CollectQC, 1701329264, fNGCJyk, 12, 3
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the certified block's ID.
//! - The fourth value is the view of the certificate.
//! - The fifth value is the number of signatures in the certificate.

use crate::{events::*, hotstuff::types::SIGNATURE_LEN};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log;
use std::time::SystemTime;

// Names of each event in PascalCase for printing:
pub const RECEIVE_VOTE: &str = "ReceiveVote";
pub const RECEIVE_PROPOSAL: &str = "ReceiveProposal";
pub const COLLECT_QC: &str = "CollectQC";
pub const INVALID_VOTE: &str = "InvalidVote";
pub const SAVE_REGISTERS: &str = "SaveRegisters";
pub const PRUNE_REGISTERS: &str = "PruneRegisters";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for ReceiveVoteEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_vote_event: &ReceiveVoteEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                RECEIVE_VOTE,
                secs_since_unix_epoch(receive_vote_event.timestamp),
                first_seven_base64_chars(&receive_vote_event.vote.signer_id.bytes()),
                first_seven_base64_chars(&receive_vote_event.vote.block_id.bytes()),
                receive_vote_event.vote.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveProposalEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_proposal_event: &ReceiveProposalEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                RECEIVE_PROPOSAL,
                secs_since_unix_epoch(receive_proposal_event.timestamp),
                first_seven_base64_chars(&receive_proposal_event.proposal.block.proposer_id.bytes()),
                first_seven_base64_chars(&receive_proposal_event.proposal.block.block_id.bytes()),
                receive_proposal_event.proposal.block.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for CollectQCEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |collect_qc_event: &CollectQCEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                COLLECT_QC,
                secs_since_unix_epoch(collect_qc_event.timestamp),
                first_seven_base64_chars(&collect_qc_event.quorum_certificate.block_id.bytes()),
                collect_qc_event.quorum_certificate.view,
                collect_qc_event.quorum_certificate.sig_data.len() / SIGNATURE_LEN
            )
        };
        Box::new(logger)
    }
}

impl Logger for InvalidVoteEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |invalid_vote_event: &InvalidVoteEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                INVALID_VOTE,
                secs_since_unix_epoch(invalid_vote_event.timestamp),
                first_seven_base64_chars(&invalid_vote_event.vote.signer_id.bytes()),
                first_seven_base64_chars(&invalid_vote_event.vote.block_id.bytes()),
                invalid_vote_event.vote.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for SaveRegistersEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |save_registers_event: &SaveRegistersEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                SAVE_REGISTERS,
                secs_since_unix_epoch(save_registers_event.timestamp),
                first_seven_base64_chars(&save_registers_event.block_id.bytes()),
                save_registers_event.height,
                save_registers_event.registers
            )
        };
        Box::new(logger)
    }
}

impl Logger for PruneRegistersEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |prune_registers_event: &PruneRegistersEvent| {
            log::info!(
                "{}, {}, {}, {}",
                PRUNE_REGISTERS,
                secs_since_unix_epoch(prune_registers_event.timestamp),
                first_seven_base64_chars(&prune_registers_event.pruned_block.bytes()),
                prune_registers_event.pruned_height
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

// Timestamps before the Unix Epoch are printed as 0.
fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

