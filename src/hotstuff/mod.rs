/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Messages and certificates of the HotStuff voting round.
//!
//! In every view, the leader proposes a [block](crate::types::block::Block). Committee members that
//! accept the proposal send a [Vote](messages::Vote) for it to the next leader, who collects the
//! votes (see [`vote_aggregation`](crate::vote_aggregation)) and, once votes from more than two thirds
//! of the committee's weight are in, combines them into a
//! [QuorumCertificate](types::QuorumCertificate). The proposer's signature on its proposal counts as
//! its own vote.

pub mod messages;

pub mod types;
