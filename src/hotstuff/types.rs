/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of types specific to HotStuff vote aggregation.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::Verifier;

use super::messages::vote_message_bytes;
use crate::{
    committee::weight_threshold_to_build_qc,
    types::{
        basic::*,
        identities::{IdentityList, Signature},
        signer_indices::SignerIndices,
    },
};

/// Length of a single Ed25519 signature inside a [QuorumCertificate]'s `sig_data`.
pub const SIGNATURE_LEN: usize = 64;

/// Proof that at least a quorum (by weight) of the committee voted for `block_id` in `view`.
///
/// At most one quorum certificate is ever built for a given `(view, block_id)` pair by a vote
/// processor.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct QuorumCertificate {
    pub view: ViewNumber,
    pub block_id: Identifier,
    pub signer_indices: SignerIndices,
    pub sig_data: SigData,
}

impl QuorumCertificate {
    /// Checks if all of the signatures in the certificate are correct, and if the signers form a quorum
    /// of `participants`.
    ///
    /// `sig_data` must hold one signature per signer, concatenated in the canonical order of the signers.
    pub fn is_correct(&self, participants: &IdentityList) -> bool {
        let signers = match self.signer_indices.decode(participants) {
            Ok(signers) => signers,
            Err(_) => return false,
        };

        if signers.is_empty() || self.sig_data.len() != signers.len() * SIGNATURE_LEN {
            return false;
        }

        let message = match vote_message_bytes(self.view, &self.block_id) {
            Ok(message) => message,
            Err(_) => return false,
        };
        let mut total_weight = Weight::zero();
        for (signer, signature) in signers
            .iter()
            .zip(self.sig_data.bytes().chunks_exact(SIGNATURE_LEN))
        {
            let identity = match participants.get(signer) {
                Some(identity) => identity,
                None => return false,
            };
            let signature = match Signature::from_slice(signature) {
                Ok(signature) => signature,
                Err(_) => return false,
            };
            if identity.verifying_key.verify(&message, &signature).is_err() {
                return false;
            }
            total_weight += identity.weight;
        }

        total_weight >= weight_threshold_to_build_qc(participants.total_weight())
    }
}

/// Lifecycle status of a vote collector and of the vote processor it owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoteCollectorStatus {
    /// No proposal has been received for the view yet; votes are only cached.
    Caching,

    /// A valid proposal has been received; votes for it are verified and accumulated.
    Verifying,

    /// Building the quorum certificate has been claimed. Further votes are no-ops.
    Done,

    /// The proposal for the view was invalid, or the leader equivocated.
    Invalid,
}

impl Display for VoteCollectorStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let status = match self {
            VoteCollectorStatus::Caching => "Caching",
            VoteCollectorStatus::Verifying => "Verifying",
            VoteCollectorStatus::Done => "Done",
            VoteCollectorStatus::Invalid => "Invalid",
        };
        f.write_str(status)
    }
}
