/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the structured messages that committee members send to vote for blocks.

use std::io;

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signer, SigningKey, Verifier};

use crate::types::{basic::*, identities::{Signature, VerifyingKey}};

/// A committee member's vote for the block `block_id` proposed in `view`.
///
/// Votes are immutable once created, and are consumed once by a
/// [vote processor](crate::vote_aggregation::processor::VoteProcessor).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Vote {
    pub block_id: Identifier,
    pub view: ViewNumber,
    pub signer_id: Identifier,
    pub sig_data: SignatureBytes,
}

impl Vote {
    /// Create a vote for `block_id` in `view`, signed by `signer`. The signer ID of the vote is the
    /// bytes of the signer's verifying key.
    pub fn new(signer: &SigningKey, view: ViewNumber, block_id: Identifier) -> io::Result<Vote> {
        let signature = signer.sign(&vote_message_bytes(view, &block_id)?);
        Ok(Vote {
            block_id,
            view,
            signer_id: Identifier::new(signer.verifying_key().to_bytes()),
            sig_data: SignatureBytes::new(signature.to_bytes()),
        })
    }

    /// The values that the vote's signature is over.
    pub fn message_bytes(&self) -> io::Result<Vec<u8>> {
        vote_message_bytes(self.view, &self.block_id)
    }

    /// Verifies the vote's signature against `pk`.
    pub fn is_correct(&self, pk: &VerifyingKey) -> bool {
        let signature = Signature::from_bytes(&self.sig_data.bytes());
        match self.message_bytes() {
            Ok(message) => pk.verify(&message, &signature).is_ok(),
            Err(_) => false,
        }
    }
}

/// The bytes that a vote for `block_id` in `view` signs over: the Borsh encoding of `(view, block_id)`.
pub fn vote_message_bytes(view: ViewNumber, block_id: &Identifier) -> io::Result<Vec<u8>> {
    (view, *block_id).try_to_vec()
}
