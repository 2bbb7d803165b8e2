/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the [Block] and [Proposal] types and their associated methods.

use std::io;

use borsh::{BorshDeserialize, BorshSerialize};
pub use sha2::Sha256 as CryptoHasher;
use sha2::Digest;

use crate::hotstuff::messages::Vote;
use crate::types::basic::*;

/// The part of a block that vote aggregation cares about. A vote processor is bound to exactly one
/// `Block` for its whole lifetime.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Block {
    pub block_id: Identifier,
    pub view: ViewNumber,
    pub parent_id: Identifier,
    pub proposer_id: Identifier,
    pub payload_hash: Identifier,
}

impl Block {
    pub fn new(
        view: ViewNumber,
        parent_id: Identifier,
        proposer_id: Identifier,
        payload_hash: Identifier,
    ) -> io::Result<Block> {
        Ok(Block {
            block_id: Block::hash(view, &parent_id, &proposer_id, &payload_hash)?,
            view,
            parent_id,
            proposer_id,
            payload_hash,
        })
    }

    pub fn hash(
        view: ViewNumber,
        parent_id: &Identifier,
        proposer_id: &Identifier,
        payload_hash: &Identifier,
    ) -> io::Result<Identifier> {
        let mut hasher = CryptoHasher::new();
        hasher.update(&view.try_to_vec()?);
        hasher.update(&parent_id.try_to_vec()?);
        hasher.update(&proposer_id.try_to_vec()?);
        hasher.update(&payload_hash.try_to_vec()?);
        Ok(Identifier::new(hasher.finalize().into()))
    }

    /// Checks that `block_id` is the hash of the block's other fields.
    pub fn is_correct(&self) -> bool {
        matches!(
            Block::hash(self.view, &self.parent_id, &self.proposer_id, &self.payload_hash),
            Ok(hash) if hash == self.block_id
        )
    }
}

/// A block as proposed by its leader, together with the leader's signature over it.
///
/// The proposer's signature doubles as the proposer's own vote for the block, see
/// [Proposal::proposer_vote].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    pub block: Block,
    pub sig_data: SignatureBytes,
}

impl Proposal {
    pub fn new(block: Block, sig_data: SignatureBytes) -> Proposal {
        Proposal { block, sig_data }
    }

    pub fn view(&self) -> ViewNumber {
        self.block.view
    }

    pub fn proposer_vote(&self) -> Vote {
        Vote {
            block_id: self.block.block_id,
            view: self.block.view,
            signer_id: self.block.proposer_id,
            sig_data: self.sig_data,
        }
    }
}
