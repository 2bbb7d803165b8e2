/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Compact encoding of a set of signers relative to a canonical list of participants.
//!
//! ## Encoding
//!
//! ```text
//! checksum (4 bytes) ++ bit vector (ceil(n / 8) bytes)
//! ```
//!
//! - The checksum is the first four bytes of the SHA-256 hash over the concatenation of the node IDs
//!   of all `n` participants, in canonical order. It lets the decoder detect that it is decoding
//!   against a different participant list than the encoder used.
//! - Bit `i` of the bit vector (most significant bit of each byte first) is set iff the `i`-th
//!   participant in canonical order is a signer. Padding bits in the last byte must be zero.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use super::{basic::Identifier, identities::IdentityList};

pub const CHECKSUM_LEN: usize = 4;

/// Bytes-encoding of the signers of a [quorum certificate](crate::hotstuff::types::QuorumCertificate).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct SignerIndices(Vec<u8>);

impl SignerIndices {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode `signers` as a subset of `participants`.
    ///
    /// Fails if one of the signers is not a participant.
    pub fn encode(
        participants: &IdentityList,
        signers: &[Identifier],
    ) -> Result<SignerIndices, SignerIndicesError> {
        let mut bytes = Vec::with_capacity(CHECKSUM_LEN + bit_vector_len(participants.len()));
        bytes.extend_from_slice(&checksum(participants));
        bytes.resize(CHECKSUM_LEN + bit_vector_len(participants.len()), 0);

        for signer in signers {
            let pos = participants
                .position(signer)
                .ok_or(SignerIndicesError::UnknownSigner { signer: *signer })?;
            bytes[CHECKSUM_LEN + pos / 8] |= 1 << (7 - pos % 8);
        }

        Ok(SignerIndices(bytes))
    }

    /// Decode the signers, in canonical order, that this value encodes relative to `participants`.
    pub fn decode(&self, participants: &IdentityList) -> Result<Vec<Identifier>, SignerIndicesError> {
        let expected_len = CHECKSUM_LEN + bit_vector_len(participants.len());
        if self.0.len() != expected_len {
            return Err(SignerIndicesError::InvalidLength {
                expected: expected_len,
                actual: self.0.len(),
            });
        }

        if self.0[..CHECKSUM_LEN] != checksum(participants) {
            return Err(SignerIndicesError::ChecksumMismatch);
        }

        let bit_vector = &self.0[CHECKSUM_LEN..];
        let padding_bits = bit_vector.len() * 8 - participants.len();
        if padding_bits > 0 {
            let last = bit_vector[bit_vector.len() - 1];
            if last & ((1u8 << padding_bits) - 1) != 0 {
                return Err(SignerIndicesError::IllegallyPaddedBits);
            }
        }

        Ok(participants
            .iter()
            .enumerate()
            .filter(|(pos, _)| bit_vector[pos / 8] & (1 << (7 - pos % 8)) != 0)
            .map(|(_, identity)| identity.node_id)
            .collect())
    }
}

fn bit_vector_len(participants: usize) -> usize {
    (participants + 7) / 8
}

fn checksum(participants: &IdentityList) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha256::new();
    for identity in participants.iter() {
        hasher.update(identity.node_id.bytes());
    }
    let digest = hasher.finalize();
    let mut checksum = [0u8; CHECKSUM_LEN];
    checksum.copy_from_slice(&digest[..CHECKSUM_LEN]);
    checksum
}

/// The ways encoding or decoding [SignerIndices] can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerIndicesError {
    #[error("signer {signer} is not a participant")]
    UnknownSigner { signer: Identifier },

    #[error("signer indices have length {actual}, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("signer indices checksum does not match the participant list")]
    ChecksumMismatch,

    #[error("signer indices have non-zero padding bits")]
    IllegallyPaddedBits,
}
