/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [WeightedSignatureAggregator] trait, and [Ed25519SignatureAggregator], its implementation over
//! Ed25519 signatures.

use std::collections::BTreeMap;

use ed25519_dalek::Verifier;
use parking_lot::RwLock;

use crate::types::{
    basic::{Identifier, SigData, SignatureBytes, Weight},
    identities::{IdentityList, Signature},
};

/// Verifies and accumulates the signatures of committee members over a single message, keeping track
/// of the total weight of the signers added so far.
///
/// Implementations must be safe for concurrent use: several threads may call `verify` and
/// `trusted_add` on the same aggregator at once.
pub trait WeightedSignatureAggregator: Send + Sync {
    /// Check `sig` against the message and the verifying key of `signer`.
    ///
    /// Expected errors: [SignatureError::InvalidSigner] if `signer` is not a participant, and
    /// [SignatureError::InvalidSignature] if the signature does not verify.
    fn verify(&self, signer: &Identifier, sig: &SignatureBytes) -> Result<(), SignatureError>;

    /// Add a signature that has already been [verified](Self::verify), returning the total weight of
    /// all signers added so far.
    fn trusted_add(&self, signer: &Identifier, sig: &SignatureBytes) -> Result<Weight, SignatureError>;

    /// Total weight of all signers added so far.
    fn total_weight(&self) -> Weight;

    /// Combine the added signatures. Returns the signers in canonical order, and the combined signature.
    fn aggregate(&self) -> Result<(Vec<Identifier>, SigData), SignatureError>;
}

/// A [WeightedSignatureAggregator] for Ed25519 signatures.
///
/// Ed25519 signatures cannot be compressed into one, so "aggregating" here means concatenating the
/// signatures in the canonical order of their signers.
pub struct Ed25519SignatureAggregator {
    participants: IdentityList,
    message: Vec<u8>,
    state: RwLock<AggregatorState>,
}

#[derive(Default)]
struct AggregatorState {
    signatures: BTreeMap<Identifier, SignatureBytes>,
    total_weight: Weight,
}

impl Ed25519SignatureAggregator {
    pub fn new(participants: IdentityList, message: Vec<u8>) -> Ed25519SignatureAggregator {
        Ed25519SignatureAggregator {
            participants,
            message,
            state: RwLock::new(AggregatorState::default()),
        }
    }
}

impl WeightedSignatureAggregator for Ed25519SignatureAggregator {
    fn verify(&self, signer: &Identifier, sig: &SignatureBytes) -> Result<(), SignatureError> {
        let identity = self
            .participants
            .get(signer)
            .ok_or(SignatureError::InvalidSigner { signer: *signer })?;

        let signature = Signature::from_bytes(&sig.bytes());
        identity
            .verifying_key
            .verify(&self.message, &signature)
            .map_err(|_| SignatureError::InvalidSignature { signer: *signer })
    }

    fn trusted_add(&self, signer: &Identifier, sig: &SignatureBytes) -> Result<Weight, SignatureError> {
        let weight = self
            .participants
            .weight(signer)
            .ok_or(SignatureError::InvalidSigner { signer: *signer })?;

        let mut state = self.state.write();
        if state.signatures.contains_key(signer) {
            return Err(SignatureError::DuplicatedSigner { signer: *signer });
        }
        state.signatures.insert(*signer, *sig);
        state.total_weight += weight;

        Ok(state.total_weight)
    }

    fn total_weight(&self) -> Weight {
        self.state.read().total_weight
    }

    fn aggregate(&self) -> Result<(Vec<Identifier>, SigData), SignatureError> {
        let state = self.state.read();
        if state.signatures.is_empty() {
            return Err(SignatureError::InsufficientSignatures);
        }

        // BTreeMap iterates in ascending order of node ID, i.e., canonical order.
        let mut signers = Vec::with_capacity(state.signatures.len());
        let mut sig_data = Vec::with_capacity(state.signatures.len() * 64);
        for (signer, signature) in state.signatures.iter() {
            signers.push(*signer);
            sig_data.extend_from_slice(&signature.bytes());
        }

        Ok((signers, SigData::new(sig_data)))
    }
}

/// The ways a [WeightedSignatureAggregator] call can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The signer is not a participant of the committee the aggregator was built for.
    #[error("{signer} is not a valid signer")]
    InvalidSigner { signer: Identifier },

    /// The signature does not verify against the message and the signer's key.
    #[error("invalid signature from {signer}")]
    InvalidSignature { signer: Identifier },

    /// A signature from the signer has already been added.
    #[error("signature from {signer} was already added")]
    DuplicatedSigner { signer: Identifier },

    /// `aggregate` was called before any signature was added.
    #[error("no signatures to aggregate")]
    InsufficientSignatures,

    /// Any other failure of the aggregator's implementation.
    #[error("signature aggregator failure: {0}")]
    Internal(String),
}

impl SignatureError {
    pub fn is_invalid_signer(&self) -> bool {
        matches!(self, SignatureError::InvalidSigner { .. })
    }

    pub fn is_invalid_signature(&self) -> bool {
        matches!(self, SignatureError::InvalidSignature { .. })
    }
}
