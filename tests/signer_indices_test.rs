use log::LevelFilter;
use quorum_core::{
    hotstuff::{
        messages::Vote,
        types::{QuorumCertificate, SIGNATURE_LEN},
    },
    types::{
        basic::{Identifier, SigData, ViewNumber},
        signer_indices::{SignerIndices, SignerIndicesError, CHECKSUM_LEN},
    },
};

mod common;

use crate::common::{fixtures::TestCommittee, logging::setup_logger};

#[test]
fn encode_and_decode_signers_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(10, 1);
    let participants = committee.identities.node_ids();

    let signers = vec![participants[9], participants[0], participants[4]];
    let indices = SignerIndices::encode(&committee.identities, &signers).unwrap();
    assert_eq!(indices.bytes().len(), CHECKSUM_LEN + 2);

    // Decoding yields the signers in canonical order.
    let decoded = indices.decode(&committee.identities).unwrap();
    assert_eq!(decoded, vec![participants[0], participants[4], participants[9]]);

    let empty = SignerIndices::encode(&committee.identities, &[]).unwrap();
    assert!(empty.decode(&committee.identities).unwrap().is_empty());
}

#[test]
fn unknown_signer_is_rejected_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let outsider = Identifier::new([7u8; 32]);

    let err = SignerIndices::encode(&committee.identities, &[outsider]).unwrap_err();
    assert_eq!(err, SignerIndicesError::UnknownSigner { signer: outsider });
}

#[test]
fn decoding_against_other_participants_fails_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let other_committee = TestCommittee::new(4, 1);
    let signers = committee.identities.node_ids();

    let indices = SignerIndices::encode(&committee.identities, &signers).unwrap();
    assert_eq!(
        indices.decode(&other_committee.identities).unwrap_err(),
        SignerIndicesError::ChecksumMismatch
    );

    let larger_committee = TestCommittee::new(9, 1);
    assert_eq!(
        indices.decode(&larger_committee.identities).unwrap_err(),
        SignerIndicesError::InvalidLength {
            expected: CHECKSUM_LEN + 2,
            actual: CHECKSUM_LEN + 1,
        }
    );
}

#[test]
fn non_zero_padding_is_rejected_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let signers = vec![committee.identities.node_ids()[1]];
    let indices = SignerIndices::encode(&committee.identities, &signers).unwrap();

    // With 4 participants, the low 4 bits of the only bit vector byte are padding.
    let mut bytes = indices.bytes().to_vec();
    bytes[CHECKSUM_LEN] |= 0b0000_0001;
    let tampered = SignerIndices::new(bytes);

    assert_eq!(
        tampered.decode(&committee.identities).unwrap_err(),
        SignerIndicesError::IllegallyPaddedBits
    );
}

#[test]
fn quorum_certificate_without_quorum_is_not_correct_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let block = committee.block(8, 0, 1);
    let participants = committee.identities.node_ids();

    // Sign with the members in canonical order, so that signatures line up with decoded signers.
    let sign = |count: usize| -> QuorumCertificate {
        let signers: Vec<Identifier> = participants[..count].to_vec();
        let mut sig_data = Vec::with_capacity(count * SIGNATURE_LEN);
        for signer in &signers {
            let member = (0..4).find(|member| committee.node_id(*member) == *signer).unwrap();
            let vote = Vote::new(&committee.keys[member], ViewNumber::new(8), block.block_id).unwrap();
            sig_data.extend_from_slice(&vote.sig_data.bytes());
        }
        QuorumCertificate {
            view: ViewNumber::new(8),
            block_id: block.block_id,
            signer_indices: SignerIndices::encode(&committee.identities, &signers).unwrap(),
            sig_data: SigData::new(sig_data),
        }
    };

    assert!(sign(3).is_correct(&committee.identities));
    assert!(!sign(2).is_correct(&committee.identities));

    // Signatures and signers must agree in number.
    let mut truncated = sign(3);
    truncated.sig_data = SigData::new(truncated.sig_data.bytes()[..2 * SIGNATURE_LEN].to_vec());
    assert!(!truncated.is_correct(&committee.identities));
}
