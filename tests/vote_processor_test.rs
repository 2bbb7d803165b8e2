use std::{
    sync::{Arc, Barrier},
    thread,
};

use log::LevelFilter;
use quorum_core::{
    committee::weight_threshold_to_build_qc,
    hotstuff::{messages::vote_message_bytes, types::VoteCollectorStatus},
    types::basic::{Identifier, ViewNumber, Weight},
    vote_aggregation::{
        aggregator::{Ed25519SignatureAggregator, SignatureError},
        errors::VoteError,
        processor::{StakingVoteProcessor, VoteProcessor},
    },
};

mod common;

use crate::common::{
    fixtures::{QCSink, TestCommittee},
    logging::setup_logger,
    mock_aggregator::MockAggregator,
};

// A processor for the block proposed by member 0 in view 10, requiring `min_required_weight`.
fn processor_with(
    committee: &TestCommittee,
    aggregator: MockAggregator,
    min_required_weight: u64,
    qcs: &QCSink,
) -> StakingVoteProcessor {
    StakingVoteProcessor::new(
        committee.block(10, 0, 1),
        Box::new(aggregator),
        qcs.callback(),
        Weight::new(min_required_weight),
        committee.identities.clone(),
    )
}

#[test]
fn initial_state_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let processor = processor_with(&committee, MockAggregator::new(1), 3, &qcs);

    assert_eq!(processor.status(), VoteCollectorStatus::Verifying);
    assert_eq!(processor.block(), &committee.block(10, 0, 1));
    assert_eq!(processor.min_required_weight(), Weight::new(3));
    assert_eq!(qcs.len(), 0);
}

#[test]
fn incompatible_votes_are_rejected_before_verify_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let aggregator = MockAggregator::new(1);
    let calls = aggregator.calls();
    let processor = processor_with(&committee, aggregator, 3, &qcs);

    // Vote for the same block ID, but a different view.
    let mut vote = committee.vote(1, processor.block());
    vote.view = ViewNumber::new(11);
    let err = processor.process(&vote).unwrap_err();
    assert!(matches!(err, VoteError::VoteForIncompatibleView { .. }));
    assert!(err.is_incompatible());
    assert!(!err.is_invalid_vote());

    // Vote for a different block in the same view.
    let other_block = committee.block(10, 0, 2);
    let err = processor.process(&committee.vote(1, &other_block)).unwrap_err();
    assert!(matches!(err, VoteError::VoteForIncompatibleBlock { .. }));
    assert!(!err.is_invalid_vote());

    assert_eq!(calls.verify(), 0);
    assert_eq!(processor.status(), VoteCollectorStatus::Verifying);
}

#[test]
fn invalid_signer_and_signature_are_invalid_votes_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();

    let aggregator = MockAggregator::new(1).failing_verify(SignatureError::InvalidSigner {
        signer: committee.node_id(1),
    });
    let processor = processor_with(&committee, aggregator, 3, &qcs);
    let err = processor.process(&committee.vote(1, processor.block())).unwrap_err();
    assert!(err.is_invalid_vote());
    assert!(err.is_invalid_signer());
    assert!(!err.is_invalid_signature());

    let aggregator = MockAggregator::new(1).failing_verify(SignatureError::InvalidSignature {
        signer: committee.node_id(1),
    });
    let processor = processor_with(&committee, aggregator, 3, &qcs);
    let err = processor.process(&committee.vote(1, processor.block())).unwrap_err();
    assert!(err.is_invalid_vote());
    assert!(err.is_invalid_signature());
    assert!(!err.is_invalid_signer());

    assert_eq!(qcs.len(), 0);
}

#[test]
fn unexpected_verify_error_is_not_invalid_vote_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let aggregator = MockAggregator::new(1).failing_verify(SignatureError::Internal("disk on fire".into()));
    let processor = processor_with(&committee, aggregator, 3, &qcs);

    let err = processor.process(&committee.vote(1, processor.block())).unwrap_err();
    assert!(!err.is_invalid_vote());
    assert!(err.is_unexpected());
}

#[test]
fn trusted_add_error_is_unexpected_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let aggregator = MockAggregator::new(1).failing_trusted_add(SignatureError::DuplicatedSigner {
        signer: committee.node_id(1),
    });
    let processor = processor_with(&committee, aggregator, 3, &qcs);

    let err = processor.process(&committee.vote(1, processor.block())).unwrap_err();
    assert!(matches!(err, VoteError::Aggregator(SignatureError::DuplicatedSigner { .. })));
    assert!(!err.is_invalid_vote());
    assert!(err.is_unexpected());
}

#[test]
fn aggregate_error_is_unexpected_and_build_is_not_retried_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let aggregator = MockAggregator::new(1).failing_aggregate(SignatureError::InsufficientSignatures);
    let calls = aggregator.calls();
    let processor = processor_with(&committee, aggregator, 1, &qcs);

    let err = processor.process(&committee.vote(1, processor.block())).unwrap_err();
    assert!(err.is_unexpected());
    assert_eq!(processor.status(), VoteCollectorStatus::Done);

    processor.process(&committee.vote(2, processor.block())).unwrap();
    assert_eq!(calls.aggregate(), 1);
    assert_eq!(qcs.len(), 0);
}

#[test]
fn not_enough_weight_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let aggregator = MockAggregator::new(1);
    let calls = aggregator.calls();
    let processor = processor_with(&committee, aggregator, 3, &qcs);

    processor.process(&committee.vote(0, processor.block())).unwrap();
    processor.process(&committee.vote(1, processor.block())).unwrap();

    assert_eq!(processor.status(), VoteCollectorStatus::Verifying);
    assert_eq!(calls.aggregate(), 0);
    assert_eq!(qcs.len(), 0);
}

#[test]
fn creating_qc_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let aggregator = MockAggregator::new(1);
    let calls = aggregator.calls();
    let processor = processor_with(&committee, aggregator, 3, &qcs);
    let block = processor.block().clone();

    for member in 0..3 {
        processor.process(&committee.vote(member, &block)).unwrap();
    }
    assert_eq!(processor.status(), VoteCollectorStatus::Done);

    // Votes after the QC is built are no-ops.
    let verify_calls = calls.verify();
    processor.process(&committee.vote(3, &block)).unwrap();
    assert_eq!(calls.verify(), verify_calls);
    assert_eq!(processor.status(), VoteCollectorStatus::Done);

    let qcs = qcs.qcs();
    assert_eq!(qcs.len(), 1);
    assert_eq!(qcs[0].view, block.view);
    assert_eq!(qcs[0].block_id, block.block_id);

    let mut expected_signers: Vec<Identifier> = (0..3).map(|member| committee.node_id(member)).collect();
    expected_signers.sort();
    assert_eq!(qcs[0].signer_indices.decode(&committee.identities).unwrap(), expected_signers);
}

#[test]
fn concurrent_votes_build_qc_once_test() {
    setup_logger(LevelFilter::Info);
    let committee = Arc::new(TestCommittee::new(10, 1));
    let qcs = QCSink::new();
    let aggregator = MockAggregator::new(1);
    let calls = aggregator.calls();
    let processor = Arc::new(processor_with(&committee, aggregator, 7, &qcs));
    let barrier = Arc::new(Barrier::new(10));

    let handles: Vec<_> = (0..10)
        .map(|member| {
            let committee = committee.clone();
            let processor = processor.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let vote = committee.vote(member, processor.block());
                barrier.wait();
                processor.process(&vote).unwrap();
            })
        })
        .collect();
    handles.into_iter().for_each(|handle| handle.join().unwrap());

    assert_eq!(processor.status(), VoteCollectorStatus::Done);
    assert_eq!(calls.aggregate(), 1);
    assert_eq!(qcs.len(), 1);

    let signers = qcs.qcs()[0].signer_indices.decode(&committee.identities).unwrap();
    assert!(signers.len() >= 7);
}

#[test]
fn ed25519_qc_verifies_against_committee_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 5);
    let qcs = QCSink::new();
    let block = committee.block(3, 2, 7);
    let min_required_weight = weight_threshold_to_build_qc(committee.identities.total_weight());
    let processor = StakingVoteProcessor::new(
        block.clone(),
        Box::new(Ed25519SignatureAggregator::new(
            committee.identities.clone(),
            vote_message_bytes(block.view, &block.block_id).unwrap(),
        )),
        qcs.callback(),
        min_required_weight,
        committee.identities.clone(),
    );

    // A vote from member 1 signed with member 3's key is invalid.
    let mut forged = committee.vote(3, &block);
    forged.signer_id = committee.node_id(1);
    let err = processor.process(&forged).unwrap_err();
    assert!(err.is_invalid_signature());

    for member in [3, 0, 2] {
        processor.process(&committee.vote(member, &block)).unwrap();
    }

    let qcs = qcs.qcs();
    assert_eq!(qcs.len(), 1);
    assert!(qcs[0].is_correct(&committee.identities));

    // The same certificate does not verify for a different block.
    let mut wrong_block = qcs[0].clone();
    wrong_block.block_id = committee.block(3, 2, 8).block_id;
    assert!(!wrong_block.is_correct(&committee.identities));
}
