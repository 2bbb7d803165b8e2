use std::sync::Arc;

use log::LevelFilter;
use quorum_core::{
    committee::{Committee, CommitteeError},
    hotstuff::types::VoteCollectorStatus,
    types::{
        basic::{Identifier, ViewNumber, Weight},
        identities::IdentityList,
    },
    vote_aggregation::{
        errors::FactoryError,
        factory::{StakingVoteProcessorFactory, VoteProcessorFactory},
    },
};

mod common;

use crate::common::{
    fixtures::{QCSink, TestCommittee},
    logging::setup_logger,
};

/// A committee service that knows of no epoch.
struct UnavailableCommittee;

impl Committee for UnavailableCommittee {
    fn identities_by_block(&self, block_id: &Identifier) -> Result<IdentityList, CommitteeError> {
        Err(CommitteeError::UnknownBlock { block_id: *block_id })
    }

    fn identities_by_view(&self, view: ViewNumber) -> Result<IdentityList, CommitteeError> {
        Err(CommitteeError::UnknownEpoch { view })
    }

    fn quorum_threshold_for_view(&self, view: ViewNumber) -> Result<Weight, CommitteeError> {
        Err(CommitteeError::UnknownEpoch { view })
    }
}

#[test]
fn valid_proposal_creates_processor_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let factory = StakingVoteProcessorFactory::new(committee.committee(), qcs.callback());
    let block = committee.block(2, 1, 1);

    let processor = factory.create(&committee.proposal(&block)).unwrap();
    assert_eq!(processor.block(), &block);
    assert_eq!(processor.status(), VoteCollectorStatus::Verifying);

    processor.process(&committee.vote(0, &block)).unwrap();
    processor.process(&committee.vote(2, &block)).unwrap();
    assert_eq!(processor.status(), VoteCollectorStatus::Done);
    assert_eq!(qcs.len(), 1);
}

#[test]
fn proposer_vote_alone_can_build_qc_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(1, 10);
    let qcs = QCSink::new();
    let factory = StakingVoteProcessorFactory::new(committee.committee(), qcs.callback());
    let block = committee.block(1, 0, 1);

    let processor = factory.create(&committee.proposal(&block)).unwrap();
    assert_eq!(processor.status(), VoteCollectorStatus::Done);

    let qcs = qcs.qcs();
    assert_eq!(qcs.len(), 1);
    assert!(qcs[0].is_correct(&committee.identities));
}

#[test]
fn badly_signed_proposal_is_invalid_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let factory = StakingVoteProcessorFactory::new(committee.committee(), qcs.callback());
    let block = committee.block(2, 1, 1);

    let mut proposal = committee.proposal(&block);
    proposal.sig_data = committee.vote(1, &committee.block(2, 1, 2)).sig_data;

    let err = factory.create(&proposal).err().unwrap();
    assert!(err.is_invalid_proposal());
    match err {
        FactoryError::InvalidProposal { proposal: invalid, source } => {
            assert_eq!(*invalid, proposal);
            assert!(source.source.is_invalid_signature());
        }
        _ => panic!("expected an invalid proposal error"),
    }
}

#[test]
fn proposal_from_non_member_is_invalid_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let outsider = TestCommittee::new(1, 1);
    let qcs = QCSink::new();
    let factory = StakingVoteProcessorFactory::new(committee.committee(), qcs.callback());

    let block = outsider.block(2, 0, 1);
    let err = factory.create(&outsider.proposal(&block)).err().unwrap();
    match err {
        FactoryError::InvalidProposal { source, .. } => assert!(source.source.is_invalid_signer()),
        _ => panic!("expected an invalid proposal error"),
    }
}

#[test]
fn committee_failure_is_not_invalid_proposal_test() {
    setup_logger(LevelFilter::Trace);
    let committee = TestCommittee::new(4, 1);
    let qcs = QCSink::new();
    let factory = StakingVoteProcessorFactory::new(Arc::new(UnavailableCommittee), qcs.callback());
    let block = committee.block(2, 1, 1);

    let err = factory.create(&committee.proposal(&block)).err().unwrap();
    assert!(!err.is_invalid_proposal());
    assert!(matches!(
        err,
        FactoryError::Committee(CommitteeError::UnknownBlock { .. })
    ));
}
