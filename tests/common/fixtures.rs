use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use quorum_core::{
    committee::{Committee, StaticCommittee},
    hotstuff::{messages::Vote, types::QuorumCertificate},
    types::{
        basic::{Identifier, ViewNumber, Weight},
        block::{Block, Proposal},
        identities::{Identity, IdentityList, SigningKey},
    },
    vote_aggregation::{
        errors::{FactoryError, InvalidVoteError},
        processor::OnQCCreated,
        violations::ViolationConsumer,
    },
};
use rand_core::OsRng;

/// A committee of freshly generated Ed25519 keys.
pub(crate) struct TestCommittee {
    pub(crate) keys: Vec<SigningKey>,
    pub(crate) identities: IdentityList,
}

impl TestCommittee {
    /// Create a committee of `size` members, each with weight `weight`.
    pub(crate) fn new(size: usize, weight: u64) -> TestCommittee {
        let mut csprg = OsRng {};
        let keys: Vec<SigningKey> = (0..size).map(|_| SigningKey::generate(&mut csprg)).collect();
        let identities = keys
            .iter()
            .map(|key| Identity::new(key.verifying_key(), Weight::new(weight)))
            .collect();
        TestCommittee { keys, identities }
    }

    pub(crate) fn committee(&self) -> Arc<dyn Committee> {
        Arc::new(StaticCommittee::new(self.identities.clone()))
    }

    pub(crate) fn node_id(&self, member: usize) -> Identifier {
        Identifier::new(self.keys[member].verifying_key().to_bytes())
    }

    /// A block proposed by `proposer` in `view`. Blocks with different `payload`s have different IDs.
    pub(crate) fn block(&self, view: u64, proposer: usize, payload: u8) -> Block {
        Block::new(
            ViewNumber::new(view),
            Identifier::zero(),
            self.node_id(proposer),
            Identifier::new([payload; 32]),
        )
        .unwrap()
    }

    /// A proposal of `block`, signed by its proposer.
    pub(crate) fn proposal(&self, block: &Block) -> Proposal {
        let proposer = self
            .keys
            .iter()
            .position(|key| Identifier::new(key.verifying_key().to_bytes()) == block.proposer_id)
            .unwrap();
        Proposal::new(block.clone(), self.vote(proposer, block).sig_data)
    }

    pub(crate) fn vote(&self, member: usize, block: &Block) -> Vote {
        Vote::new(&self.keys[member], block.view, block.block_id).unwrap()
    }
}

/// Collects the quorum certificates handed to the `on_qc_created` callback it creates.
#[derive(Clone, Default)]
pub(crate) struct QCSink {
    qcs: Arc<Mutex<Vec<QuorumCertificate>>>,
}

impl QCSink {
    pub(crate) fn new() -> QCSink {
        QCSink::default()
    }

    pub(crate) fn callback(&self) -> OnQCCreated {
        let qcs = self.qcs.clone();
        Arc::new(move |qc| qcs.lock().unwrap().push(qc))
    }

    pub(crate) fn qcs(&self) -> Vec<QuorumCertificate> {
        self.qcs.lock().unwrap().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.qcs.lock().unwrap().len()
    }
}

/// Counts the violations reported to it, by kind.
#[derive(Default)]
pub(crate) struct RecordingViolations {
    pub(crate) invalid_votes: AtomicUsize,
    pub(crate) double_votes: AtomicUsize,
    pub(crate) votes_for_invalid_block: AtomicUsize,
    pub(crate) invalid_blocks: AtomicUsize,
    pub(crate) double_proposals: AtomicUsize,
}

impl RecordingViolations {
    pub(crate) fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl ViolationConsumer for RecordingViolations {
    fn on_invalid_vote_detected(&self, _err: &InvalidVoteError) {
        self.invalid_votes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_double_voting_detected(&self, _first: &Vote, _conflicting: &Vote) {
        self.double_votes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_vote_for_invalid_block_detected(&self, _vote: &Vote, _invalid_proposal: &Proposal) {
        self.votes_for_invalid_block.fetch_add(1, Ordering::SeqCst);
    }

    fn on_invalid_block_detected(&self, _err: &FactoryError) {
        self.invalid_blocks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_double_propose_detected(&self, _first: &Proposal, _conflicting: &Proposal) {
        self.double_proposals.fetch_add(1, Ordering::SeqCst);
    }
}
