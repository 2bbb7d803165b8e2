use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use quorum_core::{
    types::basic::{Identifier, SigData, SignatureBytes, Weight},
    vote_aggregation::aggregator::{SignatureError, WeightedSignatureAggregator},
};

/// Number of times each method of a [MockAggregator] was called.
#[derive(Default)]
pub(crate) struct AggregatorCalls {
    pub(crate) verify: AtomicUsize,
    pub(crate) trusted_add: AtomicUsize,
    pub(crate) aggregate: AtomicUsize,
}

impl AggregatorCalls {
    pub(crate) fn verify(&self) -> usize {
        self.verify.load(Ordering::SeqCst)
    }

    pub(crate) fn aggregate(&self) -> usize {
        self.aggregate.load(Ordering::SeqCst)
    }
}

/// An aggregator that accepts every signature, gives every signer the same weight, and can be told to
/// fail any of its methods.
pub(crate) struct MockAggregator {
    weight_per_signer: Weight,
    verify_error: Option<SignatureError>,
    trusted_add_error: Option<SignatureError>,
    aggregate_error: Option<SignatureError>,
    signers: Mutex<Vec<Identifier>>,
    calls: Arc<AggregatorCalls>,
}

impl MockAggregator {
    pub(crate) fn new(weight_per_signer: u64) -> MockAggregator {
        MockAggregator {
            weight_per_signer: Weight::new(weight_per_signer),
            verify_error: None,
            trusted_add_error: None,
            aggregate_error: None,
            signers: Mutex::new(Vec::new()),
            calls: Arc::new(AggregatorCalls::default()),
        }
    }

    pub(crate) fn failing_verify(mut self, err: SignatureError) -> MockAggregator {
        self.verify_error = Some(err);
        self
    }

    pub(crate) fn failing_trusted_add(mut self, err: SignatureError) -> MockAggregator {
        self.trusted_add_error = Some(err);
        self
    }

    pub(crate) fn failing_aggregate(mut self, err: SignatureError) -> MockAggregator {
        self.aggregate_error = Some(err);
        self
    }

    pub(crate) fn calls(&self) -> Arc<AggregatorCalls> {
        self.calls.clone()
    }
}

impl WeightedSignatureAggregator for MockAggregator {
    fn verify(&self, _signer: &Identifier, _sig: &SignatureBytes) -> Result<(), SignatureError> {
        self.calls.verify.fetch_add(1, Ordering::SeqCst);
        match &self.verify_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn trusted_add(&self, signer: &Identifier, _sig: &SignatureBytes) -> Result<Weight, SignatureError> {
        self.calls.trusted_add.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.trusted_add_error {
            return Err(err.clone());
        }
        let mut signers = self.signers.lock().unwrap();
        signers.push(*signer);
        Ok(Weight::new(self.weight_per_signer.int() * signers.len() as u64))
    }

    fn total_weight(&self) -> Weight {
        Weight::new(self.weight_per_signer.int() * self.signers.lock().unwrap().len() as u64)
    }

    fn aggregate(&self) -> Result<(Vec<Identifier>, SigData), SignatureError> {
        self.calls.aggregate.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.aggregate_error {
            return Err(err.clone());
        }
        let mut signers = self.signers.lock().unwrap().clone();
        signers.sort();
        let sig_data = SigData::new(vec![0u8; signers.len() * 64]);
        Ok((signers, sig_data))
    }
}
