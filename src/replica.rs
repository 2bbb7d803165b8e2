/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and start a replica's vote aggregation and register storage.
//!
//! They key components of this module are:
//! - The builder-pattern interface to construct a [specification of the replica](ReplicaSpec) with:
//!   1. `ReplicaSpec::builder` to construct a `ReplicaSpecBuilder`,
//!   2. The setters of the `ReplicaSpecBuilder`, and
//!   3. The `ReplicaSpecBuilder::build` method to construct a [ReplicaSpec],
//! - The function to [start](ReplicaSpec::start) a [Replica] given its specification,
//! - [The type](Replica) which keeps the replica's components, and its event bus, alive.
//!
//! ## Starting a replica
//!
//! ```ignore
//! let replica =
//!     ReplicaSpec::builder()
//!     .committee(committee)
//!     .configuration(configuration)
//!     .on_qc_created(qc_handler)
//!     .on_collect_qc(collect_qc_handler)
//!     .build()
//!     .start()
//! ```
//!
//! ### Required setters
//!
//! - `.committee(...)`
//! - `.configuration(...)`
//!
//! ### Optional setters
//!
//! - `.on_qc_created(...)`: the consumer of the quorum certificates built by the replica.
//! - `.violation_consumer(...)`: defaults to a [LoggingViolationConsumer].
//!
//! And, for registering user-defined event handlers for events from [crate::events]:
//! - `.on_receive_vote(...)`
//! - `.on_receive_proposal(...)`
//! - `.on_collect_qc(...)`
//! - `.on_invalid_vote(...)`
//! - `.on_save_registers(...)`
//! - `.on_prune_registers(...)`

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::SystemTime;

use typed_builder::TypedBuilder;

use crate::committee::Committee;
use crate::communicator::NodeCommunicator;
use crate::config::Configuration;
use crate::event_bus::*;
use crate::events::*;
use crate::hotstuff::types::QuorumCertificate;
use crate::register_store::{InMemoryRegisterStore, RegistersAsyncStore};
use crate::vote_aggregation::collectors::VoteCollectors;
use crate::vote_aggregation::factory::StakingVoteProcessorFactory;
use crate::vote_aggregation::processor::OnQCCreated;
use crate::vote_aggregation::violations::{LoggingViolationConsumer, ViolationConsumer};

/// Stores all necessary parameters and trait implementations required to start a [Replica].
#[derive(TypedBuilder)]
#[builder(builder_method(doc =
    "
    Create a builder for building a [ReplicaSpec]. On the builder call the following methods to construct a valid [ReplicaSpec].

    Required:
    - `.committee(...)`
    - `.configuration(...)`

    Optional:
    - `.on_qc_created(...)`
    - `.violation_consumer(...)`
    - `.on_receive_vote(...)`
    - `.on_receive_proposal(...)`
    - `.on_collect_qc(...)`
    - `.on_invalid_vote(...)`
    - `.on_save_registers(...)`
    - `.on_prune_registers(...)`
"
))]
pub struct ReplicaSpec {
    // Required parameters
    #[builder(setter(doc = "Set the committee service that reports participants and quorum thresholds. Required."))]
    committee: Arc<dyn Committee>,
    #[builder(setter(doc = "Set the [configuration](Configuration), which contains the necessary parameters to start a replica. Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default, setter(transform = |callback: impl Fn(QuorumCertificate) + Send + Sync + 'static| Some(Arc::new(callback) as OnQCCreated),
    doc = "Set the callback that is handed every quorum certificate the replica builds. Optional."))]
    on_qc_created: Option<OnQCCreated>,
    #[builder(default, setter(strip_option,
    doc = "Set the consumer of the protocol violations detected while aggregating votes. Optional, defaults to logging them."))]
    violation_consumer: Option<Arc<dyn ViolationConsumer>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveVoteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveVoteEvent>),
    doc = "Register a handler closure to be invoked after the replica receives a vote. Optional."))]
    on_receive_vote: Option<HandlerPtr<ReceiveVoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveProposalEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveProposalEvent>),
    doc = "Register a handler closure to be invoked after the replica receives a proposal for a block. Optional."))]
    on_receive_proposal: Option<HandlerPtr<ReceiveProposalEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CollectQCEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CollectQCEvent>),
    doc = "Register a handler closure to be invoked after the replica collects a new quorum certificate. Optional."))]
    on_collect_qc: Option<HandlerPtr<CollectQCEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&InvalidVoteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<InvalidVoteEvent>),
    doc = "Register a handler closure to be invoked after the replica rejects an invalid vote. Optional."))]
    on_invalid_vote: Option<HandlerPtr<InvalidVoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SaveRegistersEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SaveRegistersEvent>),
    doc = "Register a handler closure to be invoked after the registers of an executed block are saved. Optional."))]
    on_save_registers: Option<HandlerPtr<SaveRegistersEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&PruneRegistersEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PruneRegistersEvent>),
    doc = "Register a handler closure to be invoked after the register store is pruned to a finalized block. Optional."))]
    on_prune_registers: Option<HandlerPtr<PruneRegistersEvent>>,
}

impl ReplicaSpec {
    /// Creates the replica's components, starts its event bus thread if any event handlers are
    /// registered, and returns the handles to them in a [Replica] struct.
    pub fn start(self) -> Replica {
        let configuration = self.configuration;

        let event_handlers = EventHandlers::new(
            configuration.log_events,
            self.on_receive_vote,
            self.on_receive_proposal,
            self.on_collect_qc,
            self.on_invalid_vote,
            self.on_save_registers,
            self.on_prune_registers,
        );

        let (event_publisher, event_subscriber) =
            if !event_handlers.is_empty() {
                Some(mpsc::channel()).unzip()
            } else { (None, None) };

        let on_qc_created = collect_qc_publisher(self.on_qc_created, event_publisher.clone());
        let factory = StakingVoteProcessorFactory::new(self.committee, on_qc_created);
        let violation_consumer = self
            .violation_consumer
            .unwrap_or_else(|| Arc::new(LoggingViolationConsumer));

        let vote_collectors = VoteCollectors::new(
            configuration.lowest_retained_view,
            Arc::new(factory),
            violation_consumer,
            event_publisher.clone(),
        );

        let register_store = InMemoryRegisterStore::new(
            configuration.initial_pruned_height,
            configuration.initial_pruned_block,
        )
        .with_event_publisher(event_publisher);

        let communicator = NodeCommunicator::new(
            configuration.circuit_breaker_enabled,
            configuration.max_failed_requests,
        );

        let (event_bus, event_bus_shutdown) = match event_subscriber {
            Some(event_subscriber) => {
                let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
                let event_bus = start_event_bus(event_handlers, event_subscriber, event_bus_shutdown_receiver);
                (Some(event_bus), Some(event_bus_shutdown))
            }
            None => (None, None),
        };

        log::info!(
            "started replica, register store pruned to block {} at height {}",
            configuration.initial_pruned_block,
            configuration.initial_pruned_height
        );

        Replica {
            vote_collectors: Arc::new(vote_collectors),
            register_store: Arc::new(register_store),
            registers_async: Arc::new(RegistersAsyncStore::new()),
            communicator: Arc::new(communicator),
            event_bus,
            event_bus_shutdown,
        }
    }
}

// Wrap the user's QC callback so that every QC built is also published as a CollectQC event.
fn collect_qc_publisher(on_qc_created: Option<OnQCCreated>, event_publisher: Option<Sender<Event>>) -> OnQCCreated {
    Arc::new(move |qc: QuorumCertificate| {
        Event::publish(
            &event_publisher,
            Event::CollectQC(CollectQCEvent {
                timestamp: SystemTime::now(),
                quorum_certificate: qc.clone(),
            }),
        );
        if let Some(on_qc_created) = &on_qc_created {
            on_qc_created(qc)
        }
    })
}

/// A handle to the components of a replica. When this value is dropped, the event bus thread handles
/// the events already published and is then shut down.
pub struct Replica {
    vote_collectors: Arc<VoteCollectors>,
    register_store: Arc<InMemoryRegisterStore>,
    registers_async: Arc<RegistersAsyncStore>,
    communicator: Arc<NodeCommunicator>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl Replica {
    /// The [vote collectors](VoteCollectors) that votes and proposals received from the network should
    /// be routed to.
    pub fn vote_collectors(&self) -> &Arc<VoteCollectors> {
        &self.vote_collectors
    }

    /// The [register store](InMemoryRegisterStore) holding the registers of executed, unfinalized blocks.
    pub fn register_store(&self) -> &Arc<InMemoryRegisterStore> {
        &self.register_store
    }

    /// The store for reading finalized registers, once the register index is
    /// [available](RegistersAsyncStore::init_data_available).
    pub fn registers_async(&self) -> &Arc<RegistersAsyncStore> {
        &self.registers_async
    }

    pub fn communicator(&self) -> &Arc<NodeCommunicator> {
        &self.communicator
    }
}

impl Drop for Replica {
    fn drop(&mut self) {
        if let Some(shutdown) = self.event_bus_shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(event_bus) = self.event_bus.take() {
            if event_bus.join().is_err() {
                log::error!("event bus thread panicked");
            }
        }
    }
}
