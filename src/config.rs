/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The user-defined parameters of a [replica](crate::replica).

use typed_builder::TypedBuilder;

use crate::communicator::MAX_FAILED_REQUESTS;
use crate::types::basic::{BlockHeight, Identifier, ViewNumber};

/// Stores the user-defined parameters required to start the replica, that is:
/// 1. The "Log Events" flag, if set to "true" then events are logged.
/// 2. Whether the nodes called through the [communicator](crate::communicator) sit behind circuit
///    breakers.
/// 3. How many failed node calls the communicator tolerates before giving up.
/// 4. The height and ID of the latest finalized and executed block, which the
///    [register store](crate::register_store::InMemoryRegisterStore) starts out pruned to.
/// 5. The lowest view to collect votes for.
///
/// ## Circuit breakers
///
/// With circuit breakers enabled, the communicator tries every node, in order, since nodes whose
/// circuits are open fail fast. Otherwise it tries at most
/// [MAX_NODES_CNT](crate::communicator::MAX_NODES_CNT) nodes, picked at random.
///
/// ## Log Events
///
/// quorum_core logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc =
    "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.log_events(...)`
    - `.initial_pruned_height(...)`
    - `.initial_pruned_block(...)`

    Optional:
    - `.circuit_breaker_enabled(...)`
    - `.max_failed_requests(...)`
    - `.lowest_retained_view(...)`
"
))]
pub struct Configuration {
    #[builder(setter(doc = "Enable logging of events? Required."))]
    pub log_events: bool,
    #[builder(default = false, setter(doc = "Are the nodes called through the communicator behind circuit breakers? Defaults to false."))]
    pub circuit_breaker_enabled: bool,
    #[builder(default = MAX_FAILED_REQUESTS, setter(doc = "Set the number of failed node calls after which the communicator gives up. Defaults to 3."))]
    pub max_failed_requests: usize,
    #[builder(setter(doc = "Set the height of the latest finalized and executed block. Required."))]
    pub initial_pruned_height: BlockHeight,
    #[builder(setter(doc = "Set the ID of the latest finalized and executed block. Required."))]
    pub initial_pruned_block: Identifier,
    #[builder(default = ViewNumber::init(), setter(doc = "Set the lowest view to collect votes for. Defaults to the initial view."))]
    pub lowest_retained_view: ViewNumber,
}
