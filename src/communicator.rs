/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Calling one of several equivalent nodes, falling back to the next when a call fails.
//!
//! [NodeCommunicator::call_available_node] tries the nodes picked by a [NodeSelector] one at a time
//! until a call succeeds. Failures are collected and returned together once `max_failed_requests` of
//! them accumulate, or once every selected node has been tried.
//!
//! Nodes behind an open circuit breaker fail fast with [NodeCallError::CircuitOpen]. Such failures are
//! not counted: the next node is simply tried.

use rand::seq::SliceRandom;

use crate::types::{basic::Identifier, identities::{Identity, IdentityList}};

/// Number of nodes tried when circuit breakers are disabled.
pub const MAX_NODES_CNT: usize = 3;

/// Default number of failed calls after which the accumulated errors are returned.
pub const MAX_FAILED_REQUESTS: usize = 3;

/// Decides whether a failed call should end the attempt immediately, without trying further nodes.
pub type ErrorTerminator = dyn Fn(&Identity, &NodeCallError) -> bool;

/// Yields the nodes to try, in the order they should be tried.
pub struct NodeSelector {
    nodes: Vec<Identity>,
    index: usize,
}

impl NodeSelector {
    fn new(nodes: Vec<Identity>) -> NodeSelector {
        NodeSelector { nodes, index: 0 }
    }

    pub fn has_next(&self) -> bool {
        self.index < self.nodes.len()
    }
}

impl Iterator for NodeSelector {
    type Item = Identity;

    fn next(&mut self) -> Option<Identity> {
        let node = self.nodes.get(self.index).cloned()?;
        self.index += 1;
        Some(node)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NodeSelectorFactory {
    circuit_breaker_enabled: bool,
}

impl NodeSelectorFactory {
    pub fn new(circuit_breaker_enabled: bool) -> NodeSelectorFactory {
        NodeSelectorFactory {
            circuit_breaker_enabled,
        }
    }

    /// With circuit breakers enabled, every node is tried in the given order: nodes with open circuits
    /// fail fast. Otherwise, at most [MAX_NODES_CNT] nodes are picked at random.
    pub fn select_nodes(&self, nodes: &IdentityList) -> Result<NodeSelector, CommunicatorError> {
        if nodes.is_empty() {
            return Err(CommunicatorError::NoNodes);
        }

        let mut selected: Vec<Identity> = nodes.iter().cloned().collect();
        if !self.circuit_breaker_enabled {
            selected.shuffle(&mut rand::thread_rng());
            selected.truncate(MAX_NODES_CNT);
        }

        Ok(NodeSelector::new(selected))
    }
}

pub struct NodeCommunicator {
    node_selector_factory: NodeSelectorFactory,
    max_failed_requests: usize,
}

impl NodeCommunicator {
    pub fn new(circuit_breaker_enabled: bool, max_failed_requests: usize) -> NodeCommunicator {
        NodeCommunicator {
            node_selector_factory: NodeSelectorFactory::new(circuit_breaker_enabled),
            max_failed_requests,
        }
    }

    /// Call `call` on the selected nodes until one succeeds, returning its result.
    ///
    /// If `should_terminate_on_error` returns `true` for a failure, that failure is returned at once.
    pub fn call_available_node<T>(
        &self,
        nodes: &IdentityList,
        mut call: impl FnMut(&Identity) -> Result<T, NodeCallError>,
        should_terminate_on_error: Option<&ErrorTerminator>,
    ) -> Result<T, CommunicatorError> {
        let mut selector = self.node_selector_factory.select_nodes(nodes)?;
        let mut errors: Vec<NodeCallError> = Vec::new();
        let mut no_available_nodes = false;

        while let Some(node) = selector.next() {
            let err = match call(&node) {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };

            if should_terminate_on_error.is_some_and(|terminate| terminate(&node, &err)) {
                return Err(CommunicatorError::Node(err));
            }

            if err.is_circuit_open() {
                log::debug!("circuit open for node {}, trying next node", node.node_id);
                if !selector.has_next() && errors.is_empty() {
                    no_available_nodes = true;
                }
                continue;
            }

            log::debug!("call to node {} failed: {}", node.node_id, err);
            errors.push(err);
            if errors.len() >= self.max_failed_requests {
                break;
            }
        }

        if errors.is_empty() {
            if no_available_nodes {
                log::warn!("no available nodes out of {}", nodes.len());
            }
            return Err(CommunicatorError::NoAvailableNodes);
        }
        Err(CommunicatorError::Failed(errors))
    }
}

impl Default for NodeCommunicator {
    fn default() -> NodeCommunicator {
        NodeCommunicator::new(false, MAX_FAILED_REQUESTS)
    }
}

/// The ways a call to a single node can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeCallError {
    /// The node's circuit breaker is open, so the call was not made.
    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("node {node} is unavailable: {reason}")]
    Unavailable { node: Identifier, reason: String },

    #[error("call to node {node} failed: {reason}")]
    Failed { node: Identifier, reason: String },
}

impl NodeCallError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, NodeCallError::CircuitOpen)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommunicatorError {
    #[error("no nodes to call")]
    NoNodes,

    #[error("there are no available nodes")]
    NoAvailableNodes,

    /// A failure that the caller's terminator chose to stop on.
    #[error(transparent)]
    Node(NodeCallError),

    #[error("{} calls failed: {}", .0.len(), .0.iter().map(|err| err.to_string()).collect::<Vec<_>>().join("; "))]
    Failed(Vec<NodeCallError>),
}
