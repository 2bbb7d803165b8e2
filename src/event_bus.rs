/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The event bus thread, which receives [events](crate::events) and fires the handlers registered for
//! them.

use crate::events::*;
use crate::logging::Logger;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::TryRecvError;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

// How long the event bus waits for an event before checking for the shutdown signal again.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct EventHandlers {
    pub(crate) receive_vote_handlers: Vec<HandlerPtr<ReceiveVoteEvent>>,
    pub(crate) receive_proposal_handlers: Vec<HandlerPtr<ReceiveProposalEvent>>,
    pub(crate) collect_qc_handlers: Vec<HandlerPtr<CollectQCEvent>>,
    pub(crate) invalid_vote_handlers: Vec<HandlerPtr<InvalidVoteEvent>>,
    pub(crate) save_registers_handlers: Vec<HandlerPtr<SaveRegistersEvent>>,
    pub(crate) prune_registers_handlers: Vec<HandlerPtr<PruneRegistersEvent>>,
}

impl EventHandlers {
    /// Collect the user-defined handlers, and the default logging handler of every event if
    /// `log_events` is set.
    pub(crate) fn new(
        log_events: bool,
        receive_vote_handler: Option<HandlerPtr<ReceiveVoteEvent>>,
        receive_proposal_handler: Option<HandlerPtr<ReceiveProposalEvent>>,
        collect_qc_handler: Option<HandlerPtr<CollectQCEvent>>,
        invalid_vote_handler: Option<HandlerPtr<InvalidVoteEvent>>,
        save_registers_handler: Option<HandlerPtr<SaveRegistersEvent>>,
        prune_registers_handler: Option<HandlerPtr<PruneRegistersEvent>>,
    ) -> EventHandlers {
        EventHandlers {
            receive_vote_handlers: handlers(log_events, receive_vote_handler),
            receive_proposal_handlers: handlers(log_events, receive_proposal_handler),
            collect_qc_handlers: handlers(log_events, collect_qc_handler),
            invalid_vote_handlers: handlers(log_events, invalid_vote_handler),
            save_registers_handlers: handlers(log_events, save_registers_handler),
            prune_registers_handlers: handlers(log_events, prune_registers_handler),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.receive_vote_handlers.is_empty()
            && self.receive_proposal_handlers.is_empty()
            && self.collect_qc_handlers.is_empty()
            && self.invalid_vote_handlers.is_empty()
            && self.save_registers_handlers.is_empty()
            && self.prune_registers_handlers.is_empty()
    }

    pub fn fire_handlers(&self, event: Event) {
        match event {
            Event::ReceiveVote(receive_vote_event) =>
                self.receive_vote_handlers.iter().for_each(|handler| handler(&receive_vote_event)),

            Event::ReceiveProposal(receive_proposal_event) =>
                self.receive_proposal_handlers.iter().for_each(|handler| handler(&receive_proposal_event)),

            Event::CollectQC(collect_qc_event) =>
                self.collect_qc_handlers.iter().for_each(|handler| handler(&collect_qc_event)),

            Event::InvalidVote(invalid_vote_event) =>
                self.invalid_vote_handlers.iter().for_each(|handler| handler(&invalid_vote_event)),

            Event::SaveRegisters(save_registers_event) =>
                self.save_registers_handlers.iter().for_each(|handler| handler(&save_registers_event)),

            Event::PruneRegisters(prune_registers_event) =>
                self.prune_registers_handlers.iter().for_each(|handler| handler(&prune_registers_event)),
        }
    }
}

fn handlers<T: Logger>(log_events: bool, user_handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
    let mut handlers = Vec::new();
    if log_events {
        handlers.push(T::get_logger());
    }
    if let Some(handler) = user_handler {
        handlers.push(handler);
    }
    handlers
}

/// Start the event bus thread. When `shutdown_signal` fires, the events already published are handled
/// before the thread exits.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                while let Ok(event) = event_subscriber.try_recv() {
                    event_handlers.fire_handlers(event)
                }
                return;
            }
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("all event publishers disconnected, stopping event bus");
                return;
            }
        }
    })
}
