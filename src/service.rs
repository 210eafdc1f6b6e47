//! Bus-facing wrapper that runs a page controller on its own thread.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::controller::{CompletionHandler, PageController};
use crate::page::PageDocument;
use crate::protocol::{ControlMessage, Message, PageId, PageMessage};

/// Demultiplexes control messages addressed to one page instance.
pub struct PageService<D: PageDocument> {
    id: PageId,
    controller: PageController<D>,
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
}

impl<D: PageDocument> PageService<D> {
    pub fn new(
        id: PageId,
        controller: PageController<D>,
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
    ) -> PageService<D> {
        PageService {
            id,
            controller,
            bus_consumer,
            bus_producer,
        }
    }

    /// Publishes the natural end-of-playback event back onto the bus so the
    /// run loop makes the autoplay decision in order with other commands.
    fn completion_handler(&self) -> CompletionHandler {
        let producer = self.bus_producer.clone();
        let source = self.id.clone();
        Arc::new(move || {
            let _ = producer.send(Message::Page(PageMessage::PlaybackCompleted {
                source: source.clone(),
            }));
        })
    }

    pub fn run(&mut self) {
        // Bind the completion handler up front; the watcher waits for the
        // audio element when the host has not created it yet.
        self.controller
            .arm_completion_watcher(self.completion_handler());

        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Control(ControlMessage::RequestTracks { target }))
                    if target == self.id =>
                {
                    let snapshot = self.controller.snapshot();
                    debug!(
                        "PageService {}: answering track request, {} rows",
                        self.id,
                        snapshot.tracks.len()
                    );
                    let _ = self.bus_producer.send(Message::Page(PageMessage::Tracks {
                        source: self.id.clone(),
                        snapshot,
                    }));
                }
                Ok(Message::Control(ControlMessage::Execute { target, command }))
                    if target == self.id =>
                {
                    self.controller
                        .execute(command, &self.completion_handler());
                }
                Ok(Message::Page(PageMessage::PlaybackCompleted { source }))
                    if source == self.id =>
                {
                    self.controller.handle_playback_completed();
                }
                // Traffic for other pages and our own responses.
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("PageService {}: dropped {} bus messages", self.id, skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("PageService {}: bus closed, exiting", self.id);
                    break;
                }
            }
        }
    }
}
