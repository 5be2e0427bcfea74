//! The receiving end of a background request.
//!
//! A background request reports through two channels: every decoded event
//! arrives on the message channel, then exactly one outcome arrives on the
//! outcome channel.  The message channel is always closed before the outcome
//! is sent, so draining messages until `None` and then awaiting the outcome
//! never blocks forever.

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::types::ChatResponse;

/// Events and outcome of one background request.
#[derive(Debug)]
pub struct EventStream<T> {
    messages: mpsc::Receiver<T>,
    outcome: oneshot::Receiver<Result<()>>,
}

/// The stream returned by [`OpenAi::chat`](crate::OpenAi::chat).
pub type ChatStream = EventStream<ChatResponse>;

impl<T> EventStream<T> {
    pub(crate) fn new(messages: mpsc::Receiver<T>, outcome: oneshot::Receiver<Result<()>>) -> Self {
        Self { messages, outcome }
    }

    /// Receive the next event, or `None` once the request has finished.
    pub async fn next_message(&mut self) -> Option<T> {
        self.messages.recv().await
    }

    /// Stop receiving events and wait for the outcome.
    ///
    /// Events not yet received are discarded.  If the request was still
    /// producing events it ends with a cancellation error.
    pub async fn finish(self) -> Result<()> {
        let Self { messages, outcome } = self;
        drop(messages);
        resolve(outcome.await)
    }

    /// Receive every remaining event, then the outcome.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut events = Vec::new();
        while let Some(event) = self.messages.recv().await {
            events.push(event);
        }
        resolve(self.outcome.await).map(|()| events)
    }

    /// Split into the raw message and outcome channels.
    pub fn into_parts(self) -> (mpsc::Receiver<T>, oneshot::Receiver<Result<()>>) {
        (self.messages, self.outcome)
    }
}

/// Flatten the outcome channel; a sender dropped without a value means the
/// background task died.
pub(crate) fn resolve(
    outcome: std::result::Result<Result<()>, oneshot::error::RecvError>,
) -> Result<()> {
    match outcome {
        Ok(result) => result,
        Err(_) => Err(Error::unknown("request task ended without an outcome")),
    }
}
