use crate::types::{ChatState, Message, NodeError, Role, TurnError, TurnResult};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// What a streaming turn reports while it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Text fragment of a message that is still being generated
    Delta { role: Role, content: String },
    /// A message that has just been checkpointed
    Message(Message),
}

impl TurnEvent {
    /// Assistant text carried by this event, if it is a fragment of an answer.
    pub fn assistant_text(&self) -> Option<&str> {
        match self {
            TurnEvent::Delta {
                role: Role::Assistant,
                content,
            } => Some(content),
            _ => None,
        }
    }
}

/// Events of one streaming turn.
///
/// Ends when the turn reaches `END`; a failed turn yields its error as the
/// last item. Cancelling or dropping the stream aborts the turn, keeping the
/// messages it already checkpointed.
pub struct TurnStream {
    events: ReceiverStream<TurnEvent>,
    handle: Option<JoinHandle<TurnResult<ChatState>>>,
}

impl TurnStream {
    pub(crate) fn new(
        events: ReceiverStream<TurnEvent>,
        handle: JoinHandle<TurnResult<ChatState>>,
    ) -> Self {
        Self {
            events,
            handle: Some(handle),
        }
    }

    /// Stop the turn. The stream ends after any already buffered events.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.events.close();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Stream for TurnStream {
    type Item = TurnResult<TurnEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.events).poll_next(cx) {
            Poll::Ready(Some(event)) => return Poll::Ready(Some(Ok(event))),
            Poll::Pending => return Poll::Pending,
            Poll::Ready(None) => {}
        }

        // Channel drained: report how the turn ended.
        let Some(handle) = this.handle.as_mut() else {
            return Poll::Ready(None);
        };
        match Pin::new(handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                this.handle = None;
                match result {
                    Ok(Ok(_)) => Poll::Ready(None),
                    Ok(Err(e)) => Poll::Ready(Some(Err(e))),
                    Err(e) if e.is_cancelled() => Poll::Ready(Some(Err(TurnError::Cancelled))),
                    Err(e) => Poll::Ready(Some(Err(TurnError::Node(NodeError::Execution(
                        e.to_string(),
                    ))))),
                }
            }
        }
    }
}

impl Drop for TurnStream {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
