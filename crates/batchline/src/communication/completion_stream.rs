use std::pin::Pin;
use std::task::{Context, Poll};
use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use super::job::Completion;

/// # CompletionStream
///
/// Job completions from every replica of a pool, in the order they finish.
///
/// `CompletionStream` adapts the receiving half of the pool's completion
/// channel to [`Stream`]. It yields `None` once every replica has stopped.
///
/// ## Ordering
///
/// There is none. Two jobs submitted in order may complete in either order
/// when they run on different replicas; consumers re-order by line index.
pub struct CompletionStream {
    receiver: mpsc::UnboundedReceiver<Completion>,
}

impl CompletionStream {
    pub fn new(receiver: mpsc::UnboundedReceiver<Completion>) -> Self {
        Self { receiver }
    }

    /// Returns a completion that has already arrived, without waiting.
    pub fn try_next(&mut self) -> Option<Completion> {
        match self.receiver.try_recv() {
            Ok(completion) => Some(completion),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Stream for CompletionStream {
    type Item = Completion;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().receiver).poll_recv(cx)
    }
}
