//! FIFO work queue of request ids shared by all workers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use diffhub_types::RequestId;

use crate::error::{ProcessorError, ProcessorResult};

#[derive(Clone, Debug)]
enum Sender {
    Unbounded(mpsc::UnboundedSender<RequestId>),
    Bounded(mpsc::Sender<RequestId>),
}

#[derive(Debug)]
enum Receiver {
    Unbounded(mpsc::UnboundedReceiver<RequestId>),
    Bounded(mpsc::Receiver<RequestId>),
}

impl Receiver {
    async fn recv(&mut self) -> Option<RequestId> {
        match self {
            Self::Unbounded(rx) => rx.recv().await,
            Self::Bounded(rx) => rx.recv().await,
        }
    }
}

/// Multi-producer, multi-consumer queue of request ids.
///
/// Producers clone the queue freely. Consumers take turns on the single
/// receiver, so each id is handed to exactly one worker.
#[derive(Clone, Debug)]
pub struct WorkQueue {
    sender: Sender,
    receiver: Arc<Mutex<Receiver>>,
    len: Arc<AtomicUsize>,
}

impl WorkQueue {
    /// `None` for an unbounded queue.
    pub fn new(capacity: Option<usize>) -> Self {
        let (sender, receiver) = match capacity {
            Some(capacity) => {
                let (tx, rx) = mpsc::channel(capacity.max(1));
                (Sender::Bounded(tx), Receiver::Bounded(rx))
            }
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Sender::Unbounded(tx), Receiver::Unbounded(rx))
            }
        };
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            len: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Append `id`. On a bounded queue this waits until there is space.
    pub async fn enqueue(&self, id: RequestId) -> ProcessorResult<()> {
        // Counted before the send. Dropped uncommitted, the guard undoes it.
        let mut slot = CountGuard::new(&self.len);
        let sent = match &self.sender {
            Sender::Unbounded(tx) => tx.send(id).is_ok(),
            Sender::Bounded(tx) => tx.send(id).await.is_ok(),
        };
        if !sent {
            return Err(ProcessorError::ShuttingDown);
        }
        slot.commit();
        Ok(())
    }

    /// Next id in FIFO order; `None` once every sender is gone and the queue
    /// is drained.
    pub async fn dequeue(&self) -> Option<RequestId> {
        let id = self.receiver.lock().await.recv().await?;
        self.len.fetch_sub(1, Ordering::SeqCst);
        Some(id)
    }

    /// Ids enqueued but not yet dequeued.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CountGuard<'a> {
    len: &'a AtomicUsize,
    committed: bool,
}

impl<'a> CountGuard<'a> {
    fn new(len: &'a AtomicUsize) -> Self {
        len.fetch_add(1, Ordering::SeqCst);
        Self {
            len,
            committed: false,
        }
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for CountGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.len.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
