//! Background write-through of settings to durable storage.
//!
//! All writes go through one task fed by a FIFO queue, so two writes to
//! the same key always land in the order they were issued. Failures are
//! logged here and reported to whoever still holds the [`PendingWrite`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Result, SafeKeyError};
use crate::storage::{SettingsKey, SettingsStore};

enum WriteOp {
    Set(SettingsKey, String),
    Remove(SettingsKey),
    /// Completes once every earlier op has been processed.
    Barrier,
}

struct WriteRequest {
    op: WriteOp,
    done: oneshot::Sender<Result<()>>,
}

/// Handle for one or more queued durable writes.
///
/// Dropping it is fine: the write still happens and failures are still
/// logged.
#[derive(Debug)]
pub struct PendingWrite {
    receivers: Vec<oneshot::Receiver<Result<()>>>,
}

impl PendingWrite {
    pub(crate) fn merge(mut self, other: PendingWrite) -> Self {
        self.receivers.extend(other.receivers);
        self
    }

    /// Wait for the writes to reach storage. Returns the first failure.
    pub async fn wait(self) -> Result<()> {
        let mut first_err = None;
        for rx in self.receivers {
            let outcome = rx.await.unwrap_or(Err(SafeKeyError::ChannelReceive));
            if let Err(e) = outcome {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

pub(crate) struct SettingsWriter {
    tx: mpsc::UnboundedSender<WriteRequest>,
}

impl SettingsWriter {
    /// Start the writer task. It stops when the writer is dropped.
    pub fn spawn(store: Arc<dyn SettingsStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteRequest>();

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let outcome = match &request.op {
                    WriteOp::Set(key, value) => store.set(*key, value).await,
                    WriteOp::Remove(key) => store.remove(*key).await,
                    WriteOp::Barrier => Ok(()),
                };
                if let Err(e) = &outcome {
                    match &request.op {
                        WriteOp::Set(key, _) => warn!("Failed to persist {}: {}", key, e),
                        WriteOp::Remove(key) => warn!("Failed to remove {}: {}", key, e),
                        WriteOp::Barrier => {}
                    }
                }
                // Nobody waiting is the fire-and-forget case
                let _ = request.done.send(outcome);
            }
            debug!("Settings writer stopped");
        });

        Self { tx }
    }

    fn enqueue(&self, op: WriteOp) -> PendingWrite {
        let (done, rx) = oneshot::channel();
        if self.tx.send(WriteRequest { op, done }).is_err() {
            warn!("Settings writer is gone; write dropped");
        }
        // If the send failed, `done` was dropped and waiting yields ChannelReceive
        PendingWrite {
            receivers: vec![rx],
        }
    }

    pub fn set(&self, key: SettingsKey, value: impl Into<String>) -> PendingWrite {
        self.enqueue(WriteOp::Set(key, value.into()))
    }

    pub fn remove(&self, key: SettingsKey) -> PendingWrite {
        self.enqueue(WriteOp::Remove(key))
    }

    pub fn barrier(&self) -> PendingWrite {
        self.enqueue(WriteOp::Barrier)
    }
}
