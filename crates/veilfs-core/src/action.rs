//! Asynchronous action queue.
//!
//! A mutating request is represented as a typed [`Action`] variant rather
//! than a dynamic `{"action":..., "information": {...}}` envelope, and
//! consumed by a single background task blocking on the channel rather than
//! polling with a sleep. [`ActionQueue`] is a bounded MPSC channel with one
//! consumer task that calls into an [`ActionHandler`] supplied by the front
//! end's session — this crate never depends on the transport/tree-operation
//! crate, so the handler is injected as a trait object, keeping the
//! dependency edge pointing inward.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

/// A mutating operation issued by a front end, queued for serialized
/// execution against the folder tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Upload { local_path: String, opacity_path: String },
    Delete { opacity_path: String, handle: String },
    Move { from: String, handle: String, to: String },
}

/// Implemented by the session/front end; the queue's single consumer
/// dispatches each drained [`Action`] here, synchronously with respect to
/// the next item: the consumer awaits one `handle` call to completion
/// before pulling the next action off the channel.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, action: Action) -> Result<(), String>;
}

/// A thread-safe FIFO of [`Action`]s with one dedicated background
/// consumer. Reads (`getFolderData`, download) are not routed through
/// this queue and may run concurrently with it.
pub struct ActionQueue {
    sender: mpsc::Sender<Action>,
    worker: JoinHandle<()>,
}

impl ActionQueue {
    /// Spawn the queue's consumer task against `handler`, with a bounded
    /// channel of `capacity` pending actions.
    pub fn spawn(handler: impl ActionHandler + 'static, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel(capacity);

        let worker = tokio::spawn(async move {
            while let Some(action) = receiver.recv().await {
                Self::dispatch(&handler, action).await;
            }
            info!("action queue consumer exiting: sender dropped");
        });

        Self { sender, worker }
    }

    #[instrument(skip(handler, action), fields(action = ?action))]
    async fn dispatch(handler: &(impl ActionHandler + ?Sized), action: Action) {
        if let Err(err) = handler.handle(action).await {
            error!(%err, "action failed; queue worker continues with the next item");
        }
    }

    /// Enqueue an action. Actions enqueued in order are applied in order
    /// because the channel is FIFO and there is exactly one consumer.
    pub async fn enqueue(&self, action: Action) -> Result<(), Action> {
        self.sender.send(action).await.map_err(|e| e.0)
    }

    /// Stop accepting new actions and wait for the consumer to drain and
    /// exit.
    pub async fn shutdown(self) {
        drop(self.sender);
        let _ = self.worker.await;
    }
}
