//! Async front end: runs a notification operation on a blocking task and
//! yields its events as a stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{self, JoinHandle};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::warn;

use crate::backend::Backend;
use crate::config::WatchConfig;
use crate::error::NotifyError;
use crate::notifier::start_with;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// At least one device was attached or removed.
    DeviceChanged,
    /// A non-fatal failure reported while running or tearing down.
    Diagnostic(String),
}

type EventCallback = Box<dyn FnMut() + Send>;
type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// A running device watch. Cancelled when dropped.
pub struct DeviceWatch {
    events: ReceiverStream<WatchEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), NotifyError>>,
    _guard: DropGuard,
}

impl DeviceWatch {
    /// Watches with the platform backend.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: WatchConfig) -> Self {
        let capacity = config.channel_capacity;
        Self::launch(capacity, move |cancel, on_event, on_error| {
            crate::start_configured(&config, cancel, on_event, on_error)
        })
    }

    /// Watches with a caller-supplied backend.
    pub fn spawn_with<B>(backend: B, config: &WatchConfig) -> Self
    where
        B: Backend + Send + 'static,
    {
        Self::launch(config.channel_capacity, move |cancel, on_event, on_error| {
            start_with(&backend, cancel, on_event, on_error)
        })
    }

    fn launch<R>(capacity: usize, run: R) -> Self
    where
        R: FnOnce(&CancellationToken, EventCallback, ErrorCallback) -> Result<(), NotifyError>
            + Send
            + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();

        let event_tx = tx.clone();
        let on_event: EventCallback = Box::new(move || {
            if let Err(TrySendError::Full(_)) = event_tx.try_send(WatchEvent::DeviceChanged) {
                warn!("Stream reader is behind, device change dropped");
            }
        });
        let on_error: ErrorCallback = Box::new(move |message: &str| {
            if tx.try_send(WatchEvent::Diagnostic(message.to_string())).is_err() {
                warn!("Dropped device watch diagnostic: {}", message);
            }
        });

        let token = cancel.clone();
        let task = task::spawn_blocking(move || run(&token, on_event, on_error));

        Self {
            events: ReceiverStream::new(rx),
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests shutdown. The stream ends once teardown has finished.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Waits for the operation to end and returns its setup result.
    ///
    /// Does not request shutdown; call [`DeviceWatch::stop`] first.
    pub async fn finish(self) -> Result<(), NotifyError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }
}

impl Stream for DeviceWatch {
    type Item = WatchEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<WatchEvent>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}
