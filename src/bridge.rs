//! Single-slot coalescing hand-off between the window procedure and the
//! thread that runs the caller's event callback.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, Scope, ScopedJoinHandle};

use tokio::sync::mpsc;
use tracing::debug;

/// Producer half. Cheap to clone; signalling after close is a no-op.
#[derive(Clone, Debug)]
pub struct EventSignal {
    slot: Arc<Mutex<Option<mpsc::Sender<()>>>>,
}

impl EventSignal {
    /// Records that a device event happened without blocking.
    ///
    /// If a wake-up is already pending the event folds into it.
    pub fn notify(&self) {
        let slot = self.lock();
        if let Some(tx) = slot.as_ref() {
            let _ = tx.try_send(());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<mpsc::Sender<()>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct EventBridge {
    signal: EventSignal,
    rx: Option<mpsc::Receiver<()>>,
}

impl EventBridge {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            signal: EventSignal {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx: Some(rx),
        }
    }

    pub fn signal(&self) -> EventSignal {
        self.signal.clone()
    }

    /// Starts the consumer thread. Each pending wake-up runs `on_event` once;
    /// the thread exits once the slot is closed.
    ///
    /// Only the first call spawns anything, later calls get `Ok(None)`.
    pub fn spawn_consumer<'scope, 'env, E>(
        &mut self,
        scope: &'scope Scope<'scope, 'env>,
        mut on_event: E,
    ) -> std::io::Result<Option<ScopedJoinHandle<'scope, ()>>>
    where
        E: FnMut() + Send + 'scope,
    {
        let Some(mut rx) = self.rx.take() else {
            return Ok(None);
        };
        let signal = self.signal.clone();
        thread::Builder::new()
            .name("device-events".into())
            .spawn_scoped(scope, move || {
                while rx.blocking_recv().is_some() {
                    if signal.is_closed() {
                        break;
                    }
                    on_event();
                }
                debug!("Device event consumer stopped");
            })
            .map(Some)
    }

    /// Closes the slot under the producer lock. Pending wake-ups are discarded.
    pub fn close(&self) {
        let mut slot = self.signal.lock();
        slot.take();
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.close();
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}
