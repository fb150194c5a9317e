//! Thread-guarded native steps of one notification operation.

use tracing::{debug, error, warn};

use crate::affinity::ThreadAffinity;
use crate::backend::{Backend, Retrieved};
use crate::bridge::EventSignal;
use crate::error::NotifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Quit,
    Error,
}

/// Resources held by an operation, released in reverse acquisition order.
pub struct Acquired<B: Backend> {
    pub window: Option<B::Window>,
    pub registration: Option<B::Registration>,
}

impl<B: Backend> Default for Acquired<B> {
    fn default() -> Self {
        Self {
            window: None,
            registration: None,
        }
    }
}

pub struct Operation<'a, B: Backend> {
    backend: &'a B,
    affinity: ThreadAffinity,
}

impl<'a, B: Backend> Operation<'a, B> {
    /// Binds the operation to the calling thread.
    pub fn bind(backend: &'a B) -> Self {
        let affinity = ThreadAffinity::bind(backend.current_thread_id());
        Self { backend, affinity }
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    #[track_caller]
    fn verify_thread(&self) {
        self.affinity.check(self.backend.current_thread_id());
    }

    pub fn create_window(&self, signal: EventSignal) -> Result<B::Window, NotifyError> {
        self.verify_thread();
        self.backend.create_window(signal)
    }

    /// Destroys the window then unregisters its class. Both steps are always
    /// attempted; every failure is returned.
    pub fn destroy_window(&self, window: B::Window) -> Vec<NotifyError> {
        self.verify_thread();
        let mut failures = Vec::new();
        if let Err(e) = self.backend.destroy_window(&window) {
            failures.push(e);
        }
        if let Err(e) = self.backend.unregister_class(window) {
            failures.push(e);
        }
        failures
    }

    pub fn register(&self, window: &B::Window) -> Result<B::Registration, NotifyError> {
        self.verify_thread();
        self.backend.register(window)
    }

    pub fn unregister(&self, registration: B::Registration) -> Result<(), NotifyError> {
        self.verify_thread();
        self.backend.unregister(registration)
    }

    /// Runs the message loop until a quit message or a retrieval error.
    pub fn pump<F>(&self, window: &B::Window, on_error: &mut F) -> LoopExit
    where
        F: FnMut(&str),
    {
        loop {
            self.verify_thread();
            match self.backend.next_message(window) {
                Retrieved::Quit => {
                    debug!("Quit message received");
                    return LoopExit::Quit;
                }
                Retrieved::Failed(message) => {
                    let err = NotifyError::MessageRetrieval { message };
                    error!("{}", err);
                    on_error(&err.to_string());
                    return LoopExit::Error;
                }
                // Retrieval is filtered to the quit range, anything else is stray.
                Retrieved::Message(message) => self.backend.dispatch(&message),
            }
        }
    }

    /// Releases whatever was acquired, registration first. Each resource gets
    /// exactly one release attempt and every failure goes to `on_error`.
    pub fn release<F>(&self, acquired: &mut Acquired<B>, on_error: &mut F)
    where
        F: FnMut(&str),
    {
        if let Some(registration) = acquired.registration.take() {
            if let Err(e) = self.unregister(registration) {
                warn!("{}", e);
                on_error(&e.to_string());
            }
        }
        if let Some(window) = acquired.window.take() {
            for e in self.destroy_window(window) {
                warn!("{}", e);
                on_error(&e.to_string());
            }
        }
    }
}
