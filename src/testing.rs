//! In-memory backend driving the notification state machine in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::backend::{Backend, QuitPoster, Retrieved};
use crate::bridge::EventSignal;
use crate::error::NotifyError;

pub const BOUND_THREAD: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateWindow(u32),
    DestroyWindow(u32),
    UnregisterClass(u32),
    Register(u32),
    Unregister(u32),
    Dispatch,
    PostQuit,
}

#[derive(Debug)]
pub enum MockMessage {
    DeviceChange,
    Stray,
    Fail(String),
    Quit,
}

#[derive(Debug, Default, Clone)]
pub struct Failures {
    pub class_registration: bool,
    pub window_creation: bool,
    pub registration: bool,
    pub unregistration: bool,
    pub destroy_window: bool,
    pub unregister_class: bool,
    pub post_quit: bool,
    /// Report a different thread id once the window exists.
    pub migrate_after_create: bool,
}

#[derive(Debug)]
pub struct MockWindow {
    pub id: u32,
}

pub struct MockBackend {
    thread_id: AtomicU32,
    next_id: AtomicU32,
    failures: Failures,
    calls: Arc<Mutex<Vec<Call>>>,
    windows: Mutex<HashMap<u32, EventSignal>>,
    registrations: Mutex<Vec<u32>>,
    queue_tx: Sender<MockMessage>,
    queue_rx: Mutex<Receiver<MockMessage>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::failing(Failures::default())
    }

    pub fn failing(failures: Failures) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel();
        Self {
            thread_id: AtomicU32::new(BOUND_THREAD),
            next_id: AtomicU32::new(1),
            failures,
            calls: Arc::new(Mutex::new(Vec::new())),
            windows: Mutex::new(HashMap::new()),
            registrations: Mutex::new(Vec::new()),
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
        }
    }

    /// Queues a message for the loop. Device changes reach the window
    /// procedure during retrieval, the rest are returned by it.
    pub fn push(&self, message: MockMessage) {
        self.queue_tx.send(message).unwrap();
    }

    pub fn set_thread_id(&self, id: u32) {
        self.thread_id.store(id, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn live_windows(&self) -> usize {
        self.windows.lock().unwrap().len()
    }

    pub fn live_registrations(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Backend for MockBackend {
    type Window = MockWindow;
    type Registration = u32;
    type Message = MockMessage;
    type Poster = MockPoster;

    fn current_thread_id(&self) -> u32 {
        self.thread_id.load(Ordering::SeqCst)
    }

    fn create_window(&self, signal: EventSignal) -> Result<MockWindow, NotifyError> {
        if self.failures.class_registration {
            return Err(NotifyError::ClassRegistration {
                message: "Class already exists.".into(),
            });
        }
        if self.failures.window_creation {
            return Err(NotifyError::WindowCreation {
                message: "Cannot create a top-level child window.".into(),
            });
        }
        let id = self.next_id();
        self.windows.lock().unwrap().insert(id, signal);
        self.record(Call::CreateWindow(id));
        if self.failures.migrate_after_create {
            self.set_thread_id(BOUND_THREAD + 1);
        }
        Ok(MockWindow { id })
    }

    fn destroy_window(&self, window: &MockWindow) -> Result<(), NotifyError> {
        self.record(Call::DestroyWindow(window.id));
        if self.failures.destroy_window {
            return Err(NotifyError::WindowDestruction {
                message: "Access is denied.".into(),
            });
        }
        self.windows.lock().unwrap().remove(&window.id);
        Ok(())
    }

    fn unregister_class(&self, window: MockWindow) -> Result<(), NotifyError> {
        self.record(Call::UnregisterClass(window.id));
        if self.failures.unregister_class {
            return Err(NotifyError::ClassUnregistration {
                message: "Class still has open windows.".into(),
            });
        }
        Ok(())
    }

    fn register(&self, _window: &MockWindow) -> Result<u32, NotifyError> {
        if self.failures.registration {
            return Err(NotifyError::Registration {
                message: "The parameter is incorrect.".into(),
            });
        }
        let id = self.next_id();
        self.registrations.lock().unwrap().push(id);
        self.record(Call::Register(id));
        Ok(id)
    }

    fn unregister(&self, registration: u32) -> Result<(), NotifyError> {
        self.record(Call::Unregister(registration));
        if self.failures.unregistration {
            return Err(NotifyError::Unregistration {
                message: "The handle is invalid.".into(),
            });
        }
        self.registrations.lock().unwrap().retain(|r| *r != registration);
        Ok(())
    }

    fn next_message(&self, window: &MockWindow) -> Retrieved<MockMessage> {
        let queue = self.queue_rx.lock().unwrap();
        loop {
            match queue.recv() {
                Ok(MockMessage::DeviceChange) => {
                    if let Some(signal) = self.windows.lock().unwrap().get(&window.id) {
                        signal.notify();
                    }
                }
                Ok(MockMessage::Quit) => return Retrieved::Quit,
                Ok(MockMessage::Fail(message)) => return Retrieved::Failed(message),
                Ok(message) => return Retrieved::Message(message),
                Err(e) => return Retrieved::Failed(e.to_string()),
            }
        }
    }

    fn dispatch(&self, _message: &MockMessage) {
        self.record(Call::Dispatch);
    }

    fn quit_poster(&self, _window: &MockWindow) -> MockPoster {
        MockPoster {
            queue: self.queue_tx.clone(),
            calls: Arc::clone(&self.calls),
            fail: self.failures.post_quit,
        }
    }
}

pub struct MockPoster {
    queue: Sender<MockMessage>,
    calls: Arc<Mutex<Vec<Call>>>,
    fail: bool,
}

impl QuitPoster for MockPoster {
    fn post_quit(&self) -> Result<(), String> {
        self.calls.lock().unwrap().push(Call::PostQuit);
        if self.fail {
            return Err("Invalid window handle.".into());
        }
        self.queue.send(MockMessage::Quit).map_err(|e| e.to_string())
    }
}
