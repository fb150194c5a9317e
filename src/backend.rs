use crate::bridge::EventSignal;
use crate::error::NotifyError;

/// Outcome of one quit-range message retrieval.
#[derive(Debug)]
pub enum Retrieved<M> {
    Quit,
    Failed(String),
    Message(M),
}

/// Posts the loop-terminating message from any thread.
pub trait QuitPoster: Send {
    fn post_quit(&self) -> Result<(), String>;
}

/// Native device-notification primitives.
///
/// Everything except [`QuitPoster::post_quit`] is called from the thread
/// that started the operation.
pub trait Backend {
    type Window;
    type Registration;
    type Message;
    type Poster: QuitPoster + 'static;

    fn current_thread_id(&self) -> u32;

    /// Registers a window class whose procedure forwards device changes to
    /// `signal`, then creates the hidden window.
    fn create_window(&self, signal: EventSignal) -> Result<Self::Window, NotifyError>;

    fn destroy_window(&self, window: &Self::Window) -> Result<(), NotifyError>;

    /// Consumes the window: the class goes away whether or not this succeeds.
    fn unregister_class(&self, window: Self::Window) -> Result<(), NotifyError>;

    fn register(&self, window: &Self::Window) -> Result<Self::Registration, NotifyError>;

    fn unregister(&self, registration: Self::Registration) -> Result<(), NotifyError>;

    /// Blocks until a message in the quit range is available for `window`.
    /// Device changes are delivered to the window procedure while waiting.
    fn next_message(&self, window: &Self::Window) -> Retrieved<Self::Message>;

    fn dispatch(&self, message: &Self::Message);

    fn quit_poster(&self, window: &Self::Window) -> Self::Poster;
}
