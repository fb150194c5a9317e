//! Binding of a notification operation to the OS thread that started it.
//!
//! Native windows can only be destroyed by the thread that created them, and
//! only that thread receives their messages. Every window and registration
//! step re-checks the binding; a mismatch means the caller let the bound
//! thread run something else and is treated as a bug, not an error.

use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
    bound: u32,
}

impl ThreadAffinity {
    pub fn bind(thread_id: u32) -> Self {
        debug!("Device notifications bound to OS thread {}", thread_id);
        Self { bound: thread_id }
    }

    /// Panics if `current` is not the bound thread.
    #[track_caller]
    pub fn check(&self, current: u32) {
        if current != self.bound {
            panic!(
                "this function must run on the bound OS thread: currThread={}, osThread={}",
                current, self.bound
            );
        }
    }
}
