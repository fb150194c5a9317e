//! Device attach/remove notifications.
//!
//! [`start`] binds the calling thread, creates a hidden window registered for
//! device interface notifications and pumps its messages until the given
//! [`CancellationToken`] fires. Each coalesced device change invokes the event
//! callback on a dedicated thread. Only Windows provides the mechanism; on
//! other targets [`start`] returns [`NotifyError::Unsupported`].

mod affinity;
pub mod backend;
pub mod bridge;
pub mod config;
#[cfg(target_os = "windows")]
mod device_monitor;
pub mod error;
mod notifier;
mod operation;
pub mod stream;
#[cfg(test)]
mod testing;
mod watcher;

pub use backend::{Backend, QuitPoster, Retrieved};
pub use bridge::EventSignal;
pub use config::WatchConfig;
#[cfg(target_os = "windows")]
pub use device_monitor::{Win32Backend, Win32QuitPoster, Win32Window};
pub use error::NotifyError;
pub use notifier::start_with;
pub use stream::{DeviceWatch, WatchEvent};
pub use tokio_util::sync::CancellationToken;

/// Whether this target can deliver device notifications at all.
pub fn is_supported() -> bool {
    cfg!(target_os = "windows")
}

/// Runs device notifications with the default configuration.
///
/// The calling thread is bound to the operation until this returns and must
/// not be handed to other work in the meantime.
pub fn start<E, F>(cancel: &CancellationToken, on_event: E, on_error: F) -> Result<(), NotifyError>
where
    E: FnMut() + Send,
    F: FnMut(&str),
{
    start_configured(&WatchConfig::default(), cancel, on_event, on_error)
}

/// Runs device notifications like [`start`], with an explicit [`WatchConfig`].
pub fn start_configured<E, F>(
    config: &WatchConfig,
    cancel: &CancellationToken,
    on_event: E,
    on_error: F,
) -> Result<(), NotifyError>
where
    E: FnMut() + Send,
    F: FnMut(&str),
{
    #[cfg(target_os = "windows")]
    {
        start_with(&Win32Backend::new(config), cancel, on_event, on_error)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = (config, cancel, on_event, on_error);
        Err(NotifyError::unsupported())
    }
}
