use std::io;

/// Failures surfaced by a device notification operation.
///
/// Setup failures are returned from `start`; everything else is reported
/// through the error callback while the operation tears down.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("registering new window: {message}")]
    ClassRegistration { message: String },

    #[error("creating window: {message}")]
    WindowCreation { message: String },

    #[error("registering device notifications: {message}")]
    Registration { message: String },

    #[error("error unregistering device notifications: {message}")]
    Unregistration { message: String },

    #[error("error destroying window: {message}")]
    WindowDestruction { message: String },

    #[error("error unregistering window class: {message}")]
    ClassUnregistration { message: String },

    #[error("error consuming messages: {message}")]
    MessageRetrieval { message: String },

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("operating system not supported: {os}")]
    Unsupported { os: &'static str },
}

impl NotifyError {
    /// True for failures that stop the operation before the message loop runs.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            NotifyError::ClassRegistration { .. }
                | NotifyError::WindowCreation { .. }
                | NotifyError::Registration { .. }
                | NotifyError::Spawn { .. }
                | NotifyError::Unsupported { .. }
        )
    }

    #[cfg(not(target_os = "windows"))]
    pub(crate) fn unsupported() -> Self {
        NotifyError::Unsupported {
            os: std::env::consts::OS,
        }
    }
}
