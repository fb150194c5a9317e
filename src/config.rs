/// Settings shared by the native backend and the async event stream.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Window class name prefix; the bound thread id is appended.
    pub class_prefix: String,
    /// Buffered events between the bound thread and a stream reader.
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            class_prefix: "device-notification".to_string(),
            channel_capacity: 32,
        }
    }
}

impl WatchConfig {
    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}
