use std::time::Duration;

use reqwest::Url;

use crate::errors::ClientError;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Configuration for the workflow backend client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the backend serving `/api/*`.
    pub base_url: String,
    /// TCP connect timeout for every request.
    pub connect_timeout: Duration,
    /// Timeout for the one-shot requests (start, ticket lookup).
    ///
    /// The event stream has no timeout; it lives until a terminal event.
    pub request_timeout: Duration,
    /// Bounded event buffer between the connection reader and the dispatch loop.
    pub stream_buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            stream_buffer_capacity: 128,
        }
    }
}

impl ClientConfig {
    /// Creates a config with defaults pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `MAILFLOW_BASE_URL` (default `http://127.0.0.1:5000`).
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("MAILFLOW_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url.trim().to_string();
        }
        if let Ok(capacity) = std::env::var("MAILFLOW_STREAM_BUFFER") {
            config.stream_buffer_capacity = capacity.trim().parse().map_err(|_| {
                ClientError::Config(format!("MAILFLOW_STREAM_BUFFER is not a number: {capacity}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the backend base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the one-shot request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the stream buffer capacity.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must start with http:// or https://: {base}"
            )));
        }
        Url::parse(base)
            .map_err(|e| ClientError::Config(format!("invalid base_url {base}: {e}")))?;
        if self.stream_buffer_capacity == 0 {
            return Err(ClientError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let base = self.base_url.trim();
        let mut url = Url::parse(base)
            .map_err(|e| ClientError::Config(format!("invalid base_url {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("base_url cannot carry a path: {base}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn start_url(&self) -> Result<Url, ClientError> {
        self.endpoint(&["api", "start"])
    }

    pub(crate) fn stream_url(&self, run_id: &str) -> Result<Url, ClientError> {
        self.endpoint(&["api", "stream", run_id])
    }

    pub(crate) fn ticket_url(&self, ticket_id: &str) -> Result<Url, ClientError> {
        self.endpoint(&["api", "tickets", ticket_id])
    }
}
