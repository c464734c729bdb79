/// Top-level error type for the client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Missing or invalid user input; no request was sent.
    #[error("validation error: {0}")]
    Validation(String),
    /// A request failed or the backend answered with a non-success status.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
    },
    /// An event payload on the stream could not be decoded.
    #[error("malformed {event} event: {message}")]
    StreamParse { event: String, message: String },
    /// The backend reported a workflow failure through an `error` event.
    #[error("workflow error: {0}")]
    Workflow(String),
    /// The run was cancelled by the caller.
    #[error("run cancelled")]
    Cancelled,
}

impl ClientError {
    /// Creates a transport error without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: None,
        }
    }

    /// Creates a transport error for a non-success HTTP response.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: Some(status),
        }
    }

    pub(crate) fn stream_parse(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamParse {
            event: event.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code carried by a transport error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Text shown to the user in the assistant bubble for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(message) | Self::Validation(message) | Self::Workflow(message) => {
                message.clone()
            }
            Self::Transport { message, .. } => message.clone(),
            Self::StreamParse { .. } => self.to_string(),
            Self::Cancelled => "Run cancelled.".to_string(),
        }
    }
}
