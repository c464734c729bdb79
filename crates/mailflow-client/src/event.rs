use serde::Deserialize;

use crate::model::FinalResult;

/// Step label used when a status event omits one.
pub const DEFAULT_STEP: &str = "processing";

/// Typed events delivered on a run's event stream.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Progress update; never terminal.
    Status(StatusUpdate),
    /// Terminal success event carrying the structured outcome.
    Final(FinalResult),
    /// Terminal failure signalled by the backend.
    ///
    /// `message` is `None` when the payload was missing or unreadable.
    Error { message: Option<String> },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final(_) | Self::Error { .. })
    }

    /// Channel name the event arrived on.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Final(_) => "final",
            Self::Error { .. } => "error",
        }
    }
}

/// Payload of a `status` event.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StatusUpdate {
    pub message: String,
    #[serde(default)]
    pub step: Option<String>,
    /// Heartbeats carry `null` here.
    #[serde(default)]
    pub progress: Option<f64>,
}

impl StatusUpdate {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            step: None,
            progress: None,
        }
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The step label, falling back to [`DEFAULT_STEP`] when absent or blank.
    pub fn step_or_default(&self) -> &str {
        self.step
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_STEP)
    }
}

/// Payload of a `final` event.
#[derive(Debug, Deserialize)]
pub(crate) struct FinalEnvelope {
    pub data: FinalResult,
}

/// Payload of an `error` event.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_defaults_when_absent_or_null() {
        let absent: StatusUpdate = serde_json::from_str(r#"{"message":"hi"}"#).expect("decode");
        assert_eq!(absent.step_or_default(), "processing");
        let null: StatusUpdate =
            serde_json::from_str(r#"{"message":"hi","step":null,"progress":null}"#)
                .expect("decode");
        assert_eq!(null.step_or_default(), "processing");
        assert_eq!(null.progress, None);
    }

    #[test]
    fn only_final_and_error_are_terminal() {
        assert!(!StreamEvent::Status(StatusUpdate::new("x")).is_terminal());
        assert!(StreamEvent::Error { message: None }.is_terminal());
    }
}
