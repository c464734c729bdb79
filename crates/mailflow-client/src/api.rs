use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::event::StreamEvent;
use crate::model::{EmailSubmission, RunId, TicketRecord};
use crate::transport::{SseDecoder, decode_frame};

/// Typed events of one run, in server emission order.
pub type EventStream =
    Pin<Box<dyn futures::Stream<Item = Result<StreamEvent, ClientError>> + Send + 'static>>;

pub(crate) type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Backend contract consumed by the dispatcher and the stream consumer.
#[async_trait::async_trait]
pub trait WorkflowApi: Send + Sync {
    /// `POST /api/start`; returns the run id of the new workflow run.
    async fn start_run(&self, submission: &EmailSubmission) -> Result<RunId, ClientError>;

    /// `GET /api/stream/{run_id}`; opens the run's event stream.
    async fn open_stream(&self, run_id: &RunId) -> Result<EventStream, ClientError>;

    /// `GET /api/tickets/{ticket_id}`; `Ok(None)` when the backend has no such ticket.
    async fn fetch_ticket(&self, ticket_id: &str) -> Result<Option<TicketRecord>, ClientError>;
}

#[derive(Deserialize)]
struct StartResponse {
    run_id: Option<String>,
}

#[derive(Deserialize)]
struct TicketEnvelope {
    #[serde(default)]
    found: bool,
    #[serde(default)]
    data: Option<TicketRecord>,
}

/// `WorkflowApi` over HTTP with reqwest.
pub struct HttpWorkflowApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpWorkflowApi {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a client from `MAILFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl WorkflowApi for HttpWorkflowApi {
    async fn start_run(&self, submission: &EmailSubmission) -> Result<RunId, ClientError> {
        let form = build_form(submission)?;
        debug!(
            event = "start.request",
            attachments = submission.attachments.len() as u64,
            "submitting email to workflow"
        );
        let response = self
            .client
            .post(self.config.start_url()?)
            .timeout(self.config.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("start request failed: {e}")))?;
        let response = ensure_success(response, "start request").await?;
        let payload: StartResponse = response
            .json()
            .await
            .map_err(|e| ClientError::transport(format!("invalid start response: {e}")))?;
        match payload.run_id.map(|id| id.trim().to_string()) {
            Some(run_id) if !run_id.is_empty() => Ok(RunId::new(run_id)),
            _ => Err(ClientError::transport("start response has no run_id")),
        }
    }

    async fn open_stream(&self, run_id: &RunId) -> Result<EventStream, ClientError> {
        debug!(event = "stream.request", run_id = %run_id, "opening event stream");
        let response = self
            .client
            .get(self.config.stream_url(run_id.as_str())?)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("stream request failed: {e}")))?;
        let response = ensure_success(response, "stream request").await?;
        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(Box::pin(sse_event_stream(bytes_stream)))
    }

    async fn fetch_ticket(&self, ticket_id: &str) -> Result<Option<TicketRecord>, ClientError> {
        let ticket_id = ticket_id.trim();
        if ticket_id.is_empty() {
            return Err(ClientError::Validation("ticket id must not be empty".into()));
        }
        let response = self
            .client
            .get(self.config.ticket_url(ticket_id)?)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("ticket request failed: {e}")))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(event = "ticket.not_found", ticket_id, "ticket lookup missed");
            return Ok(None);
        }
        let response = ensure_success(response, "ticket request").await?;
        let envelope: TicketEnvelope = response
            .json()
            .await
            .map_err(|e| ClientError::transport(format!("invalid ticket response: {e}")))?;
        Ok(envelope.data.filter(|_| envelope.found))
    }
}

fn build_form(submission: &EmailSubmission) -> Result<Form, ClientError> {
    let mut form = Form::new()
        .text("subject", submission.subject.clone())
        .text("body", submission.body.clone());
    for attachment in &submission.attachments {
        let mut part = Part::bytes(attachment.bytes.to_vec()).file_name(attachment.file_name.clone());
        if let Some(content_type) = attachment.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(|e| {
                ClientError::Validation(format!(
                    "invalid content type for {}: {e}",
                    attachment.file_name
                ))
            })?;
        }
        form = form.part("attachments", part);
    }
    Ok(form)
}

async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(ClientError::http_status(
        status.as_u16(),
        format!("{what} failed with status {status}: {}", body.trim()),
    ))
}

/// Decodes a byte stream into run events.
///
/// A malformed frame ends the stream, after the events decoded ahead of it
/// in the same chunk.
pub(crate) fn sse_event_stream(
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<StreamEvent, ClientError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<Result<StreamEvent, ClientError>>,
        done: bool,
    }

    stream::unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.done {
                    return None;
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk) {
                            match decode_frame(&frame) {
                                Ok(Some(event)) => state.pending.push_back(Ok(event)),
                                Ok(None) => {}
                                Err(err) => {
                                    state.pending.push_back(Err(err));
                                    state.done = true;
                                    break;
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        state
                            .pending
                            .push_back(Err(ClientError::transport(format!("stream read failed: {e}"))));
                    }
                    None => {
                        state.done = true;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// In-memory backend with scripted answers.
    pub struct FakeApi {
        pub start: Result<RunId, ClientError>,
        pub open: Result<Vec<Result<StreamEvent, ClientError>>, ClientError>,
        /// Keep the stream open after the scripted events.
        pub hang_after_events: bool,
        pub start_calls: AtomicUsize,
        pub open_calls: AtomicUsize,
        pub submitted: Mutex<Vec<EmailSubmission>>,
    }

    impl FakeApi {
        pub fn with_events(events: Vec<Result<StreamEvent, ClientError>>) -> Self {
            Self {
                start: Ok(RunId::new("run-1")),
                open: Ok(events),
                hang_after_events: false,
                start_calls: AtomicUsize::new(0),
                open_calls: AtomicUsize::new(0),
                submitted: Mutex::new(Vec::new()),
            }
        }

        pub fn start_calls(&self) -> usize {
            self.start_calls.load(Ordering::SeqCst)
        }

        pub fn open_calls(&self) -> usize {
            self.open_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl WorkflowApi for FakeApi {
        async fn start_run(&self, submission: &EmailSubmission) -> Result<RunId, ClientError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            self.submitted
                .lock()
                .expect("lock")
                .push(submission.clone());
            self.start.clone()
        }

        async fn open_stream(&self, _run_id: &RunId) -> Result<EventStream, ClientError> {
            self.open_calls.fetch_add(1, Ordering::SeqCst);
            let events = self.open.clone()?;
            if self.hang_after_events {
                Ok(Box::pin(stream::iter(events).chain(stream::pending())))
            } else {
                Ok(Box::pin(stream::iter(events)))
            }
        }

        async fn fetch_ticket(&self, _ticket_id: &str) -> Result<Option<TicketRecord>, ClientError> {
            Ok(None)
        }
    }
}
