use std::sync::Arc;

use tracing::{info, warn};

use crate::api::WorkflowApi;
use crate::consumer::{ERROR_PREFIX, GENERIC_STREAM_FAILURE, RunOutcome, RunStream, StreamConsumer};
use crate::conversation::RenderContext;
use crate::errors::ClientError;
use crate::model::{EmailSubmission, RunId};
use crate::status::StatusLine;

/// Shown when subject or body is missing.
pub const MISSING_INPUT_MESSAGE: &str = "Please provide both subject and email body.";

/// Validates submissions, starts workflow runs, and hands them to the
/// stream consumer.
pub struct Dispatcher {
    api: Arc<dyn WorkflowApi>,
    stream_buffer_capacity: usize,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn WorkflowApi>) -> Self {
        Self {
            api,
            stream_buffer_capacity: 128,
        }
    }

    /// Sets the bounded event buffer used for each run's stream.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub fn api(&self) -> &Arc<dyn WorkflowApi> {
        &self.api
    }

    /// Trims subject and body and rejects the submission if either is empty.
    pub fn validate(submission: &EmailSubmission) -> Result<EmailSubmission, ClientError> {
        let subject = submission.subject.trim();
        let body = submission.body.trim();
        if subject.is_empty() || body.is_empty() {
            return Err(ClientError::Validation(MISSING_INPUT_MESSAGE.into()));
        }
        Ok(EmailSubmission {
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: submission.attachments.clone(),
        })
    }

    /// Sends the submission and returns the new run id.
    ///
    /// Invalid input never reaches the network. Every failure is also
    /// rendered into `ctx` as an assistant bubble.
    pub async fn submit(
        &self,
        ctx: &mut RenderContext,
        submission: &EmailSubmission,
    ) -> Result<RunId, ClientError> {
        let submission = match Self::validate(submission) {
            Ok(submission) => submission,
            Err(err) => {
                ctx.assistant(MISSING_INPUT_MESSAGE);
                return Err(err);
            }
        };

        ctx.user(format!(
            "Subject: {}\n\n{}",
            submission.subject, submission.body
        ));
        ctx.set_status(StatusLine::starting());

        match self.api.start_run(&submission).await {
            Ok(run_id) => {
                info!(event = "run.started", run_id = %run_id, attachments = submission.attachments.len() as u64, "workflow run started");
                Ok(run_id)
            }
            Err(err) => {
                warn!(event = "run.start_failed", error = %err, "workflow run could not be started");
                ctx.assistant(format!("{ERROR_PREFIX}{}", err.user_message()));
                ctx.set_status(StatusLine::failed());
                Err(err)
            }
        }
    }

    /// Submits and opens the run's event stream without consuming it.
    ///
    /// Callers drive the returned stream and may cancel it through its abort
    /// handle.
    pub async fn start(
        &self,
        ctx: &mut RenderContext,
        submission: &EmailSubmission,
    ) -> Result<RunStream, ClientError> {
        let run_id = self.submit(ctx, submission).await?;
        match StreamConsumer::open(self.api.as_ref(), run_id.clone(), self.stream_buffer_capacity)
            .await
        {
            Ok(stream) => Ok(stream),
            Err(err) => {
                warn!(event = "stream.open_failed", run_id = %run_id, error = %err, "event stream could not be opened");
                ctx.assistant(format!("{ERROR_PREFIX}{GENERIC_STREAM_FAILURE}"));
                ctx.set_status(StatusLine::failed());
                Err(err)
            }
        }
    }

    /// Submits, streams to completion, and returns how the run ended.
    ///
    /// `Err` means the run never reached its event stream.
    pub async fn submit_and_stream(
        &self,
        ctx: &mut RenderContext,
        submission: &EmailSubmission,
    ) -> Result<RunOutcome, ClientError> {
        let mut stream = self.start(ctx, submission).await?;
        Ok(stream.drive(ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeApi;
    use crate::conversation::Role;
    use crate::conversation::testing::recording_context;
    use crate::event::{StatusUpdate, StreamEvent};
    use crate::model::{Attachment, Classification, FinalResult};

    fn final_result() -> FinalResult {
        FinalResult {
            classification: Classification {
                category: "sales".into(),
                intent: "specific_product_query".into(),
                confidence: 0.95,
                reasoning: "Asks about one SKU.".into(),
            },
            sales: None,
            support: None,
        }
    }

    #[tokio::test]
    async fn blank_subject_or_body_never_hits_network() {
        for (subject, body) in [("", "body"), ("subject", "   "), ("  \n", "\t")] {
            let api = Arc::new(FakeApi::with_events(vec![]));
            let dispatcher = Dispatcher::new(api.clone());
            let (mut ctx, _surface) = recording_context();

            let err = dispatcher
                .submit(&mut ctx, &EmailSubmission::new(subject, body))
                .await
                .expect_err("should fail validation");

            assert!(matches!(err, ClientError::Validation(_)));
            assert_eq!(api.start_calls(), 0);
            assert_eq!(api.open_calls(), 0);
            assert_eq!(ctx.log().len(), 1);
            let bubble = ctx.log().last().expect("bubble");
            assert_eq!(bubble.role(), Role::Assistant);
            assert_eq!(bubble.text(), MISSING_INPUT_MESSAGE);
        }
    }

    #[tokio::test]
    async fn valid_submission_appends_trimmed_user_bubble_and_sends_attachments() {
        let api = Arc::new(FakeApi::with_events(vec![]));
        let dispatcher = Dispatcher::new(api.clone());
        let (mut ctx, surface) = recording_context();
        let submission = EmailSubmission::new("  Quote request ", "Need 5 docks\n")
            .attach(Attachment::new("po.pdf", b"%PDF".to_vec()));

        let run_id = dispatcher.submit(&mut ctx, &submission).await.expect("submit");

        assert_eq!(run_id, RunId::new("run-1"));
        let bubble = ctx.log().get(0).expect("bubble");
        assert_eq!(bubble.role(), Role::User);
        assert_eq!(bubble.text(), "Subject: Quote request\n\nNeed 5 docks");
        assert_eq!(
            surface.status_renders(),
            vec![("Starting workflow...".to_string(), 0)]
        );
        let sent = api.submitted.lock().expect("lock");
        assert_eq!(sent[0].subject, "Quote request");
        assert_eq!(sent[0].attachments.len(), 1);
    }

    #[tokio::test]
    async fn start_failure_shows_error_and_opens_no_stream() {
        let mut fake = FakeApi::with_events(vec![]);
        fake.start = Err(ClientError::http_status(
            503,
            "start request failed with status 503 Service Unavailable: down",
        ));
        let api = Arc::new(fake);
        let dispatcher = Dispatcher::new(api.clone());
        let (mut ctx, _surface) = recording_context();

        let err = dispatcher
            .submit_and_stream(&mut ctx, &EmailSubmission::new("s", "b"))
            .await
            .expect_err("start should fail");

        assert_eq!(err.status_code(), Some(503));
        assert_eq!(api.open_calls(), 0);
        let last = ctx.log().last().expect("bubble");
        assert_eq!(last.role(), Role::Assistant);
        assert!(last.text().starts_with("❌ Error: start request failed"));
        assert_eq!(ctx.status(), &StatusLine::failed());
    }

    #[tokio::test]
    async fn stream_open_failure_is_visible() {
        let mut fake = FakeApi::with_events(vec![]);
        fake.open = Err(ClientError::http_status(404, "unknown run"));
        let dispatcher = Dispatcher::new(Arc::new(fake));
        let (mut ctx, _surface) = recording_context();

        let result = dispatcher
            .submit_and_stream(&mut ctx, &EmailSubmission::new("s", "b"))
            .await;

        assert!(result.is_err());
        assert_eq!(
            ctx.log().last().map(|b| b.text()),
            Some("❌ Error: Streaming failed.")
        );
        assert_eq!(ctx.status().progress, 0);
    }

    #[tokio::test]
    async fn full_run_produces_user_then_assistant_bubble() {
        let api = Arc::new(FakeApi::with_events(vec![
            Ok(StreamEvent::Status(
                StatusUpdate::new("Connected. Waiting for updates...")
                    .step("ui")
                    .progress(0.0),
            )),
            Ok(StreamEvent::Final(final_result())),
        ]));
        let dispatcher = Dispatcher::new(api.clone()).stream_buffer_capacity(4);
        let (mut ctx, surface) = recording_context();

        let outcome = dispatcher
            .submit_and_stream(&mut ctx, &EmailSubmission::new("Price?", "How much is LP-14?"))
            .await
            .expect("run");

        assert!(outcome.is_completed());
        let roles: Vec<Role> = ctx.log().iter().map(|b| b.role()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(
            surface.status_renders(),
            vec![
                ("Starting workflow...".to_string(), 0),
                ("[ui] Connected. Waiting for updates...".to_string(), 0),
                ("Done.".to_string(), 100),
            ]
        );
        assert_eq!(api.open_calls(), 1);
    }
}
