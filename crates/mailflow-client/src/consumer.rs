use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{EventStream, WorkflowApi};
use crate::conversation::RenderContext;
use crate::errors::ClientError;
use crate::event::{StatusUpdate, StreamEvent};
use crate::format::format_final;
use crate::model::{FinalResult, RunId};
use crate::status::{StatusLine, render_status};

/// Prefix of every failure bubble.
pub const ERROR_PREFIX: &str = "❌ Error: ";
/// Shown when the stream breaks or the backend's error carries no message.
pub const GENERIC_STREAM_FAILURE: &str = "Streaming failed.";

type EventItem = Result<StreamEvent, ClientError>;

/// Client-side state of one workflow run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Run {
    run_id: RunId,
    progress: u8,
    status_text: String,
    terminal: bool,
}

impl Run {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            progress: 0,
            status_text: String::new(),
            terminal: false,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Applies a progress update; `None` once the run is terminal.
    fn apply_status(&mut self, update: &StatusUpdate) -> Option<StatusLine> {
        if self.terminal {
            return None;
        }
        let line = render_status(update, self.progress);
        self.set_line(&line);
        Some(line)
    }

    /// Marks the run terminal with its last status. Returns false if it already was.
    fn finish(&mut self, line: &StatusLine) -> bool {
        if self.terminal {
            return false;
        }
        self.set_line(line);
        self.terminal = true;
        true
    }

    fn set_line(&mut self, line: &StatusLine) {
        self.progress = line.progress;
        self.status_text = line.text.clone();
    }
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Completed(FinalResult),
    Failed(ClientError),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Handle used to cancel a run that is still streaming.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The run ends with a `Cancelled` failure the next time the dispatch
    /// loop is polled.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// The open event connection of a run.
///
/// Owns the reader task and the receiving end of the event channel.
pub struct Connection {
    pump: Option<JoinHandle<()>>,
    rx: Option<mpsc::Receiver<EventItem>>,
}

impl Connection {
    fn new(pump: JoinHandle<()>, rx: mpsc::Receiver<EventItem>) -> Self {
        Self {
            pump: Some(pump),
            rx: Some(rx),
        }
    }

    async fn recv(&mut self) -> Option<EventItem> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Stops the reader and drops undelivered events.
    ///
    /// Returns true only for the call that actually closed the connection.
    pub fn close(&mut self) -> bool {
        let Some(pump) = self.pump.take() else {
            return false;
        };
        pump.abort();
        self.rx = None;
        true
    }

    pub fn is_closed(&self) -> bool {
        self.pump.is_none()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens run event streams.
pub struct StreamConsumer;

impl StreamConsumer {
    /// Opens the event stream of `run_id` and starts reading it.
    ///
    /// Events are forwarded through a channel bounded by `buffer_capacity`.
    pub async fn open(
        api: &dyn WorkflowApi,
        run_id: RunId,
        buffer_capacity: usize,
    ) -> Result<RunStream, ClientError> {
        if buffer_capacity == 0 {
            return Err(ClientError::Config(
                "stream buffer capacity must be greater than 0".into(),
            ));
        }
        let events = api.open_stream(&run_id).await?;
        info!(event = "stream.opened", run_id = %run_id, "event stream connected");
        Ok(RunStream::from_events(run_id, events, buffer_capacity))
    }
}

/// A run and its single event connection.
///
/// `drive` processes events one at a time, in arrival order, until the first
/// terminal event.
pub struct RunStream {
    run: Run,
    connection: Connection,
    abort_handle: AbortHandle,
    abort_rx: watch::Receiver<bool>,
    processed: usize,
    outcome: Option<RunOutcome>,
}

impl RunStream {
    fn from_events(run_id: RunId, events: EventStream, buffer_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer_capacity);
        let (abort_tx, abort_rx) = watch::channel(false);
        let pump = tokio::spawn(pump_events(run_id.clone(), events, tx));
        Self {
            run: Run::new(run_id),
            connection: Connection::new(pump, rx),
            abort_handle: AbortHandle { tx: abort_tx },
            abort_rx,
            processed: 0,
            outcome: None,
        }
    }

    pub fn run(&self) -> &Run {
        &self.run
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// Number of events handled so far (ignored events excluded).
    pub fn processed_events(&self) -> usize {
        self.processed
    }

    /// The outcome, once the run has terminated.
    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    /// Consumes events until the run terminates and returns its outcome.
    ///
    /// A stream that ends without a terminal event fails the run. Calling this
    /// again after termination returns the same outcome.
    pub async fn drive(&mut self, ctx: &mut RenderContext) -> RunOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        loop {
            tokio::select! {
                biased;
                changed = self.abort_rx.changed() => {
                    if changed.is_ok() && *self.abort_rx.borrow() {
                        return self.fail(ctx, ClientError::Cancelled);
                    }
                }
                item = self.connection.recv() => {
                    let item = item.unwrap_or_else(|| {
                        Err(ClientError::transport("event stream ended before a terminal event"))
                    });
                    if let Some(outcome) = self.handle(ctx, item) {
                        return outcome;
                    }
                }
            }
        }
    }

    /// Handles a single event to completion.
    ///
    /// Returns the outcome when the event terminated the run. Events arriving
    /// after termination are ignored.
    pub fn handle(
        &mut self,
        ctx: &mut RenderContext,
        item: Result<StreamEvent, ClientError>,
    ) -> Option<RunOutcome> {
        if self.run.is_terminal() {
            debug!(event = "stream.event_ignored", run_id = %self.run.run_id(), "event after terminal");
            return None;
        }
        self.processed += 1;
        match item {
            Ok(StreamEvent::Status(update)) => {
                if let Some(line) = self.run.apply_status(&update) {
                    debug!(
                        event = "stream.status",
                        run_id = %self.run.run_id(),
                        step = update.step_or_default(),
                        progress = line.progress
                    );
                    ctx.set_status(line);
                }
                None
            }
            Ok(StreamEvent::Final(result)) => {
                ctx.assistant(format_final(&result));
                self.terminate(ctx, StatusLine::done());
                info!(event = "run.completed", run_id = %self.run.run_id(), "workflow finished");
                let outcome = RunOutcome::Completed(result);
                self.outcome = Some(outcome.clone());
                Some(outcome)
            }
            Ok(StreamEvent::Error { message }) => {
                let message = message.unwrap_or_else(|| GENERIC_STREAM_FAILURE.to_string());
                Some(self.fail(ctx, ClientError::Workflow(message)))
            }
            Err(err) => Some(self.fail(ctx, err)),
        }
    }

    fn fail(&mut self, ctx: &mut RenderContext, err: ClientError) -> RunOutcome {
        warn!(event = "run.failed", run_id = %self.run.run_id(), error = %err, "workflow run failed");
        ctx.assistant(stream_failure_text(&err));
        self.terminate(ctx, StatusLine::failed());
        let outcome = RunOutcome::Failed(err);
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn terminate(&mut self, ctx: &mut RenderContext, line: StatusLine) {
        if self.run.finish(&line) {
            ctx.set_status(line);
        }
        if self.connection.close() {
            debug!(event = "stream.closed", run_id = %self.run.run_id());
        }
    }
}

/// Bubble text for a run that failed while streaming.
pub fn stream_failure_text(err: &ClientError) -> String {
    match err {
        ClientError::Transport { .. } => format!("{ERROR_PREFIX}{GENERIC_STREAM_FAILURE}"),
        other => format!("{ERROR_PREFIX}{}", other.user_message()),
    }
}

async fn pump_events(run_id: RunId, mut events: EventStream, tx: mpsc::Sender<EventItem>) {
    while let Some(item) = events.next().await {
        let stop = item.is_err();
        if tx.send(item).await.is_err() {
            debug!(event = "stream.receiver_dropped", run_id = %run_id);
            return;
        }
        if stop {
            return;
        }
    }
}
