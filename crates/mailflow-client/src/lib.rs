//! Client for the email triage workflow.
//!
//! A submission is validated and posted to the backend, which answers with a
//! run id. The run's `text/event-stream` is then consumed one event at a time:
//! progress updates drive the status line, and the terminal event becomes an
//! assistant bubble in the conversation log.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mailflow_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let api = HttpWorkflowApi::new(ClientConfig::new("http://127.0.0.1:5000"))?;
//! let dispatcher = Dispatcher::new(Arc::new(api));
//! let mut ctx = RenderContext::headless();
//!
//! let outcome = dispatcher
//!     .submit_and_stream(&mut ctx, &EmailSubmission::new("Quote", "Need 10 laptops"))
//!     .await?;
//!
//! for bubble in ctx.log().iter() {
//!     println!("{}: {}", bubble.role(), bubble.text());
//! }
//! assert!(outcome.is_completed());
//! # Ok(())
//! # }
//! ```

/// Backend contract and its HTTP implementation.
pub mod api;
/// Client configuration.
pub mod config;
/// Stream consumer: run state, connection, dispatch loop.
pub mod consumer;
/// Conversation log, render context, and presentation surface.
pub mod conversation;
/// Submission dispatcher.
pub mod dispatch;
/// Error types.
pub mod errors;
/// Typed stream events.
pub mod event;
/// Final result formatting.
pub mod format;
/// Data model shared with the backend.
pub mod model;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Status line rendering.
pub mod status;
mod transport;

pub use api::{EventStream, HttpWorkflowApi, WorkflowApi};
pub use config::ClientConfig;
pub use consumer::{AbortHandle, Connection, Run, RunOutcome, RunStream, StreamConsumer};
pub use conversation::{Bubble, ConversationLog, NullSurface, RenderContext, Role, Surface};
pub use dispatch::Dispatcher;
pub use errors::ClientError;
pub use event::{StatusUpdate, StreamEvent};
pub use format::format_final;
pub use model::{
    Attachment, Bundle, Classification, EmailSubmission, FinalResult, Recommendation, RunId,
    SalesTicket, SupportTicket, TicketKind, TicketRecord,
};
pub use status::{StatusLine, render_status};
