//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, Attachment, Bubble, ClientConfig, ClientError, Dispatcher, EmailSubmission,
    FinalResult, HttpWorkflowApi, RenderContext, Role, RunId, RunOutcome, RunStream, StatusLine,
    Surface, WorkflowApi,
};
