use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque run identifier handed out by `POST /api/start`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Creates a run id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the run id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RunId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A raw file attached to a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    /// MIME type; the backend falls back to `application/octet-stream`.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Sets an explicit content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// The email a user submits to the workflow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmailSubmission {
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl EmailSubmission {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    /// Appends an attachment.
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Structured outcome of a finished workflow run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub classification: Classification,
    #[serde(default)]
    pub sales: Option<SalesTicket>,
    #[serde(default)]
    pub support: Option<SupportTicket>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub intent: String,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesTicket {
    pub ticket_id: String,
    pub message_to_rep: String,
    #[serde(default)]
    pub recommendations: Option<Vec<Recommendation>>,
    /// Ordered by the backend; rendered as received.
    #[serde(default)]
    pub bundles: Option<Vec<Bundle>>,
    #[serde(default)]
    pub follow_up_questions: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub sku: String,
    pub price_usd: f64,
    pub purpose: String,
    pub score: f64,
    pub reasoning: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub name: String,
    pub total_price_usd: f64,
    pub items: Vec<String>,
    pub score: f64,
    pub reasoning: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub ticket_id: String,
    pub message_to_rep: String,
    #[serde(default)]
    pub follow_up_questions: Option<Vec<String>>,
}

/// Ticket family, derived from the id prefix the backend assigns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketKind {
    Sales,
    Support,
    Unknown,
}

impl TicketKind {
    pub fn from_ticket_id(ticket_id: &str) -> Self {
        if ticket_id.starts_with("SR-") {
            Self::Sales
        } else if ticket_id.starts_with("SUP-") {
            Self::Support
        } else {
            Self::Unknown
        }
    }
}

/// Metadata the backend stores for each uploaded attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// A persisted ticket as returned by `GET /api/tickets/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub ticket_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub customer_hint: Option<String>,
    #[serde(default)]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub email_body: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInfo>,
    #[serde(default)]
    pub classification: serde_json::Value,
    /// Columns specific to one ticket family (e.g. support `intent`).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TicketRecord {
    pub fn kind(&self) -> TicketKind {
        TicketKind::from_ticket_id(&self.ticket_id)
    }
}
