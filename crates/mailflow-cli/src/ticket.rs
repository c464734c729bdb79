use std::fmt::Write as _;

use mailflow_client::{TicketKind, TicketRecord};

/// Human-readable summary of a stored ticket.
pub fn render_ticket(record: &TicketRecord) -> String {
    let kind = match record.kind() {
        TicketKind::Sales => "sales",
        TicketKind::Support => "support",
        TicketKind::Unknown => "unknown",
    };
    let mut out = String::new();
    let _ = writeln!(out, "Ticket {} ({kind})", record.ticket_id);
    if let Some(created_at) = &record.created_at {
        let _ = writeln!(out, "Created: {created_at}");
    }
    if let Some(hint) = record.customer_hint.as_deref().filter(|h| !h.is_empty()) {
        let _ = writeln!(out, "Customer: {hint}");
    }
    if let Some(subject) = &record.email_subject {
        let _ = writeln!(out, "Subject: {subject}");
    }
    if let Some(body) = &record.email_body {
        let _ = writeln!(out, "\n{}", body.trim_end());
    }
    if !record.attachments.is_empty() {
        let _ = writeln!(out, "\nAttachments:");
        for a in &record.attachments {
            let _ = writeln!(out, "  - {} ({}, {} bytes)", a.filename, a.content_type, a.size_bytes);
        }
    }
    if !record.classification.is_null() {
        let pretty = serde_json::to_string_pretty(&record.classification)
            .unwrap_or_else(|_| record.classification.to_string());
        let _ = writeln!(out, "\nClassification:\n{pretty}");
    }
    out
}
