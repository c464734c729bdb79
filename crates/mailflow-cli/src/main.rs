//! Submit an email to the triage workflow and follow the run in the terminal.

mod attachments;
mod config;
mod surface;
mod ticket;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mailflow_client::observability::init_observability;
use mailflow_client::prelude::*;
use tracing::debug;

use crate::attachments::load_attachment;
use crate::surface::TerminalSurface;
use crate::ticket::render_ticket;

#[derive(Parser, Debug)]
#[command(name = "mailflow", version, about = "Email triage workflow client")]
struct Cli {
    /// Backend base URL (overrides MAILFLOW_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit an email and stream the workflow's progress.
    Send {
        #[arg(long)]
        subject: String,
        /// Email body text.
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,
        /// Read the email body from a file.
        #[arg(long)]
        body_file: Option<PathBuf>,
        /// File to attach; repeat for several.
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
    /// Look up a stored sales or support ticket.
    Ticket { ticket_id: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    config::init();
    init_observability();

    let cli = Cli::parse();
    let mut client_config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        client_config = client_config.base_url(base_url);
    }
    debug!(base_url = %client_config.base_url, "client configured");

    match cli.command {
        Command::Send {
            subject,
            body,
            body_file,
            attachments,
        } => {
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(path)) => tokio::fs::read_to_string(&path).await?,
                (None, None) => String::new(),
            };
            let mut submission = EmailSubmission::new(subject, body);
            for path in &attachments {
                submission = submission.attach(load_attachment(path).await?);
            }
            send(client_config, submission).await
        }
        Command::Ticket { ticket_id } => lookup_ticket(client_config, &ticket_id).await,
    }
}

async fn send(
    client_config: ClientConfig,
    submission: EmailSubmission,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let capacity = client_config.stream_buffer_capacity;
    let api = HttpWorkflowApi::new(client_config)?;
    let dispatcher = Dispatcher::new(Arc::new(api)).stream_buffer_capacity(capacity);
    let mut ctx = RenderContext::new(Box::new(TerminalSurface::stdout()));

    // Failures before streaming are already rendered as bubbles.
    let Ok(mut stream) = dispatcher.start(&mut ctx, &submission).await else {
        return Ok(ExitCode::FAILURE);
    };

    let abort = stream.abort_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });
    let outcome = stream.drive(&mut ctx).await;
    ctrl_c.abort();

    Ok(if outcome.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn lookup_ticket(
    client_config: ClientConfig,
    ticket_id: &str,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let api = HttpWorkflowApi::new(client_config)?;
    match api.fetch_ticket(ticket_id).await? {
        Some(record) => {
            print!("{}", render_ticket(&record));
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("No ticket found: {}", ticket_id.trim());
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_accepts_repeated_attachments() {
        let cli = Cli::try_parse_from([
            "mailflow",
            "--base-url",
            "http://localhost:5000",
            "send",
            "--subject",
            "Quote",
            "--body",
            "Need laptops",
            "--attach",
            "a.pdf",
            "--attach",
            "b.png",
        ])
        .expect("parse");
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:5000"));
        match cli.command {
            Command::Send { attachments, body, .. } => {
                assert_eq!(attachments.len(), 2);
                assert_eq!(body.as_deref(), Some("Need laptops"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn body_and_body_file_conflict() {
        let result = Cli::try_parse_from([
            "mailflow", "send", "--subject", "s", "--body", "b", "--body-file", "x.txt",
        ]);
        assert!(result.is_err());
    }
}
