//! Terminal rendering of the conversation and status line.

use std::io::Write;

use mailflow_client::{Bubble, Role, StatusLine, Surface};

const BAR_WIDTH: usize = 20;

/// Prints each bubble as it is appended and each status change as a line.
///
/// Terminal output is append-only, so the newest entry is always in view.
pub struct TerminalSurface {
    out: Box<dyn Write + Send>,
}

impl TerminalSurface {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl Surface for TerminalSurface {
    fn bubble_appended(&mut self, _index: usize, bubble: &Bubble) {
        let _ = self.out.write_all(render_bubble(bubble).as_bytes());
        let _ = self.out.flush();
    }

    fn status_changed(&mut self, status: &StatusLine) {
        let _ = writeln!(self.out, "{}", render_status_line(status));
        let _ = self.out.flush();
    }
}

pub fn render_bubble(bubble: &Bubble) -> String {
    let label = match bubble.role() {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let mut out = format!("\n┌─ {label}\n");
    for line in bubble.text().trim_end_matches('\n').lines() {
        out.push_str("│ ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("└─\n");
    out
}

pub fn render_status_line(status: &StatusLine) -> String {
    let filled = usize::from(status.progress.min(100)) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        status.progress,
        status.text
    )
}
