use std::fmt;

use crate::status::StatusLine;

/// Who a bubble is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// One entry of the conversation. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bubble {
    role: Role,
    text: String,
}

impl Bubble {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Append-only, chronologically ordered record of bubbles.
#[derive(Clone, Debug, Default)]
pub struct ConversationLog {
    entries: Vec<Bubble>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bubble and returns its position.
    pub fn append(&mut self, bubble: Bubble) -> usize {
        self.entries.push(bubble);
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bubble> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&Bubble> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bubble> {
        self.entries.iter()
    }
}

/// Presentation hook notified of every visible change.
///
/// Implementations render the bubble and keep the newest entry in view.
pub trait Surface: Send {
    fn bubble_appended(&mut self, index: usize, bubble: &Bubble);

    fn status_changed(&mut self, status: &StatusLine);
}

/// Surface that renders nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn bubble_appended(&mut self, _index: usize, _bubble: &Bubble) {}

    fn status_changed(&mut self, _status: &StatusLine) {}
}

/// Everything a run renders into: the log, the status line, and the surface
/// that displays them.
pub struct RenderContext {
    log: ConversationLog,
    status: StatusLine,
    surface: Box<dyn Surface>,
}

impl RenderContext {
    pub fn new(surface: Box<dyn Surface>) -> Self {
        Self {
            log: ConversationLog::new(),
            status: StatusLine::default(),
            surface,
        }
    }

    /// A context that keeps state but displays nothing.
    pub fn headless() -> Self {
        Self::new(Box::new(NullSurface))
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    /// Appends a bubble and scrolls the surface to it.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> usize {
        let index = self.log.append(Bubble::new(role, text));
        if let Some(bubble) = self.log.get(index) {
            self.surface.bubble_appended(index, bubble);
        }
        index
    }

    pub fn user(&mut self, text: impl Into<String>) -> usize {
        self.append(Role::User, text)
    }

    pub fn assistant(&mut self, text: impl Into<String>) -> usize {
        self.append(Role::Assistant, text)
    }

    pub fn set_status(&mut self, status: StatusLine) {
        self.status = status;
        self.surface.status_changed(&self.status);
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::headless()
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("log", &self.log)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
