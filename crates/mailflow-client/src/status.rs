use crate::event::StatusUpdate;

/// What the status line and progress indicator currently show.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    /// Always within `0..=100`.
    pub progress: u8,
}

impl StatusLine {
    pub fn new(text: impl Into<String>, progress: u8) -> Self {
        Self {
            text: text.into(),
            progress: progress.min(100),
        }
    }

    pub fn starting() -> Self {
        Self::new("Starting workflow...", 0)
    }

    pub fn done() -> Self {
        Self::new("Done.", 100)
    }

    pub fn failed() -> Self {
        Self::new("Failed.", 0)
    }
}

/// Clamps a reported progress value into `0..=100`.
pub fn clamp_progress(progress: f64) -> u8 {
    if progress.is_nan() {
        return 0;
    }
    progress.clamp(0.0, 100.0).round() as u8
}

/// Renders a status update as `[step] message`.
///
/// A missing progress keeps `previous_progress`.
pub fn render_status(update: &StatusUpdate, previous_progress: u8) -> StatusLine {
    let progress = update
        .progress
        .map(clamp_progress)
        .unwrap_or(previous_progress.min(100));
    StatusLine {
        text: format!("[{}] {}", update.step_or_default(), update.message),
        progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped() {
        assert_eq!(clamp_progress(-5.0), 0);
        assert_eq!(clamp_progress(150.0), 100);
        assert_eq!(clamp_progress(42.0), 42);
        assert_eq!(clamp_progress(99.6), 100);
    }

    #[test]
    fn text_uses_step_prefix_and_default_step() {
        let line = render_status(&StatusUpdate::new("Classifying").step("classify"), 0);
        assert_eq!(line.text, "[classify] Classifying");
        let line = render_status(&StatusUpdate::new("Working"), 0);
        assert_eq!(line.text, "[processing] Working");
    }

    #[test]
    fn missing_progress_keeps_previous_value() {
        let line = render_status(&StatusUpdate::new("Still working...").step("heartbeat"), 37);
        assert_eq!(line.progress, 37);
        let line = render_status(&StatusUpdate::new("x").progress(150.0), 37);
        assert_eq!(line.progress, 100);
        let line = render_status(&StatusUpdate::new("x").progress(-5.0), 37);
        assert_eq!(line.progress, 0);
    }
}
