//! Terminal styling for scores, states and status lines.

use console::Style;
use std::io::IsTerminal;
use std::sync::LazyLock;

use crate::semantic::ServiceState;

pub static THEME: LazyLock<Theme> = LazyLock::new(Theme::default);

/// Scores at or above this are shown as strong matches.
pub const STRONG_MATCH: f32 = 0.6;
/// Scores below this are shown dimmed.
pub const WEAK_MATCH: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct Theme {
    pub ok: Style,
    pub failed: Style,
    pub pending: Style,
    pub dim: Style,
    pub path: Style,
    pub ticker: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            ok: Style::new().green().bright(),
            failed: Style::new().red().bright(),
            pending: Style::new().yellow(),
            dim: Style::new().dim(),
            path: Style::new().magenta(),
            ticker: Style::new().cyan().bold(),
        }
    }
}

impl Theme {
    pub fn success_with_icon(&self, text: &str) -> String {
        self.with_icon(&self.ok, "✓", text)
    }

    pub fn error_with_icon(&self, text: &str) -> String {
        self.with_icon(&self.failed, "✗", text)
    }

    pub fn warning_with_icon(&self, text: &str) -> String {
        self.with_icon(&self.pending, "⚠", text)
    }

    /// Style for a similarity score by band.
    pub fn score_style(&self, score: f32) -> &Style {
        if score >= STRONG_MATCH {
            &self.ok
        } else if score >= WEAK_MATCH {
            &self.pending
        } else {
            &self.dim
        }
    }

    pub fn state_style(&self, state: ServiceState) -> &Style {
        match state {
            ServiceState::Ready => &self.ok,
            ServiceState::Failed => &self.failed,
            ServiceState::Uninitialized | ServiceState::Initializing => &self.pending,
        }
    }

    /// `NO_COLOR` or a non-terminal stdout turns styling off.
    pub fn colors_enabled() -> bool {
        std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
    }

    pub fn apply<T: std::fmt::Display>(&self, style: &Style, text: T) -> String {
        if Self::colors_enabled() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn with_icon(&self, style: &Style, icon: &str, text: &str) -> String {
        self.apply(style, format!("{icon} {text}"))
    }
}
