//! I/O types for the shell.
//!
//! These types define the interface between the session core and its host.

/// A line of input from the user.
#[derive(Debug, Clone)]
pub struct InputLine {
    pub line: String,
}

/// A signal from the host (Ctrl+C, Ctrl+D, etc.).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// User pressed Ctrl+C; the current line is abandoned.
    Interrupt,
    /// User pressed Ctrl+D or the input closed.
    Eof,
}

/// Output to be written by the shell.
#[derive(Debug, Clone)]
pub struct Output {
    pub text: String,
    pub style: OutputStyle,
}

impl Output {
    pub fn normal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: OutputStyle::Normal,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: OutputStyle::Error,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: OutputStyle::Info,
        }
    }
}

/// Style hint for output rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputStyle {
    /// Command results: tables, values, help text.
    #[default]
    Normal,
    /// Reported failures (host may color them red).
    Error,
    /// Status messages such as not-found notices.
    Info,
}

/// Prompt configuration sent from the session to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptConfig {
    pub prompt: String,
}

/// Reason the interactive loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// User ran `exit` / `q`.
    UserExit,
    /// User pressed Ctrl+D or input ran out.
    Eof,
}
