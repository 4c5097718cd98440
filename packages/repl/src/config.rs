//! Session configuration.

use std::path::PathBuf;

/// Default prompt before a database is opened.
pub const DEFAULT_PROMPT: &str = ">> ";

/// Default cap on persisted history lines.
pub const DEFAULT_MAX_HISTORY_LINES: usize = 65536;

/// Rows per page before the pager asks whether to continue.
pub const DEFAULT_PAGE_SIZE: usize = 32;

const HISTORY_FILE_NAME: &str = ".bucketsh.history";

/// Line editing style of the terminal host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditMode {
    /// Pick vi or emacs from the environment.
    #[default]
    Auto,
    Vi,
    Emacs,
}

/// Everything a session needs to know up front.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub history_file: PathBuf,
    pub max_history_lines: usize,
    pub prompt: String,
    pub page_size: usize,
    pub edit_mode: EditMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_file: default_history_path(),
            max_history_lines: DEFAULT_MAX_HISTORY_LINES,
            prompt: DEFAULT_PROMPT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            edit_mode: EditMode::Auto,
        }
    }
}

impl SessionConfig {
    /// Prompt shown once `filename` is open.
    pub fn prompt_for(filename: &str) -> String {
        format!("{} {}", filename, DEFAULT_PROMPT)
    }
}

/// `$HOME/.bucketsh.history`, or the temp dir when there is no home.
pub fn default_history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(HISTORY_FILE_NAME)
}
