//! I/O abstraction for the shell.
//!
//! The session core talks to its environment only through the `IoHost`
//! trait, so the same command set runs against a real terminal or against
//! an in-memory host in tests.

pub mod types;

#[cfg(test)]
pub mod test_host;

pub use types::*;

#[cfg(test)]
pub use test_host::TestHost;

/// Error type for I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Io(e.to_string())
    }
}

/// Host interface for shell I/O operations.
///
/// The session calls these methods to interact with the user. A terminal
/// host backs them with a line editor; tests back them with queues.
pub trait IoHost {
    /// Wait for input to become available.
    ///
    /// After this returns, `read_input()` yields `Some(InputLine)` if a line
    /// was entered, or `read_signal()` yields `Some(Signal)` if a signal was
    /// received.
    fn wait_for_input(&mut self) -> Result<(), IoError>;

    /// Read the next input line, if available.
    fn read_input(&mut self) -> Result<Option<InputLine>, IoError>;

    /// Read any pending signal (Ctrl+C, Ctrl+D).
    fn read_signal(&mut self) -> Result<Option<Signal>, IoError>;

    /// Ask a one-off question and read the answer.
    ///
    /// Answers never enter the command history. `Ok(None)` means the input
    /// device reached end of file.
    fn ask(&mut self, question: &str) -> Result<Option<String>, IoError>;

    /// Write output to the user.
    fn write_output(&mut self, output: Output) -> Result<(), IoError>;

    /// Update the prompt shown before the next input.
    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    /// Release the line editor. Called once, when the session closes.
    fn close(&mut self) -> Result<(), IoError> {
        self.flush()
    }
}
