//! Interactive session state.
//!
//! A [`Context`] owns the prompt, the last line read, an error slot and the
//! command history for one run of the shell, and borrows the host that does
//! the actual I/O. It is closed exactly once: explicitly through
//! [`Context::close`] or, failing that, when it is dropped.

use crate::commands::{Flow, Registry};
use crate::config::SessionConfig;
use crate::history::{History, HistoryError};
use crate::io::{IoError, IoHost, Output, PromptConfig, Signal};

pub struct Context<'h> {
    host: &'h mut dyn IoHost,
    prompt: String,
    page_size: usize,
    command: String,
    err: Option<IoError>,
    history: Option<History>,
    closed: bool,
}

impl<'h> Context<'h> {
    pub fn new(host: &'h mut dyn IoHost, config: &SessionConfig) -> Self {
        Self {
            host,
            prompt: config.prompt.clone(),
            page_size: config.page_size,
            command: String::new(),
            err: None,
            history: None,
            closed: false,
        }
    }

    /// Record entered lines in `history` and persist them on close.
    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Rows per page for listings.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The line most recently returned by [`Context::next`].
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Read the next non-blank line.
    ///
    /// Ctrl-C abandons the current line and prompts again. Returns `false`
    /// at end of input or when the host fails; in the latter case the error
    /// is kept and can be collected with [`Context::take_err`].
    pub fn next(&mut self) -> bool {
        match self.read_line() {
            Ok(Some(line)) => {
                self.command = line;
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.err = Some(e);
                false
            }
        }
    }

    fn read_line(&mut self) -> Result<Option<String>, IoError> {
        loop {
            self.host.write_prompt(PromptConfig {
                prompt: self.prompt.clone(),
            })?;
            self.host.wait_for_input()?;

            match self.host.read_signal()? {
                Some(Signal::Interrupt) => continue,
                Some(Signal::Eof) => return Ok(None),
                None => {}
            }

            if let Some(input) = self.host.read_input()? {
                if input.line.trim().is_empty() {
                    continue;
                }
                return Ok(Some(input.line));
            }
        }
    }

    /// Run the current line against `registry` and remember it in history.
    pub fn do_line(&mut self, registry: &Registry) -> Result<Flow, IoError> {
        let line = self.command.clone();
        let flow = registry.execute(self, &line)?;
        if let Some(history) = self.history.as_mut() {
            history.append(&line);
        }
        Ok(flow)
    }

    pub fn take_err(&mut self) -> Option<IoError> {
        self.err.take()
    }

    pub fn println(&mut self, text: impl Into<String>) -> Result<(), IoError> {
        self.host.write_output(Output::normal(text))
    }

    pub fn print_error(&mut self, text: impl Into<String>) -> Result<(), IoError> {
        self.host.write_output(Output::error(text))
    }

    pub fn print_info(&mut self, text: impl Into<String>) -> Result<(), IoError> {
        self.host.write_output(Output::info(text))
    }

    /// Ask a yes/no style question. `Ok(None)` means input ended.
    pub fn ask(&mut self, question: &str) -> Result<Option<String>, IoError> {
        self.host.flush()?;
        self.host.ask(question)
    }

    /// Load the history file. Returns the number of lines read.
    pub fn read_history(&mut self) -> Result<usize, HistoryError> {
        match self.history.as_mut() {
            Some(history) => history.read(),
            None => Ok(0),
        }
    }

    /// Persist this session's lines. Returns the number of lines written.
    pub fn write_history(&mut self) -> Result<usize, HistoryError> {
        match self.history.as_mut() {
            Some(history) => history.write(),
            None => Ok(0),
        }
    }

    /// Save history and release the host. Later calls do nothing.
    ///
    /// A history failure is reported but does not stop the host from being
    /// closed.
    pub fn close(&mut self) -> Result<(), IoError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.write_history() {
            tracing::warn!(error = %e, "failed to save history");
            self.print_error(format!("write history fails: {}", e))?;
        }
        self.host.close()
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close session");
        }
    }
}
