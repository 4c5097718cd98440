//! Plain stdin/stdout host for non-interactive use.

use std::io::{self, BufRead, Write};

use crate::io::{InputLine, IoError, IoHost, Output, PromptConfig, Signal};

/// Reads lines from any buffered reader and writes plain text to any writer.
///
/// Used for one-shot commands, where there is no line editor and no history.
pub struct StdioHost<R, W> {
    input: R,
    output: W,
    pending_input: Option<InputLine>,
    pending_signal: Option<Signal>,
}

impl StdioHost<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdioHost<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            pending_input: None,
            pending_signal: None,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self) -> Result<Option<String>, IoError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl<R: BufRead, W: Write> IoHost for StdioHost<R, W> {
    fn wait_for_input(&mut self) -> Result<(), IoError> {
        match self.read_line()? {
            Some(line) => self.pending_input = Some(InputLine { line }),
            None => self.pending_signal = Some(Signal::Eof),
        }
        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<InputLine>, IoError> {
        Ok(self.pending_input.take())
    }

    fn read_signal(&mut self) -> Result<Option<Signal>, IoError> {
        Ok(self.pending_signal.take())
    }

    fn ask(&mut self, question: &str) -> Result<Option<String>, IoError> {
        write!(self.output, "{} ", question)?;
        self.output.flush()?;
        self.read_line()
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        writeln!(self.output, "{}", output.text)?;
        Ok(())
    }

    fn write_prompt(&mut self, _config: PromptConfig) -> Result<(), IoError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.output.flush()?;
        Ok(())
    }
}
