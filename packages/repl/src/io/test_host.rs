//! Test host implementation for in-memory I/O testing.
//!
//! This module provides a test implementation of the `IoHost` trait that uses
//! in-memory buffers instead of a real terminal, so the session loop and the
//! commands can be driven without terminal interaction.

use std::collections::VecDeque;

use super::{InputLine, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};

/// Test host with in-memory I/O buffers.
///
/// Input lines, signals and answers are queued and consumed in order.
/// Once both the input and the signal queue are empty the host reports
/// `Signal::Eof`, so a session driven by it always terminates.
#[derive(Debug, Default)]
pub struct TestHost {
    input_queue: VecDeque<String>,
    signal_queue: VecDeque<Signal>,
    answer_queue: VecDeque<String>,
    questions: Vec<String>,
    output_buffer: Vec<Output>,
    last_prompt: Option<PromptConfig>,
    flush_count: usize,
    close_count: usize,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_input(&mut self, line: impl Into<String>) {
        self.input_queue.push_back(line.into());
    }

    pub fn queue_inputs(&mut self, lines: impl IntoIterator<Item = impl Into<String>>) {
        for line in lines {
            self.queue_input(line);
        }
    }

    pub fn queue_signal(&mut self, signal: Signal) {
        self.signal_queue.push_back(signal);
    }

    /// Queue an answer for the next `ask()`.
    pub fn queue_answer(&mut self, answer: impl Into<String>) {
        self.answer_queue.push_back(answer.into());
    }

    /// Questions asked so far, in order.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn output(&self) -> &[Output] {
        &self.output_buffer
    }

    /// Output text only, one entry per line.
    pub fn output_text(&self) -> String {
        self.output_buffer
            .iter()
            .map(|o| o.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn output_with_style(&self, style: OutputStyle) -> Vec<&str> {
        self.output_buffer
            .iter()
            .filter(|o| o.style == style)
            .map(|o| o.text.as_str())
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.output_with_style(OutputStyle::Error)
    }

    pub fn last_prompt(&self) -> Option<&PromptConfig> {
        self.last_prompt.as_ref()
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    pub fn close_count(&self) -> usize {
        self.close_count
    }

    pub fn clear_output(&mut self) {
        self.output_buffer.clear();
    }
}

impl IoHost for TestHost {
    fn wait_for_input(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<InputLine>, IoError> {
        Ok(self.input_queue.pop_front().map(|line| InputLine { line }))
    }

    fn read_signal(&mut self) -> Result<Option<Signal>, IoError> {
        if let Some(signal) = self.signal_queue.pop_front() {
            return Ok(Some(signal));
        }
        if self.input_queue.is_empty() {
            return Ok(Some(Signal::Eof));
        }
        Ok(None)
    }

    fn ask(&mut self, question: &str) -> Result<Option<String>, IoError> {
        self.questions.push(question.to_string());
        Ok(self.answer_queue.pop_front())
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        self.output_buffer.push(output);
        Ok(())
    }

    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError> {
        self.last_prompt = Some(config);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.flush_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), IoError> {
        self.close_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_input_returns_queued_in_order() {
        let mut host = TestHost::new();
        host.queue_inputs(["first", "second"]);

        assert_eq!(host.read_input().unwrap().unwrap().line, "first");
        assert_eq!(host.read_input().unwrap().unwrap().line, "second");
        assert!(host.read_input().unwrap().is_none());
    }

    #[test]
    fn queued_signals_come_before_eof() {
        let mut host = TestHost::new();
        host.queue_input("stat");
        host.queue_signal(Signal::Interrupt);

        assert_eq!(host.read_signal().unwrap(), Some(Signal::Interrupt));
        assert_eq!(host.read_signal().unwrap(), None);
        host.read_input().unwrap();
        assert_eq!(host.read_signal().unwrap(), Some(Signal::Eof));
    }

    #[test]
    fn ask_records_questions_and_runs_dry() {
        let mut host = TestHost::new();
        host.queue_answer("y");

        assert_eq!(host.ask("continue?").unwrap().as_deref(), Some("y"));
        assert_eq!(host.ask("continue?").unwrap(), None);
        assert_eq!(host.questions().len(), 2);
    }

    #[test]
    fn output_with_style_filters() {
        let mut host = TestHost::new();
        host.write_output(Output::normal("normal")).unwrap();
        host.write_output(Output::error("error")).unwrap();
        host.write_output(Output::info("info")).unwrap();

        assert_eq!(host.errors(), vec!["error"]);
        assert_eq!(host.output_with_style(OutputStyle::Info), vec!["info"]);
        assert_eq!(host.output_text(), "normal\nerror\ninfo");

        host.clear_output();
        assert!(host.output().is_empty());
    }

    #[test]
    fn write_prompt_stores_config() {
        let mut host = TestHost::new();
        assert!(host.last_prompt().is_none());

        host.write_prompt(PromptConfig {
            prompt: "db >> ".to_string(),
        })
        .unwrap();
        assert_eq!(host.last_prompt().unwrap().prompt, "db >> ");
    }

    #[test]
    fn flush_and_close_are_counted() {
        let mut host = TestHost::new();
        host.flush().unwrap();
        host.flush().unwrap();
        host.close().unwrap();

        assert_eq!(host.flush_count(), 2);
        assert_eq!(host.close_count(), 1);
    }
}
