//! Host implementations for the shell.
//!
//! The terminal host uses Reedline for interactive sessions; the stdio host
//! serves one-shot commands given on the command line.

pub mod stdio;
pub mod terminal;

pub use stdio::StdioHost;
pub use terminal::TerminalHost;
