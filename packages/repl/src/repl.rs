//! Platform-independent session loop and the shell entry point.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::commands::{Flow, Registry, RegistryError};
use crate::config::SessionConfig;
use crate::context::Context;
use crate::history::History;
use crate::host::{StdioHost, TerminalHost};
use crate::io::{ExitReason, IoError, IoHost};
use crate::store::{RedbStore, StoreError};

/// Failures that stop the shell before or outside a session.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// The platform-independent session loop.
pub struct ReplCore<'r> {
    registry: &'r Registry,
}

impl<'r> ReplCore<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Read and run lines until `exit`, end of input, or a host failure.
    pub fn run(&self, ctx: &mut Context<'_>) -> Result<ExitReason, IoError> {
        while ctx.next() {
            if ctx.do_line(self.registry)? == Flow::Exit {
                return Ok(ExitReason::UserExit);
            }
        }
        match ctx.take_err() {
            Some(e) => Err(e),
            None => Ok(ExitReason::Eof),
        }
    }
}

/// What to run and against which file.
#[derive(Debug, Clone)]
pub struct Options {
    pub database: PathBuf,
    /// Tokens of a one-shot command; empty for an interactive session.
    pub command: Vec<String>,
    /// Create the database file if it does not exist.
    pub create: bool,
    pub config: SessionConfig,
}

/// Open the database and run either one command or an interactive session.
///
/// Only failures to get going are returned; everything that goes wrong once
/// the session runs is reported to the user instead.
pub fn run(options: Options) -> Result<(), Error> {
    let store = open_database(&options.database, options.create)?;
    let registry = Registry::with_store(Rc::new(store))?;

    if !options.command.is_empty() {
        let mut host = StdioHost::stdio();
        return run_once(&registry, &mut host, &options.command, &options.config);
    }

    interactive(&registry, &options)
}

/// Join `tokens` into one line and run it once on `host`. History is neither
/// read nor written.
pub fn run_once(
    registry: &Registry,
    host: &mut dyn IoHost,
    tokens: &[String],
    config: &SessionConfig,
) -> Result<(), Error> {
    let line = tokens.join(" ");
    let mut ctx = Context::new(host, config);
    registry.execute(&mut ctx, &line)?;
    ctx.close()?;
    Ok(())
}

fn open_database(path: &Path, create: bool) -> Result<RedbStore, StoreError> {
    if create && !path.exists() {
        return RedbStore::create(path);
    }
    RedbStore::open(path)
}

fn interactive(registry: &Registry, options: &Options) -> Result<(), Error> {
    let config = &options.config;
    let mut history = History::new(&config.history_file, config.max_history_lines);
    let read_err = match history.read() {
        Ok(n) => {
            tracing::debug!(lines = n, "history loaded");
            None
        }
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read history");
            Some(e)
        }
    };

    let commands = registry
        .commands()
        .iter()
        .flat_map(|c| {
            c.aliases()
                .iter()
                .map(move |a| (a.to_string(), c.help().to_string()))
        })
        .collect();
    let mut host = TerminalHost::new(
        commands,
        history.lines(),
        config.max_history_lines,
        config.edit_mode,
    )
    .map_err(IoError::from)?;

    let mut ctx = Context::new(&mut host, config).with_history(history);
    if let Some(e) = read_err {
        ctx.print_error(format!("read history fails: {}", e))?;
    }
    ctx.set_prompt(SessionConfig::prompt_for(
        &options.database.display().to_string(),
    ));

    match ReplCore::new(registry).run(&mut ctx) {
        Ok(reason) => tracing::debug!(?reason, "session ended"),
        Err(e) => {
            tracing::warn!(error = %e, "input failed, ending session");
            ctx.print_error(format!("error: {}", e))?;
        }
    }
    ctx.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{InputLine, IoHost, Output, PromptConfig, Signal, TestHost};
    use std::collections::VecDeque;

    fn data_registry() -> Registry {
        Registry::with_store(Rc::new(RedbStore::in_memory().unwrap())).unwrap()
    }

    #[test]
    fn exit_command_ends_session() {
        let registry = data_registry();
        let mut host = TestHost::new();
        host.queue_inputs(["set b k v", "exit", "get b k"]);
        let result = {
            let mut ctx = Context::new(&mut host, &SessionConfig::default());
            ReplCore::new(&registry).run(&mut ctx)
        };

        assert_eq!(result.unwrap(), ExitReason::UserExit);
        assert!(host.output().is_empty());
        assert_eq!(host.close_count(), 1);
    }

    #[test]
    fn end_of_input_ends_session() {
        let registry = data_registry();
        let mut host = TestHost::new();
        host.queue_inputs(["set b k v", "get b k"]);
        let result = {
            let mut ctx = Context::new(&mut host, &SessionConfig::default());
            ReplCore::new(&registry).run(&mut ctx)
        };

        assert_eq!(result.unwrap(), ExitReason::Eof);
        assert_eq!(host.output_text(), "v");
    }

    #[test]
    fn command_errors_do_not_end_session() {
        let registry = data_registry();
        let mut host = TestHost::new();
        host.queue_inputs(["bogus", "get onlyone", "set b k v", "get b k", "q"]);
        let result = {
            let mut ctx = Context::new(&mut host, &SessionConfig::default());
            ReplCore::new(&registry).run(&mut ctx)
        };

        assert_eq!(result.unwrap(), ExitReason::UserExit);
        assert_eq!(host.errors().len(), 2);
        assert_eq!(host.output_with_style(crate::io::OutputStyle::Normal), vec!["v"]);
    }

    /// Fails on the second read, the way a broken terminal would.
    struct FailingHost {
        inputs: VecDeque<String>,
        outputs: Vec<Output>,
    }

    impl IoHost for FailingHost {
        fn wait_for_input(&mut self) -> Result<(), IoError> {
            if self.inputs.is_empty() {
                return Err(IoError::Io("terminal gone".to_string()));
            }
            Ok(())
        }

        fn read_input(&mut self) -> Result<Option<InputLine>, IoError> {
            Ok(self.inputs.pop_front().map(|line| InputLine { line }))
        }

        fn read_signal(&mut self) -> Result<Option<Signal>, IoError> {
            Ok(None)
        }

        fn ask(&mut self, _question: &str) -> Result<Option<String>, IoError> {
            Ok(None)
        }

        fn write_output(&mut self, output: Output) -> Result<(), IoError> {
            self.outputs.push(output);
            Ok(())
        }

        fn write_prompt(&mut self, _config: PromptConfig) -> Result<(), IoError> {
            Ok(())
        }
    }

    #[test]
    fn host_failure_is_returned() {
        let registry = data_registry();
        let mut host = FailingHost {
            inputs: VecDeque::from(vec!["stat".to_string()]),
            outputs: Vec::new(),
        };
        let result = {
            let mut ctx = Context::new(&mut host, &SessionConfig::default());
            ReplCore::new(&registry).run(&mut ctx)
        };

        assert!(matches!(result, Err(IoError::Io(msg)) if msg == "terminal gone"));
        assert_eq!(host.outputs.len(), 1);
    }

    #[test]
    fn missing_database_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_database(&dir.path().join("nope.db"), false);
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn create_flag_makes_a_new_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.db");
        open_database(&path, true).unwrap();
        assert!(path.exists());
        // A second open with the flag reuses the file.
        open_database(&path, true).unwrap();
    }

    #[test]
    fn one_shot_runs_tokens_as_one_line_without_history() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            history_file: dir.path().join("history"),
            ..SessionConfig::default()
        };
        let registry = data_registry();
        let tokens = |line: &str| line.split(' ').map(str::to_string).collect::<Vec<_>>();

        let mut host = TestHost::new();
        run_once(&registry, &mut host, &tokens("set b k1 v1"), &config).unwrap();
        run_once(&registry, &mut host, &tokens("keys b withvalue"), &config).unwrap();

        let text = host.output_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id  key  value");
        assert_eq!(lines[2], "1   k1   v1");
        assert!(host.errors().is_empty());
        assert_eq!(host.close_count(), 2);
        assert!(!config.history_file.exists());
    }

    #[test]
    fn one_shot_command_errors_are_printed_not_returned() {
        let registry = data_registry();
        let mut host = TestHost::new();
        let tokens = vec!["get".to_string(), "onlyone".to_string()];
        run_once(&registry, &mut host, &tokens, &SessionConfig::default()).unwrap();
        assert_eq!(host.errors().len(), 1);
    }
}
