//! Command registry and dispatcher.
//!
//! A [`Registry`] owns the commands in registration order, which is also the
//! order `help` lists them in. [`Registry::execute`] resolves the first token
//! of a line to a command by alias, runs its argument checks, then runs it.
//! Every command-level failure is printed here as `error: <message>` and the
//! session carries on; only host I/O failures reach the caller.

pub mod db;

use std::rc::Rc;

use crate::context::Context;
use crate::io::IoError;
use crate::store::{Store, StoreError};
use crate::validate::{ValidationError, Validates};

/// Why a single command invocation failed.
#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("bad pattern syntax")]
    Pattern(#[source] regex::Error),

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Registry construction failures.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("alias '{0}' is already registered")]
    DuplicateAlias(String),
}

/// What the session loop should do after a line ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

type CheckFn = Box<dyn Fn(&[String]) -> Result<(), ValidationError>>;
type RunFn = Box<dyn Fn(&mut Context<'_>, &[String]) -> Result<(), CommandError>>;

/// How a command runs once its arguments are accepted.
pub enum Action {
    /// List commands, or describe one.
    Help,
    /// End the session.
    Exit,
    Run(RunFn),
}

/// A registered command.
pub struct Command {
    aliases: Vec<&'static str>,
    help: &'static str,
    usage: Option<&'static str>,
    check: CheckFn,
    action: Action,
}

impl Command {
    pub fn new(
        aliases: &[&'static str],
        help: &'static str,
        validates: Validates,
        run: impl Fn(&mut Context<'_>, &[String]) -> Result<(), CommandError> + 'static,
    ) -> Self {
        Self::with_action(aliases, help, validates, Action::Run(Box::new(run)))
    }

    fn with_action(
        aliases: &[&'static str],
        help: &'static str,
        validates: Validates,
        action: Action,
    ) -> Self {
        Self {
            aliases: aliases.to_vec(),
            help,
            usage: None,
            check: Box::new(validates.finish()),
            action,
        }
    }

    /// Attach a usage line, shown by `help <alias>`.
    pub fn with_usage(mut self, usage: &'static str) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn aliases(&self) -> &[&'static str] {
        &self.aliases
    }

    pub fn help(&self) -> &str {
        self.help
    }

    /// Long description: help text plus the usage line when there is one.
    pub fn usage_text(&self) -> String {
        match self.usage {
            Some(usage) => format!("{}.\nUsage: {}", self.help, usage),
            None => format!("{}    {}", self.aliases.join(", "), self.help),
        }
    }

    pub fn check(&self, args: &[String]) -> Result<(), ValidationError> {
        (self.check)(args)
    }
}

/// The ordered set of commands a session understands.
pub struct Registry {
    cmds: Vec<Command>,
}

impl Registry {
    /// A registry holding only the built-in `help` and `exit` commands.
    pub fn new() -> Self {
        let cmds = vec![
            Command::with_action(
                &["help", "h", "?"],
                "Print command help text. Specific a command name for more information about it.",
                Validates::new().max_args(1),
                Action::Help,
            ),
            Command::with_action(
                &["exit", "q"],
                "Exit.",
                Validates::new().num_args(0),
                Action::Exit,
            ),
        ];
        Self { cmds }
    }

    /// The built-ins plus every data command, all bound to `store`.
    pub fn with_store(store: Rc<dyn Store>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for cmd in db::commands(store) {
            registry.register(cmd)?;
        }
        Ok(registry)
    }

    /// Append a command. Fails if any of its aliases is already taken.
    pub fn register(&mut self, cmd: Command) -> Result<(), RegistryError> {
        if let Some(alias) = cmd.aliases.iter().find(|a| self.find(a).is_some()) {
            return Err(RegistryError::DuplicateAlias(alias.to_string()));
        }
        self.cmds.push(cmd);
        Ok(())
    }

    pub fn find(&self, alias: &str) -> Option<&Command> {
        self.cmds
            .iter()
            .find(|c| c.aliases.iter().any(|a| *a == alias))
    }

    pub fn commands(&self) -> &[Command] {
        &self.cmds
    }

    /// Every alias of every command, in registration order.
    pub fn aliases(&self) -> Vec<String> {
        self.cmds
            .iter()
            .flat_map(|c| c.aliases.iter().map(|a| a.to_string()))
            .collect()
    }

    /// Run one command line.
    pub fn execute(&self, ctx: &mut Context<'_>, line: &str) -> Result<Flow, IoError> {
        let mut tokens = line.split_whitespace();
        let name = match tokens.next() {
            Some(name) => name,
            None => return Ok(Flow::Continue),
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let cmd = match self.find_or_report(ctx, name)? {
            Some(cmd) => cmd,
            None => return Ok(Flow::Continue),
        };

        if let Err(e) = cmd.check(&args) {
            ctx.print_error(format!("error: {}", e))?;
            return Ok(Flow::Continue);
        }

        let result = match &cmd.action {
            Action::Exit => return Ok(Flow::Exit),
            Action::Help => self.help(ctx, &args),
            Action::Run(run) => run(ctx, &args),
        };
        match result {
            Ok(()) => Ok(Flow::Continue),
            Err(CommandError::Io(e)) => Err(e),
            Err(e) => {
                tracing::debug!(command = name, error = %e, "command failed");
                ctx.print_error(format!("error: {}", e))?;
                Ok(Flow::Continue)
            }
        }
    }

    fn find_or_report(&self, ctx: &mut Context<'_>, name: &str) -> Result<Option<&Command>, IoError> {
        let found = self.find(name);
        if found.is_none() {
            ctx.print_error(format!("unknown command: '{}', press ?/h for help", name))?;
        }
        Ok(found)
    }

    fn help(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<(), CommandError> {
        if let Some(name) = args.first() {
            if let Some(cmd) = self.find_or_report(ctx, name)? {
                ctx.println(cmd.usage_text())?;
            }
            return Ok(());
        }
        let listing: Vec<String> = self
            .cmds
            .iter()
            .map(|c| format!("{:<24} {}", c.aliases.join(", "), c.help))
            .collect();
        ctx.println(listing.join("\n"))?;
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
