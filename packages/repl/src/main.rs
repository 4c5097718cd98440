use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bucketsh_repl::config::{
    default_history_path, EditMode, SessionConfig, DEFAULT_MAX_HISTORY_LINES, DEFAULT_PAGE_SIZE,
};

/// bucketsh - Interactive shell for bucket store files
#[derive(Parser, Debug)]
#[command(name = "bucketsh")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database file to open
    database: PathBuf,

    /// Run this command once instead of starting an interactive session
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,

    /// History file
    #[arg(long, value_name = "FILE")]
    history: Option<PathBuf>,

    /// Maximum number of lines kept in the history file
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_HISTORY_LINES)]
    history_size: usize,

    /// Rows per page before asking whether to continue
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Create the database file if it does not exist
    #[arg(long)]
    create: bool,

    /// Force vi editing mode
    #[arg(long, conflicts_with = "emacs")]
    vi: bool,

    /// Force emacs editing mode
    #[arg(long)]
    emacs: bool,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BUCKETSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let edit_mode = if args.vi {
        EditMode::Vi
    } else if args.emacs {
        EditMode::Emacs
    } else {
        EditMode::Auto
    };

    let config = SessionConfig {
        history_file: args.history.unwrap_or_else(default_history_path),
        max_history_lines: args.history_size,
        page_size: args.page_size,
        edit_mode,
        ..SessionConfig::default()
    };

    let options = bucketsh_repl::Options {
        database: args.database,
        command: args.command,
        create: args.create,
        config,
    };

    if let Err(e) = bucketsh_repl::run(options) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
