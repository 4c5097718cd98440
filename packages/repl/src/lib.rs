//! # bucketsh-repl
//!
//! An interactive shell for bucket store files.
//!
//! The shell browses buckets, nested buckets and key/value pairs, filters them
//! with regular expressions, and runs bulk maintenance such as copying,
//! removing and merging buckets. Binary keys and values are shown with `\xHH`
//! escapes and can be typed back in the same form.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive session with history
//! bucketsh data.db
//!
//! # One command, then exit
//! bucketsh data.db keys users withvalue
//!
//! # Inside the shell:
//! data.db >> set users alice admin
//! data.db >> get users alice
//! data.db >> keys users ^a withvalue
//! data.db >> merge-all-buckets-into-one everything
//! ```

pub mod codec;
pub mod commands;
pub mod completer;
pub mod config;
pub mod context;
pub mod highlighter;
pub mod history;
pub mod host;
pub mod io;
pub mod matcher;
pub mod pager;
pub mod repl;
pub mod store;
pub mod table;
pub mod validate;

pub use context::Context;
pub use repl::{run, run_once, Options};
