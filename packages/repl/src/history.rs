//! Persisted command history.
//!
//! The history file holds one command line per line, least recently used
//! first. When a line is entered again it moves to the end instead of being
//! stored twice, and the file never holds more than the configured number of
//! lines: the oldest lines are the ones dropped.

use std::collections::HashSet;
use std::fs;
use std::hash::Hash;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
#[error("history file {}: {source}", .path.display())]
pub struct HistoryError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl HistoryError {
    fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// History lines of the current session plus those loaded from disk.
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
    max_lines: usize,
    loaded: Vec<String>,
    appended: Vec<String>,
}

impl History {
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines,
            loaded: Vec::new(),
            appended: Vec::new(),
        }
    }

    /// Load the history file. Returns the number of lines read.
    ///
    /// Lines that are not valid UTF-8 are loaded with replacement characters;
    /// the file itself keeps them as they are.
    pub fn read(&mut self) -> Result<usize, HistoryError> {
        let raw = fs::read(&self.path).map_err(|e| HistoryError::new(&self.path, e))?;
        self.loaded = split_lines(&raw)
            .into_iter()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();
        tracing::debug!(path = %self.path.display(), lines = self.loaded.len(), "loaded history");
        Ok(self.loaded.len())
    }

    /// Record a line entered during this session.
    pub fn append(&mut self, line: &str) {
        self.appended.push(line.to_string());
    }

    /// Every known line, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.loaded
            .iter()
            .chain(&self.appended)
            .map(String::as_str)
    }

    /// Append this session's lines to the file, then compact it.
    ///
    /// Returns the number of lines appended. The file is created private to
    /// the user if it does not exist yet.
    pub fn write(&mut self) -> Result<usize, HistoryError> {
        let err = |e| HistoryError::new(&self.path, e);

        let mut options = fs::OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(err)?;
        for line in &self.appended {
            writeln!(file, "{}", line).map_err(err)?;
        }
        file.flush().map_err(err)?;
        drop(file);

        let n = self.appended.len();
        keep_max_lines(&self.path, self.max_lines)?;
        self.loaded.append(&mut self.appended);
        Ok(n)
    }
}

/// Lines of `raw` without their terminators. A `\r` before the newline is
/// dropped too, and a last line without a newline still counts.
fn split_lines(raw: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = raw
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect();
    if raw.is_empty() || raw.ends_with(b"\n") {
        lines.pop();
    }
    lines
}

/// Fold duplicates so each line appears once, at the position of its most
/// recent use, and keep only the newest `max_lines` lines.
pub fn compact<I, T>(lines: I, max_lines: usize) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: DoubleEndedIterator,
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for line in lines.into_iter().rev() {
        if kept.len() >= max_lines {
            break;
        }
        if seen.insert(line.clone()) {
            kept.push(line);
        }
    }
    kept.reverse();
    kept
}

/// Rewrite the history file at `path` in compacted form.
///
/// Lines are compared as bytes, so a line that is not valid UTF-8 is kept or
/// dropped like any other. The new content goes to a temporary file next to the original, which
/// takes over the original's permission bits and then replaces it.
pub fn keep_max_lines(path: &Path, max_lines: usize) -> Result<(), HistoryError> {
    let err = |e| HistoryError::new(path, e);

    let meta = fs::metadata(path).map_err(err)?;
    let raw = fs::read(path).map_err(err)?;
    let lines = split_lines(&raw);
    let total = lines.len();
    let kept = compact(lines, max_lines);

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let prefix = match path.file_name() {
        Some(name) => format!("{}.", name.to_string_lossy()),
        None => ".history.".to_string(),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .tempfile_in(dir)
        .map_err(err)?;
    tmp.as_file()
        .set_permissions(meta.permissions())
        .map_err(err)?;
    for line in &kept {
        tmp.write_all(line).map_err(err)?;
        tmp.write_all(b"\n").map_err(err)?;
    }
    tmp.flush().map_err(err)?;
    tmp.persist(path).map_err(|e| err(e.error))?;

    tracing::debug!(path = %path.display(), before = total, after = kept.len(), "compacted history");
    Ok(())
}
