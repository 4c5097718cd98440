//! Optional pattern filter for bucket names and keys.

use regex::bytes::Regex;

use crate::commands::CommandError;

/// Filters names by regular expression. An empty pattern matches everything.
///
/// Matching runs against the raw bytes of a name, not its display form.
#[derive(Debug, Default)]
pub struct Matcher {
    re: Option<Regex>,
}

impl Matcher {
    pub fn new(pattern: &str) -> Result<Matcher, CommandError> {
        if pattern.is_empty() {
            return Ok(Matcher::default());
        }
        let re = Regex::new(pattern).map_err(CommandError::Pattern)?;
        Ok(Matcher { re: Some(re) })
    }

    pub fn is_match(&self, name: &[u8]) -> bool {
        match &self.re {
            Some(re) => re.is_match(name),
            None => true,
        }
    }
}
