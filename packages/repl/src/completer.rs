use reedline::{Completer, Span, Suggestion};

/// Completes the command word from the registered aliases.
pub struct ReplCompleter {
    /// `(alias, help)` pairs in registration order.
    commands: Vec<(String, String)>,
}

impl ReplCompleter {
    pub fn new(commands: Vec<(String, String)>) -> Self {
        Self { commands }
    }
}

impl Completer for ReplCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        // Get the word being typed
        let line_to_pos = &line[..pos];
        let words: Vec<&str> = line_to_pos.split_whitespace().collect();

        if words.is_empty() || (words.len() == 1 && !line_to_pos.ends_with(char::is_whitespace)) {
            let prefix = words.first().copied().unwrap_or("");
            let start = pos - prefix.len();

            for (alias, help) in &self.commands {
                if alias.starts_with(prefix) {
                    suggestions.push(Suggestion {
                        value: alias.clone(),
                        description: Some(help.clone()),
                        style: None,
                        extra: None,
                        span: Span::new(start, pos),
                        append_whitespace: true,
                        match_indices: None,
                    });
                }
            }
        }

        suggestions
    }
}
