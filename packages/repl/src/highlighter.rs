use nu_ansi_term::{Color, Style};
use reedline::{Highlighter, StyledText};

/// Syntax highlighter for the shell.
///
/// The command word is green when it names a registered command and red
/// otherwise. In the arguments, `\xHH` byte escapes stand out from plain text.
pub struct ReplHighlighter {
    commands: Vec<String>,
}

impl ReplHighlighter {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }
}

impl Highlighter for ReplHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();

        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];
        if !indent.is_empty() {
            styled.push((Style::new(), indent.to_string()));
        }
        if trimmed.is_empty() {
            return styled;
        }

        let (command, rest) = match trimmed.find(char::is_whitespace) {
            Some(pos) => (&trimmed[..pos], &trimmed[pos..]),
            None => (trimmed, ""),
        };

        let cmd_style = if self.commands.iter().any(|c| c == command) {
            Style::new().bold().fg(Color::Green)
        } else {
            Style::new().fg(Color::Red)
        };
        styled.push((cmd_style, command.to_string()));

        push_arguments(&mut styled, rest);
        styled
    }
}

/// Split `rest` into plain runs and `\xHH` escapes.
fn push_arguments(styled: &mut StyledText, rest: &str) {
    let escape_style = Style::new().fg(Color::Magenta);
    let mut plain_start = 0;
    let mut i = 0;
    let bytes = rest.as_bytes();

    while i < bytes.len() {
        if is_escape(&bytes[i..]) {
            if plain_start < i {
                styled.push((Style::new(), rest[plain_start..i].to_string()));
            }
            styled.push((escape_style, rest[i..i + 4].to_string()));
            i += 4;
            plain_start = i;
        } else {
            i += 1;
        }
    }
    if plain_start < bytes.len() {
        styled.push((Style::new(), rest[plain_start..].to_string()));
    }
}

fn is_escape(b: &[u8]) -> bool {
    let hex = |c: u8| c.is_ascii_digit() || (b'a'..=b'f').contains(&c);
    b.len() >= 4 && b[0] == b'\\' && b[1] == b'x' && hex(b[2]) && hex(b[3])
}
