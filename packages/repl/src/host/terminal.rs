//! Terminal host implementation using Reedline.
//!
//! This host provides interactive terminal I/O with:
//! - Readline-style line editing (Vi and Emacs modes)
//! - Tab completion of command aliases
//! - Highlighting of the command word and byte escapes
//! - Up-arrow recall of the persisted history

use std::borrow::Cow;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, default_vi_insert_keybindings, default_vi_normal_keybindings,
    ColumnarMenu, DefaultHinter, EditMode as ReedlineEditMode, Emacs, FileBackedHistory,
    History as _, HistoryItem, KeyCode, KeyModifiers, MenuBuilder, Prompt, PromptEditMode,
    PromptHistorySearch, PromptHistorySearchStatus, Reedline, ReedlineEvent, ReedlineMenu,
    Signal as ReedlineSignal, Vi,
};

use crate::completer::ReplCompleter;
use crate::config::EditMode;
use crate::highlighter::ReplHighlighter;
use crate::io::{InputLine, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};

/// Environment variable that forces the edit mode (`vi` or `emacs`).
pub const EDIT_MODE_ENV: &str = "BUCKETSH_EDIT_MODE";

/// Terminal host using Reedline for interactive I/O.
pub struct TerminalHost {
    line_editor: Reedline,
    pending_input: Option<InputLine>,
    pending_signal: Option<Signal>,
    current_prompt: PromptConfig,
}

impl TerminalHost {
    /// Create a terminal host.
    ///
    /// `commands` are `(alias, help)` pairs for completion and highlighting;
    /// `history` seeds the line editor's in-memory history, oldest first.
    pub fn new<'a>(
        commands: Vec<(String, String)>,
        history: impl IntoIterator<Item = &'a str>,
        capacity: usize,
        edit_mode: EditMode,
    ) -> io::Result<Self> {
        let aliases = commands.iter().map(|(alias, _)| alias.clone()).collect();
        let completer = Box::new(ReplCompleter::new(commands));
        let highlighter = Box::new(ReplHighlighter::new(aliases));
        let hinter = Box::new(
            DefaultHinter::default().with_style(Style::new().fg(Color::LightGray).dimmed()),
        );

        let completion_menu = Box::new(
            ColumnarMenu::default()
                .with_name("completion_menu")
                .with_text_style(Style::new().fg(Color::Cyan))
                .with_selected_text_style(Style::new().fg(Color::Black).on(Color::Cyan).bold()),
        );

        let use_vi = match edit_mode {
            EditMode::Vi => true,
            EditMode::Emacs => false,
            EditMode::Auto => should_use_vi_mode(),
        };
        let tab_completion = ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]);
        let edit_mode: Box<dyn ReedlineEditMode> = if use_vi {
            let mut insert_keybindings = default_vi_insert_keybindings();
            let normal_keybindings = default_vi_normal_keybindings();
            insert_keybindings.add_binding(KeyModifiers::NONE, KeyCode::Tab, tab_completion);
            Box::new(Vi::new(insert_keybindings, normal_keybindings))
        } else {
            let mut keybindings = default_emacs_keybindings();
            keybindings.add_binding(KeyModifiers::NONE, KeyCode::Tab, tab_completion);
            Box::new(Emacs::new(keybindings))
        };

        let mut recall = FileBackedHistory::new(capacity.max(1))
            .map_err(|e| io::Error::other(e.to_string()))?;
        for line in history {
            recall
                .save(HistoryItem::from_command_line(line))
                .map_err(|e| io::Error::other(e.to_string()))?;
        }

        let line_editor = Reedline::create()
            .with_completer(completer)
            .with_highlighter(highlighter)
            .with_hinter(hinter)
            .with_history(Box::new(recall))
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_edit_mode(edit_mode);

        Ok(Self {
            line_editor,
            pending_input: None,
            pending_signal: None,
            current_prompt: PromptConfig::default(),
        })
    }
}

impl IoHost for TerminalHost {
    fn wait_for_input(&mut self) -> Result<(), IoError> {
        let prompt = TerminalPrompt {
            prompt: self.current_prompt.prompt.clone(),
        };

        match self.line_editor.read_line(&prompt) {
            Ok(ReedlineSignal::Success(line)) => {
                self.pending_input = Some(InputLine { line });
            }
            Ok(ReedlineSignal::CtrlC) => {
                self.pending_signal = Some(Signal::Interrupt);
            }
            Ok(ReedlineSignal::CtrlD) => {
                self.pending_signal = Some(Signal::Eof);
            }
            Err(e) => {
                return Err(IoError::Io(format!("Reedline error: {}", e)));
            }
        }

        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<InputLine>, IoError> {
        Ok(self.pending_input.take())
    }

    fn read_signal(&mut self) -> Result<Option<Signal>, IoError> {
        Ok(self.pending_signal.take())
    }

    /// Answers are read straight from stdin, outside the line editor, so they
    /// never show up in history.
    fn ask(&mut self, question: &str) -> Result<Option<String>, IoError> {
        let mut stdout = io::stdout();
        write!(stdout, "{} ", question)?;
        stdout.flush()?;

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer)? == 0 {
            return Ok(None);
        }
        Ok(Some(answer.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        let styled = match output.style {
            OutputStyle::Normal => output.text,
            OutputStyle::Error => Color::Red.paint(&output.text).to_string(),
            OutputStyle::Info => Color::Cyan.paint(&output.text).to_string(),
        };
        writeln!(io::stdout(), "{}", styled)?;
        Ok(())
    }

    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError> {
        self.current_prompt = config;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        io::stdout().flush()?;
        Ok(())
    }
}

/// Prompt implementation for the terminal.
struct TerminalPrompt {
    prompt: String,
}

impl Prompt for TerminalPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.prompt)
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Vi(reedline::PromptViMode::Normal) => {
                Cow::Owned(format!("{} ", Color::Blue.bold().paint("[N]")))
            }
            _ => Cow::Borrowed(""),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed(": ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

/// Check if vi mode should be used based on environment configuration.
fn should_use_vi_mode() -> bool {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = std::env::var(var) {
            if is_vi_editor(&editor) {
                return true;
            }
        }
    }

    if check_inputrc_vi_mode() {
        return true;
    }

    match std::env::var(EDIT_MODE_ENV) {
        Ok(mode) => matches!(mode.to_lowercase().as_str(), "vi" | "vim"),
        Err(_) => false,
    }
}

fn is_vi_editor(editor: &str) -> bool {
    let editor = editor.to_lowercase();
    let name = editor.rsplit('/').next().unwrap_or(&editor);
    name.contains("vim") || name == "vi"
}

/// Check .inputrc for vi mode setting.
fn check_inputrc_vi_mode() -> bool {
    let inputrc_paths = [
        std::env::var("INPUTRC").ok().map(PathBuf::from),
        dirs::home_dir().map(|p| p.join(".inputrc")),
        Some(PathBuf::from("/etc/inputrc")),
    ];

    for path in inputrc_paths.into_iter().flatten() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            if content.lines().any(is_inputrc_vi_line) {
                return true;
            }
        }
    }

    false
}

/// `set editing-mode vi`
fn is_inputrc_vi_line(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    words == ["set", "editing-mode", "vi"]
}
