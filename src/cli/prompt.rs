//! Interactive question prompt using rustyline
//!
//! Line editing with persistent history for `ragbuddy start`.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

const PROMPT: &str = "ragbuddy> ";

/// What the user typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    Question(String),
    Empty,
    Exit,
}

/// Classify one raw line
pub fn classify(line: &str) -> PromptInput {
    match line.trim() {
        "" => PromptInput::Empty,
        "exit" | "quit" | ":q" => PromptInput::Exit,
        question => PromptInput::Question(question.to_string()),
    }
}

/// Readline wrapper with optional on-disk history
pub struct QuestionPrompt {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl QuestionPrompt {
    /// Create a prompt; history is loaded from `history_file` when it exists
    pub fn with_history(history_file: Option<PathBuf>) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &history_file {
            if path.exists() {
                let _ = editor.load_history(path);
            }
        }

        Ok(Self {
            editor,
            history_path: history_file,
        })
    }

    /// Read one line. Ctrl-C and Ctrl-D both end the session.
    pub fn read(&mut self) -> Result<PromptInput> {
        match self.editor.readline(PROMPT) {
            Ok(line) => {
                let input = classify(&line);
                if let PromptInput::Question(question) = &input {
                    let _ = self.editor.add_history_entry(question.as_str());
                }
                Ok(input)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(PromptInput::Exit),
            Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
        }
    }

    /// Save history to disk
    pub fn save_history(&mut self) -> Result<()> {
        if let Some(path) = &self.history_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.editor.save_history(path)?;
        }
        Ok(())
    }
}
