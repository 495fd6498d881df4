//! CLI module for RagBuddy
//!
//! Handles command-line argument parsing, the interactive prompt and
//! terminal rendering.

pub mod args;
pub mod prompt;
pub mod render;

pub use args::{Args, Commands, Verbosity};
pub use prompt::{PromptInput, QuestionPrompt};
pub use render::{print_outcome, print_response};
