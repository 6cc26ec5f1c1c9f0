pub use prompt::{init_prompt_theme, Prompt, PromptConfirm, PromptPassword};
pub use term::{error, logger, spinner};

pub mod cmd;
pub mod config;
pub mod env_file;
pub mod files;
mod prompt;
pub mod store;
mod term;
