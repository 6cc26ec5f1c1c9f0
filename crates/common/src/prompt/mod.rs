use cliclack::{Theme, ThemeState};
use console::Style;

pub use self::{confirm::PromptConfirm, input::Prompt, password::PromptPassword};

mod confirm;
mod input;
mod password;

pub struct CliclackTheme;

impl Theme for CliclackTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().cyan(),
            ThemeState::Error(_) => Style::new().yellow(),
            _ => Style::new().cyan().dim(),
        }
    }
}

pub fn init_prompt_theme() {
    cliclack::set_theme(CliclackTheme);
}
