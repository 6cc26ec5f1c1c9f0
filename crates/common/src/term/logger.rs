use std::fmt::Display;

use cliclack::{intro as cliclak_intro, log, outro as cliclak_outro, Theme, ThemeState};
use console::{style, Emoji, Term};

use crate::prompt::CliclackTheme;

const S_BAR: Emoji = Emoji("│", "|");

fn term_write(msg: impl Display) {
    let msg = &format!("{}", msg);
    let _ = Term::stderr().write_str(msg);
}

pub fn intro() {
    let _ = cliclak_intro(style(" AnyFlow CLI ").on_cyan().black());
}

pub fn outro(msg: impl Display) {
    let _ = cliclak_outro(msg);
}

pub fn info(msg: impl Display) {
    let _ = log::info(msg);
}

pub fn debug(msg: impl Display) {
    let msg = &format!("{}", msg);
    let log = CliclackTheme.format_log(msg, style("⚙").dim().to_string().as_str());
    term_write(log);
}

pub fn warn(msg: impl Display) {
    let _ = log::warning(msg);
}

pub fn error(msg: impl Display) {
    let _ = log::error(style(msg).red());
}

pub fn success(msg: impl Display) {
    let _ = log::success(msg);
}

pub fn step(msg: impl Display) {
    let _ = log::step(msg);
}

pub fn note(msg: impl Display, content: impl Display) {
    let _ = cliclack::note(msg, content);
}

pub fn error_note(msg: &str, content: &str) {
    let symbol = CliclackTheme.state_symbol(&ThemeState::Submit);
    let note = CliclackTheme
        .format_note(msg, content)
        .replace(&symbol, &CliclackTheme.error_symbol());
    term_write(note);
}

pub fn new_empty_line() {
    term_write("\n");
}

pub fn new_line() {
    term_write(format!(
        "{}\n",
        CliclackTheme.bar_color(&ThemeState::Submit).apply_to(S_BAR)
    ))
}
