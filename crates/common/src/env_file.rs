//! Editing of `KEY=value` lines in dotenv files.

use std::path::Path;

use xshell::Shell;

/// Sets `key` to `value`, replacing every existing assignment of `key` or
/// appending a new line.
pub fn upsert_var(content: &str, key: &str, value: &str) -> String {
    let line = format!("{key}={value}");
    let mut replaced = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|existing| {
            if is_assignment_of(existing, key) {
                replaced = true;
                line.clone()
            } else {
                existing.to_owned()
            }
        })
        .collect();

    if !replaced {
        lines.push(line);
    }

    let mut updated = lines.join("\n");
    updated.push('\n');
    updated
}

/// Drops every assignment of `key`. Returns `None` when nothing was removed.
pub fn remove_var(content: &str, key: &str) -> Option<String> {
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| !is_assignment_of(line, key))
        .collect();

    if kept.len() == content.lines().count() {
        return None;
    }

    let mut updated = kept.join("\n");
    if !updated.is_empty() {
        updated.push('\n');
    }
    Some(updated)
}

pub fn contains_var(content: &str, key: &str) -> bool {
    content.lines().any(|line| is_assignment_of(line, key))
}

/// Upserts `key` in the file at `path`, creating the file when missing.
pub fn write_var(shell: &Shell, path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let content = if shell.path_exists(path) {
        shell.read_file(path)?
    } else {
        String::new()
    };
    shell.write_file(path, upsert_var(&content, key, value))?;
    Ok(())
}

/// Removes `key` from the file at `path`. A missing file is left alone.
pub fn delete_var(shell: &Shell, path: &Path, key: &str) -> anyhow::Result<bool> {
    if !shell.path_exists(path) {
        return Ok(false);
    }
    match remove_var(&shell.read_file(path)?, key) {
        Some(updated) => {
            shell.write_file(path, updated)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn is_assignment_of(line: &str, key: &str) -> bool {
    line.trim_start()
        .strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}
