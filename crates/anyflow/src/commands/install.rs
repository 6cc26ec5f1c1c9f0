use std::path::{Path, PathBuf};

use anyflow_cli_common::{cmd::Cmd, logger, spinner::Spinner, Prompt};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use xshell::{cmd, Shell};

use crate::{
    consts::SDK_PACKAGE,
    context::CommandContext,
    messages::{
        msg_config_updated, msg_installing_sdk_spinner, MSG_CONFIG_NOT_FOUND,
        MSG_CONFIG_PATH_PROMPT, MSG_INSTALL_DONE, MSG_INSTALL_SDK_FAILED, MSG_MANUAL_CONFIG_NEEDED,
        MSG_NOT_A_CONFIG_FILE,
    },
};

const CONFIG_FILES: [&str; 2] = ["hardhat.config.ts", "hardhat.config.js"];
const SETUP_CALL: &str = "anyflow.setup();";
const MERGE_CALL: &str = "anyflow.mergeHardhatConfig(";

static DEFAULT_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+default\s+([A-Za-z0-9_$]+)\s*;?").expect("valid export pattern")
});
static MODULE_EXPORTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"module\.exports\s*=\s*([A-Za-z0-9_$]+)\s*;?").expect("valid exports pattern")
});
static TYPED_CONFIG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"const\s+(\w+)\s*:\s*HardhatUserConfig\s*=\s*\{").expect("valid config pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    TypeScript,
    JavaScript,
}

impl ConfigKind {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ts") => Self::TypeScript,
            _ => Self::JavaScript,
        }
    }

    fn sdk_import(self) -> &'static str {
        match self {
            Self::TypeScript => "import anyflow from 'anyflow-sdk';",
            Self::JavaScript => "const anyflow = require('anyflow-sdk');",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    pub fn detect(project_dir: &Path) -> Self {
        if project_dir.join("yarn.lock").exists() {
            Self::Yarn
        } else if project_dir.join("pnpm-lock.yaml").exists() {
            Self::Pnpm
        } else {
            Self::Npm
        }
    }

    fn install_dev_dependency<'a>(self, shell: &'a Shell, package: &str) -> xshell::Cmd<'a> {
        match self {
            Self::Npm => cmd!(shell, "npm install --save-dev {package}"),
            Self::Yarn => cmd!(shell, "yarn add --dev {package}"),
            Self::Pnpm => cmd!(shell, "pnpm add --save-dev {package}"),
        }
    }
}

pub(crate) fn run(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    let shell = ctx.shell;
    let config_path = match find_hardhat_config(&shell.current_dir()) {
        Some(path) => path,
        None => {
            logger::warn(MSG_CONFIG_NOT_FOUND);
            prompt_config_path(&shell.current_dir())?
        }
    };
    let project_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| shell.current_dir());

    let package_manager = PackageManager::detect(&project_dir);
    let spinner = Spinner::new(&msg_installing_sdk_spinner(package_manager));
    let _dir = shell.push_dir(&project_dir);
    let installed = Cmd::new(package_manager.install_dev_dependency(shell, SDK_PACKAGE))
        .with_verbose(ctx.global.debug)
        .run();
    if let Err(err) = installed {
        spinner.fail();
        return Err(err).context(MSG_INSTALL_SDK_FAILED);
    }
    spinner.finish();

    let content = shell.read_file(&config_path)?;
    let patched = update_hardhat_config(&content, ConfigKind::from_path(&config_path));
    if !patched.contains(MERGE_CALL) {
        logger::warn(MSG_MANUAL_CONFIG_NEEDED);
    }
    if patched != content {
        shell.write_file(&config_path, patched)?;
        logger::success(msg_config_updated(&config_path));
    }

    logger::outro(MSG_INSTALL_DONE);
    Ok(())
}

/// Looks for a Hardhat config in `start` and its ancestors.
fn find_hardhat_config(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    })
}

fn prompt_config_path(base: &Path) -> anyhow::Result<PathBuf> {
    let answer: String = Prompt::new(MSG_CONFIG_PATH_PROMPT).ask()?;
    let path = base.join(answer.trim());
    let path = if path.is_dir() {
        CONFIG_FILES
            .iter()
            .map(|name| path.join(name))
            .find(|candidate| candidate.is_file())
            .unwrap_or(path)
    } else {
        path
    };

    if !path.is_file() {
        anyhow::bail!(MSG_NOT_A_CONFIG_FILE);
    }
    Ok(path)
}

/// Wires the SDK into a Hardhat config: imports it, calls `anyflow.setup()` after
/// the imports and wraps the exported config. Running it twice changes nothing.
pub fn update_hardhat_config(content: &str, kind: ConfigKind) -> String {
    let mut content = content.to_owned();

    if !content.contains(SDK_PACKAGE) {
        content = format!("{}\n{content}", kind.sdk_import());
    }

    if !content.contains(SETUP_CALL) {
        content = insert_setup_call(&content);
    }

    if !content.contains(MERGE_CALL) {
        content = wrap_export(&content, kind);
    }

    content
}

fn insert_setup_call(content: &str) -> String {
    let last_import = content
        .match_indices('\n')
        .map(|(i, _)| i + 1)
        .chain(std::iter::once(0))
        .filter(|&start| {
            let line = &content[start..];
            let line = &line[..line.find('\n').unwrap_or(line.len())];
            line.starts_with("import ")
                || line.starts_with("require(")
                || (line.starts_with("const ") && line.contains("require("))
        })
        .max();

    let Some(start) = last_import else {
        return format!("{SETUP_CALL}\n\n{content}");
    };

    let end = content[start..]
        .find(';')
        .map(|offset| start + offset + 1)
        .or_else(|| content[start..].find('\n').map(|offset| start + offset))
        .unwrap_or(content.len());
    format!(
        "{}\n\n{SETUP_CALL}\n{}",
        &content[..end],
        &content[end..]
    )
}

fn wrap_export(content: &str, kind: ConfigKind) -> String {
    if let Some(captures) = DEFAULT_EXPORT.captures(content) {
        let replacement = format!("export default {MERGE_CALL}{});", &captures[1]);
        return content.replacen(&captures[0], &replacement, 1);
    }
    if kind == ConfigKind::JavaScript {
        if let Some(captures) = MODULE_EXPORTS.captures(content) {
            let replacement = format!("module.exports = {MERGE_CALL}{});", &captures[1]);
            return content.replacen(&captures[0], &replacement, 1);
        }
    }
    if let Some(captures) = TYPED_CONFIG.captures(content) {
        let mut content = content.trim_end().to_owned();
        content.push_str(&format!(
            "\n\nexport default {MERGE_CALL}{});\n",
            &captures[1]
        ));
        return content;
    }
    content.to_owned()
}
