use std::path::Path;

use anyflow_cli_common::{env_file, logger};
use xshell::Shell;

use crate::{
    consts::{API_KEY_VAR, BACKEND_URL_VAR, BASE_RPC_URL_VAR, DOTENV_FILE},
    context::CommandContext,
    messages::{msg_dotenv_initialized, MSG_DOTENV_UP_TO_DATE},
    utils::project::find_project_root,
};

/// Keys every AnyFlow project `.env` carries. The API key is written empty.
const DOTENV_KEYS: [&str; 3] = [BASE_RPC_URL_VAR, BACKEND_URL_VAR, API_KEY_VAR];

pub(crate) fn run(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    let project_root = find_project_root(&ctx.shell.current_dir())?;
    let defaults = [
        ctx.settings.base_rpc_url.clone(),
        ctx.settings.backend_url.to_string(),
        String::new(),
    ];

    let dotenv = project_root.join(DOTENV_FILE);
    let added = init_dotenv(ctx.shell, &dotenv, &defaults)?;
    if added.is_empty() {
        logger::outro(MSG_DOTENV_UP_TO_DATE);
    } else {
        logger::outro(msg_dotenv_initialized(&dotenv, &added));
    }
    Ok(())
}

/// Appends the keys missing from `path`, creating the file when needed. Returns
/// the keys that were added.
fn init_dotenv(
    shell: &Shell,
    path: &Path,
    values: &[String; 3],
) -> anyhow::Result<Vec<&'static str>> {
    let content = if shell.path_exists(path) {
        shell.read_file(path)?
    } else {
        String::new()
    };

    let mut updated = content.clone();
    let mut added = Vec::new();
    for (key, value) in DOTENV_KEYS.into_iter().zip(values) {
        if !env_file::contains_var(&updated, key) {
            updated = env_file::upsert_var(&updated, key, value);
            added.push(key);
        }
    }

    if updated != content {
        shell.write_file(path, updated)?;
    }
    Ok(added)
}
