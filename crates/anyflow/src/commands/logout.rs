use anyflow_cli_common::{env_file, logger, store::LocalStore};
use xshell::Shell;

use crate::{
    consts::{API_KEY_VAR, DOTENV_FILE},
    context::CommandContext,
    messages::{MSG_LOGGED_OUT, MSG_NOT_LOGGED_IN},
    utils::project::find_project_root,
};

pub(crate) fn run(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    let removed = forget_api_key(ctx.shell, ctx.store)?;
    logger::outro(if removed {
        MSG_LOGGED_OUT
    } else {
        MSG_NOT_LOGGED_IN
    });
    Ok(())
}

/// Forgets the stored API key and drops it from the project `.env`, if any.
/// Returns whether a key was found in either place.
fn forget_api_key(shell: &Shell, store: &LocalStore<'_>) -> anyhow::Result<bool> {
    let mut removed = store.delete(API_KEY_VAR)?;

    if let Ok(project_root) = find_project_root(&shell.current_dir()) {
        removed |= env_file::delete_var(shell, &project_root.join(DOTENV_FILE), API_KEY_VAR)?;
    }
    Ok(removed)
}
