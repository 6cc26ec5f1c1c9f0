use anyflow_cli_common::{env_file, logger, store::LocalStore, PromptConfirm, PromptPassword};
use secrecy::SecretString;
use xshell::{cmd, Shell};

use super::check_auth::verify_api_key;
use crate::{
    api::{BackendApi, HttpBackend, User},
    consts::{API_KEY_VAR, DOTENV_FILE},
    context::CommandContext,
    messages::{
        msg_authenticated_as, msg_open_token_page, MSG_API_KEY_EMPTY, MSG_API_KEY_PROMPT,
        MSG_API_KEY_SAVED_TO_DOTENV, MSG_REPLACE_API_KEY_PROMPT,
    },
    utils::project::find_project_root,
};

pub(crate) async fn run(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    if ctx.settings.is_authenticated()
        && !PromptConfirm::new(MSG_REPLACE_API_KEY_PROMPT)
            .default(false)
            .ask()?
    {
        return Ok(());
    }

    let token_page = ctx.settings.environment.token_page_url();
    logger::info(msg_open_token_page(token_page));
    open_in_browser(ctx.shell, token_page);

    let api_key = PromptPassword::new(MSG_API_KEY_PROMPT).ask()?;
    let api_key = api_key.trim();
    if api_key.is_empty() {
        anyhow::bail!(MSG_API_KEY_EMPTY);
    }

    let api = HttpBackend::new(
        ctx.settings.backend_url.clone(),
        Some(SecretString::new(api_key.to_owned())),
    )?;
    let user = authenticate(&api, ctx.shell, ctx.store, api_key).await?;

    logger::outro(msg_authenticated_as(&user));
    Ok(())
}

/// Verifies `api_key` against the backend `api` was built with, then saves it to
/// the local store and, inside a project, to the project `.env`. Nothing is saved
/// for a rejected key.
async fn authenticate(
    api: &dyn BackendApi,
    shell: &Shell,
    store: &LocalStore<'_>,
    api_key: &str,
) -> anyhow::Result<User> {
    let user = verify_api_key(api).await?;

    store.set(API_KEY_VAR, api_key)?;
    if let Ok(project_root) = find_project_root(&shell.current_dir()) {
        let dotenv = project_root.join(DOTENV_FILE);
        env_file::write_var(shell, &dotenv, API_KEY_VAR, api_key)?;
        logger::info(MSG_API_KEY_SAVED_TO_DOTENV);
    }
    Ok(user)
}

/// Failures are ignored, the link is printed anyway.
fn open_in_browser(shell: &Shell, url: &str) {
    let result = if cfg!(target_os = "macos") {
        cmd!(shell, "open {url}").quiet().ignore_stderr().run()
    } else if cfg!(target_os = "windows") {
        cmd!(shell, "cmd /C start {url}").quiet().ignore_stderr().run()
    } else {
        cmd!(shell, "xdg-open {url}").quiet().ignore_stderr().run()
    };
    let _ = result;
}
