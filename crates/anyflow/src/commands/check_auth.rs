use anyflow_cli_common::logger;
use anyhow::Context;

use crate::{
    api::{BackendApi, User},
    context::CommandContext,
    messages::{msg_authenticated_as, MSG_API_KEY_REJECTED},
};

pub(crate) async fn run(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    ctx.settings.require_api_key()?;
    let user = verify_api_key(ctx.api.as_ref()).await?;
    logger::outro(msg_authenticated_as(&user));
    Ok(())
}

/// Checks the API key the client was built with by fetching its account.
pub async fn verify_api_key(api: &dyn BackendApi) -> anyhow::Result<User> {
    api.get_user().await.context(MSG_API_KEY_REJECTED)
}
