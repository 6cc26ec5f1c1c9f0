use anyflow_cli_common::logger;

pub use self::args::DeployArgs;
use self::orchestrator::{DeployScript, DeploymentOutcome, Orchestrator};
use crate::{
    context::CommandContext,
    messages::{
        msg_deployment_failed, msg_deployment_succeeded, msg_successful_chains,
        MSG_NO_NETWORKS,
    },
    recovery::RecoveryJournal,
    utils::project::{ensure_sdk_installed, find_project_root, PackageJson},
};

pub mod args;
mod orchestrator;

pub(crate) async fn run(ctx: &CommandContext<'_>, args: DeployArgs) -> anyhow::Result<()> {
    ensure_networks(&args.networks)?;

    let project_root = find_project_root(&ctx.shell.current_dir())?;
    ensure_sdk_installed(&PackageJson::read(ctx.shell, &project_root)?)?;
    ctx.settings.require_api_key()?;

    let orchestrator = Orchestrator {
        shell: ctx.shell,
        api: ctx.api.clone(),
        registry: ctx.registry,
        events: ctx.events,
        journal: RecoveryJournal::in_dir(ctx.shell.current_dir()),
        project_root,
        base_rpc_url: ctx.settings.base_rpc_url.clone(),
        script: DeployScript::default(),
        verbose: ctx.global.debug,
    };
    let outcome = orchestrator.deploy(&args).await?;
    summarize(&outcome)
}

fn ensure_networks(networks: &[String]) -> anyhow::Result<()> {
    if networks.iter().all(|network| network.trim().is_empty()) {
        anyhow::bail!(MSG_NO_NETWORKS);
    }
    Ok(())
}

fn summarize(outcome: &DeploymentOutcome) -> anyhow::Result<()> {
    if outcome.is_success() {
        logger::outro(msg_deployment_succeeded(
            outcome.deployment_id,
            &outcome.successful_chains,
        ));
        return Ok(());
    }

    if !outcome.successful_chains.is_empty() {
        logger::info(msg_successful_chains(&outcome.successful_chains));
    }
    anyhow::bail!(msg_deployment_failed(
        outcome.deployment_id,
        &outcome.failed_chains
    ))
}
