use std::{sync::Arc, time::Instant};

use anyflow_cli_common::{
    config::GlobalConfig, error::log_error, init_prompt_theme, logger, store::LocalStore,
};
use clap::{command, Parser, Subcommand};
use xshell::Shell;

use crate::{
    api::{BackendApi, HttpBackend},
    chains::ChainRegistry,
    commands::deploy::{args::normalize_args, DeployArgs},
    consts::{DEBUG_VAR, EVENTS_DRAIN_TIMEOUT, EXIT_CODE_GENERIC_ERROR},
    context::CommandContext,
    events::{EventDispatcher, EventPayload},
    messages::{
        MSG_API_KEY_HELP, MSG_BACKEND_URL_HELP, MSG_BASE_RPC_URL_HELP, MSG_DEBUG_HELP,
        MSG_EVENTS_DRAIN_TIMEOUT, MSG_SKIP_EVENTS_HELP, MSG_SKIP_VERSION_CHECK_HELP,
    },
    settings::{Settings, SettingsOverrides},
};

mod api;
mod artifacts;
mod chains;
mod commands;
mod consts;
mod context;
mod events;
mod messages;
mod recovery;
mod settings;
mod utils;
mod version_check;

#[derive(Parser, Debug)]
#[command(name = "anyflow", version, about)]
struct AnyFlow {
    #[command(subcommand)]
    command: AnyFlowSubcommands,
    #[clap(flatten)]
    global: AnyFlowGlobalArgs,
}

#[derive(Subcommand, Debug)]
pub enum AnyFlowSubcommands {
    /// Add the AnyFlow entries to the project .env file
    Init,
    /// Authenticate with an AnyFlow API key
    Auth,
    /// Install anyflow-sdk and wire it into the Hardhat config
    Install,
    /// Deploy the compiled project to one or more networks
    Deploy(DeployArgs),
    /// Verify the configured API key
    CheckAuth,
    /// Forget the stored API key
    Logout,
    /// Retry chain-deployment status updates that failed during deploy
    Fix,
    /// List the networks available for deployment
    Networks,
}

#[derive(Parser, Debug)]
#[clap(next_help_heading = "Global options")]
struct AnyFlowGlobalArgs {
    #[clap(long, global = true, help = MSG_SKIP_EVENTS_HELP)]
    skip_events: bool,
    #[clap(long, global = true, help = MSG_SKIP_VERSION_CHECK_HELP)]
    skip_version_check: bool,
    #[clap(long, global = true, help = MSG_DEBUG_HELP)]
    debug: bool,
    #[clap(long, global = true, help = MSG_BASE_RPC_URL_HELP)]
    base_rpc_url: Option<String>,
    #[clap(long, global = true, help = MSG_BACKEND_URL_HELP)]
    backend_url: Option<String>,
    #[clap(long, global = true, help = MSG_API_KEY_HELP)]
    api_key: Option<String>,
}

impl AnyFlowGlobalArgs {
    fn global_config(&self) -> GlobalConfig {
        let debug_env = std::env::var(DEBUG_VAR).is_ok_and(|value| value == "true");
        GlobalConfig {
            debug: self.debug || debug_env,
            skip_events: self.skip_events,
            skip_version_check: self.skip_version_check,
        }
    }

    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            backend_url: self.backend_url.clone(),
            base_rpc_url: self.base_rpc_url.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    human_panic::setup_panic!();

    let started = Instant::now();
    let arguments = normalize_args(std::env::args());
    let anyflow_args = AnyFlow::parse_from(&arguments);

    init_prompt_theme();

    logger::new_empty_line();
    logger::intro();

    let shell = Shell::new()?;
    let global = anyflow_args.global.global_config();
    let store = LocalStore::open(&shell, LocalStore::default_dir()?);
    let settings = match Settings::resolve(&anyflow_args.global.overrides(), &store) {
        Ok(settings) => settings,
        Err(err) => {
            log_error(&err);
            std::process::exit(EXIT_CODE_GENERIC_ERROR);
        }
    };

    let api: Arc<dyn BackendApi> = Arc::new(HttpBackend::new(
        settings.backend_url.clone(),
        settings.api_key().cloned(),
    )?);
    let events = EventDispatcher::new(
        api.clone(),
        !global.skip_events && settings.is_authenticated(),
        global.debug,
    );
    let registry = ChainRegistry::new(api.clone());

    if !global.skip_version_check {
        version_check::check_for_updates(&shell, store.dir()).await;
    }

    events.submit(EventPayload::program_started(
        arguments.get(1..).unwrap_or_default(),
    ));

    let ctx = CommandContext {
        shell: &shell,
        global: &global,
        settings: &settings,
        store: &store,
        api,
        registry: &registry,
        events: &events,
    };
    let result = run_subcommand(anyflow_args.command, &ctx).await;

    let exit_code = match &result {
        Ok(()) => 0,
        Err(err) => {
            log_error(err);
            EXIT_CODE_GENERIC_ERROR
        }
    };

    events.submit(EventPayload::program_ended(exit_code, started.elapsed()));
    if !events.drain(EVENTS_DRAIN_TIMEOUT).await {
        logger::warn(MSG_EVENTS_DRAIN_TIMEOUT);
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run_subcommand(
    command: AnyFlowSubcommands,
    ctx: &CommandContext<'_>,
) -> anyhow::Result<()> {
    match command {
        AnyFlowSubcommands::Init => commands::init::run(ctx)?,
        AnyFlowSubcommands::Auth => commands::auth::run(ctx).await?,
        AnyFlowSubcommands::Install => commands::install::run(ctx)?,
        AnyFlowSubcommands::Deploy(args) => commands::deploy::run(ctx, args).await?,
        AnyFlowSubcommands::CheckAuth => commands::check_auth::run(ctx).await?,
        AnyFlowSubcommands::Logout => commands::logout::run(ctx)?,
        AnyFlowSubcommands::Fix => commands::fix::run(ctx).await?,
        AnyFlowSubcommands::Networks => commands::networks::run(ctx).await?,
    }
    Ok(())
}
