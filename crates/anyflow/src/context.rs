use std::sync::Arc;

use anyflow_cli_common::{config::GlobalConfig, store::LocalStore};
use xshell::Shell;

use crate::{api::BackendApi, chains::ChainRegistry, events::EventDispatcher, settings::Settings};

/// Everything a command needs, built once in `main`.
pub struct CommandContext<'a> {
    pub shell: &'a Shell,
    pub global: &'a GlobalConfig,
    pub settings: &'a Settings,
    pub store: &'a LocalStore<'a>,
    pub api: Arc<dyn BackendApi>,
    pub registry: &'a ChainRegistry,
    pub events: &'a EventDispatcher,
}
