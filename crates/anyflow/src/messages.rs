use std::{fmt::Display, path::Path, time::Duration};

use anyflow_cli_types::{DeploymentStatus, NewDeployment};

use crate::{api::User, recovery::FailedStatusRecord};

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Global options related messages
pub(super) const MSG_SKIP_EVENTS_HELP: &str = "Do not send usage events";
pub(super) const MSG_SKIP_VERSION_CHECK_HELP: &str = "Do not check for a newer release";
pub(super) const MSG_DEBUG_HELP: &str = "Print debug output";
pub(super) const MSG_BASE_RPC_URL_HELP: &str = "Base URL of the AnyFlow RPC gateway";
pub(super) const MSG_BACKEND_URL_HELP: &str = "URL of the AnyFlow backend API";
pub(super) const MSG_API_KEY_HELP: &str = "AnyFlow API key, overrides the stored one";
pub(super) const MSG_EVENTS_DRAIN_TIMEOUT: &str =
    "Some usage events could not be delivered before the timeout";

/// Settings related messages
pub(super) const MSG_NOT_AUTHENTICATED: &str =
    "Not authenticated. Run `anyflow auth` or pass --api-key";

pub(super) fn msg_invalid_environment(value: &str) -> String {
    format!("Unknown ANYFLOW_ENV `{value}`, expected development, staging or production")
}

pub(super) fn msg_invalid_url(name: &str, value: &str) -> String {
    format!("{name} is not a valid URL: {value}")
}

/// Project related messages
pub(super) const MSG_SDK_NOT_INSTALLED: &str =
    "anyflow-sdk is not a dependency of this project. Run `anyflow install` first";

pub(super) fn msg_project_root_not_found(start: &Path) -> String {
    format!("No package.json found in {start:?} or any parent directory")
}

/// Chain registry related messages
pub(super) const MSG_SUPPORTED_CHAINS: &str = "Supported networks";
pub(super) const MSG_AVAILABLE_NETWORKS: &str = "Available networks";
pub(super) const MSG_NETWORKS_USAGE: &str =
    "Use these networks with: anyflow deploy --networks <network1> <network2> ...";

pub(super) fn msg_chains_fetch_failed(err: impl Display) -> String {
    format!("Could not fetch the chain list, using the built-in one: {err}")
}

/// Deploy related messages
pub(super) const MSG_NETWORKS_HELP: &str = "Networks to deploy to, by alias or chain id";
pub(super) const MSG_DETERMINISTIC_ADDRESSES_HELP: &str =
    "Deploy contracts to the same address on every network (short: -da)";
pub(super) const MSG_DEPLOYMENT_ID_HELP: &str = "Continue an existing deployment";
pub(super) const MSG_CHAIN_DEPLOYMENT_ID_HELP: &str =
    "Only run the chain-deployment with this id";
pub(super) const MSG_NO_NETWORKS: &str =
    "No networks given. Pass at least one with --networks, see `anyflow networks`";
pub(super) const MSG_CREATE_DEPLOYMENT_FAILED: &str = "Failed to create the deployment";
pub(super) const MSG_ARCHIVE_FAILED: &str = "Failed to archive the compiled artifacts";
pub(super) const MSG_UPLOADING_ARTIFACTS_SPINNER: &str = "Uploading artifacts...";
pub(super) const MSG_UPLOAD_ARTIFACTS_FAILED: &str = "Failed to upload the artifacts";

pub(super) fn msg_unsupported_network(alias: &str) -> String {
    format!("Unsupported network `{alias}`")
}

pub(super) fn msg_chain_unavailable(chain_id: u64) -> String {
    format!("Chain {chain_id} is currently unavailable for deployments")
}

pub(super) fn msg_deployment_request(request: &NewDeployment) -> String {
    format!("Creating deployment: {request:?}")
}

pub(super) fn msg_deployment_created(deployment_id: u64) -> String {
    format!("Deployment {deployment_id} created")
}

pub(super) fn msg_fetch_deployment_failed(deployment_id: u64) -> String {
    format!("Failed to fetch deployment {deployment_id}")
}

pub(super) fn msg_resuming_deployment(deployment_id: u64) -> String {
    format!("Resuming deployment {deployment_id}")
}

pub(super) fn msg_deployment_not_resumable(
    deployment_id: u64,
    status: Option<DeploymentStatus>,
) -> String {
    let status = status.map_or_else(|| "unknown".to_owned(), |status| status.to_string());
    format!("Deployment {deployment_id} is {status} and can't be resumed")
}

pub(super) fn msg_artifacts_not_found(path: &Path) -> String {
    format!("{path:?} not found. Compile the project first, e.g. `npx hardhat compile`")
}

pub(super) fn msg_remove_archive_failed(path: &Path, err: impl Display) -> String {
    format!("Failed to remove {path:?}: {err}")
}

pub(super) fn msg_chain_deployment_not_found(
    chain_deployment_id: u64,
    deployment_id: u64,
) -> String {
    format!("Deployment {deployment_id} has no chain-deployment {chain_deployment_id}")
}

pub(super) fn msg_no_chain_deployments(deployment_id: u64) -> String {
    format!("Deployment {deployment_id} has no chain-deployments")
}

pub(super) fn msg_dotenv_update_failed(path: &Path, err: impl Display) -> String {
    format!("Failed to update {path:?}: {err}")
}

pub(super) fn msg_deploying_chain(chain_id: u64, chain_deployment_id: u64) -> String {
    format!("Deploying to chain {chain_id} (chain-deployment {chain_deployment_id})")
}

pub(super) fn msg_chain_deployed(chain_id: u64, elapsed: Duration) -> String {
    format!("Chain {chain_id} deployed in {:.1}s", elapsed.as_secs_f64())
}

pub(super) fn msg_chain_deploy_failed(chain_id: u64, exit_code: i32) -> String {
    format!("Deploy script for chain {chain_id} exited with code {exit_code}")
}

pub(super) fn msg_status_already_applied(chain_deployment_id: u64, err: impl Display) -> String {
    format!("Status of chain-deployment {chain_deployment_id} already set: {err}")
}

pub(super) fn msg_status_update_failed(
    chain_deployment_id: u64,
    status: DeploymentStatus,
    err: impl Display,
) -> String {
    format!("Failed to mark chain-deployment {chain_deployment_id} as {status}: {err}")
}

pub(super) fn msg_status_journaled(path: &Path) -> String {
    format!("Saved to {path:?}, run `anyflow fix` to retry")
}

pub(super) fn msg_journal_write_failed(record: FailedStatusRecord, err: impl Display) -> String {
    format!("Failed to save `{record}` for a later retry: {err}")
}

pub(super) fn msg_deployment_succeeded(deployment_id: u64, chains: &[u64]) -> String {
    format!(
        "Deployment {deployment_id} finished on chains: {}",
        join_ids(chains)
    )
}

pub(super) fn msg_successful_chains(chains: &[u64]) -> String {
    format!("Deployed successfully on chains: {}", join_ids(chains))
}

pub(super) fn msg_deployment_failed(deployment_id: u64, failed: &[u64]) -> String {
    format!(
        "Deployment {deployment_id} failed on chains: {}",
        join_ids(failed)
    )
}

/// Fix related messages
pub(super) const MSG_NOTHING_TO_FIX: &str = "No failed status updates to retry";
pub(super) const MSG_FIX_DONE: &str = "All failed status updates were delivered";

pub(super) fn msg_record_replayed(record: FailedStatusRecord) -> String {
    format!(
        "Chain-deployment {} marked as {}",
        record.chain_deployment_id, record.status
    )
}

pub(super) fn msg_record_replay_failed(record: FailedStatusRecord, err: impl Display) -> String {
    format!("Could not deliver `{record}`: {err}")
}

pub(super) fn msg_records_unresolved(count: usize, path: &Path) -> String {
    format!("{count} status update(s) are still pending in {path:?}")
}

/// Telemetry related messages
pub(super) const MSG_WAITING_FOR_EVENTS: &str = "Sending usage events...";

pub(super) fn msg_event_failed(event_type: &str, err: impl Display) -> String {
    format!("Failed to send {event_type} event: {err}")
}

/// Auth related messages
pub(super) const MSG_API_KEY_PROMPT: &str = "Paste your API key";
pub(super) const MSG_API_KEY_EMPTY: &str = "The API key can't be empty";
pub(super) const MSG_API_KEY_REJECTED: &str = "The API key was rejected by the AnyFlow backend";
pub(super) const MSG_API_KEY_SAVED_TO_DOTENV: &str = "API key written to the project .env";
pub(super) const MSG_REPLACE_API_KEY_PROMPT: &str =
    "An API key is already configured. Replace it?";
pub(super) const MSG_LOGGED_OUT: &str = "Logged out";
pub(super) const MSG_NOT_LOGGED_IN: &str = "No stored API key found";

pub(super) fn msg_open_token_page(url: &str) -> String {
    format!("Create an API key at {url}")
}

pub(super) fn msg_authenticated_as(user: &User) -> String {
    match (&user.name, &user.email) {
        (Some(name), Some(email)) => format!("Authenticated as {name} <{email}>"),
        (Some(name), None) => format!("Authenticated as {name}"),
        (None, Some(email)) => format!("Authenticated as {email}"),
        (None, None) => format!("Authenticated as user {}", user.id),
    }
}

/// Init related messages
pub(super) const MSG_DOTENV_UP_TO_DATE: &str = "Project .env already has every AnyFlow entry";

pub(super) fn msg_dotenv_initialized(path: &Path, added: &[&str]) -> String {
    format!("Added {} to {path:?}", added.join(", "))
}

/// Install related messages
pub(super) const MSG_CONFIG_NOT_FOUND: &str = "Could not find hardhat.config.ts or hardhat.config.js";
pub(super) const MSG_CONFIG_PATH_PROMPT: &str = "Path to your Hardhat config file or its directory";
pub(super) const MSG_NOT_A_CONFIG_FILE: &str = "No Hardhat config file at the given path";
pub(super) const MSG_INSTALL_SDK_FAILED: &str = "Failed to install anyflow-sdk";
pub(super) const MSG_MANUAL_CONFIG_NEEDED: &str =
    "Could not find the exported Hardhat config, wrap it in anyflow.mergeHardhatConfig() manually";
pub(super) const MSG_INSTALL_DONE: &str = "AnyFlow is set up in this project";

pub(super) fn msg_installing_sdk_spinner(package_manager: impl Display) -> String {
    format!("Installing anyflow-sdk with {package_manager}...")
}

pub(super) fn msg_config_updated(path: &Path) -> String {
    format!("Updated {path:?}")
}

/// Update check related messages
pub(super) const MSG_UPDATE_AVAILABLE: &str = "Update available";

pub(super) fn msg_update_available(current: &str, latest: &str) -> String {
    format!(
        "Your version: {current}\nLatest version: {latest}\n\
         Download: https://github.com/AnyFlowLabs/anyflow-cli/releases/latest"
    )
}

pub(super) fn msg_update_check_failed(err: impl Display) -> String {
    format!("Failed to check for updates: {err}")
}
