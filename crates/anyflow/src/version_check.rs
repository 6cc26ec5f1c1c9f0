use std::path::Path;

use anyflow_cli_common::{
    files::{read_json_file, save_json_file},
    logger,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use xshell::Shell;

use crate::{
    consts::HTTP_REQUEST_TIMEOUT,
    messages::{msg_update_available, msg_update_check_failed, MSG_UPDATE_AVAILABLE},
};

const CACHE_FILE: &str = "version-check.json";
const LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/AnyFlowLabs/anyflow-cli/releases/latest";
const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionCache {
    last_check_time: DateTime<Utc>,
    version: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Prints a note when a newer release exists. Runs at most once a day; every
/// failure is reported and otherwise ignored.
pub async fn check_for_updates(shell: &Shell, cache_dir: &Path) {
    let cache_path = cache_dir.join(CACHE_FILE);
    let now = Utc::now();
    let cache = read_json_file::<VersionCache>(shell, &cache_path).ok();
    if !is_check_due(cache.as_ref(), now) {
        return;
    }

    let latest = fetch_latest_version().await;

    let cache = VersionCache {
        last_check_time: now,
        version: CURRENT_VERSION.to_owned(),
    };
    if let Err(err) = save_json_file(shell, &cache_path, &cache) {
        logger::warn(msg_update_check_failed(&err));
    }

    match latest {
        Ok(latest) => {
            if is_newer(&latest, CURRENT_VERSION) {
                logger::note(
                    MSG_UPDATE_AVAILABLE,
                    msg_update_available(CURRENT_VERSION, latest.trim_start_matches('v')),
                );
            }
        }
        Err(err) => logger::warn(msg_update_check_failed(&err)),
    }
}

async fn fetch_latest_version() -> anyhow::Result<String> {
    let release: Release = reqwest::Client::builder()
        .user_agent(concat!("anyflow-cli/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()?
        .get(LATEST_RELEASE_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(release.tag_name)
}

fn is_check_due(cache: Option<&VersionCache>, now: DateTime<Utc>) -> bool {
    cache.map_or(true, |cache| now - cache.last_check_time >= Duration::hours(24))
}

/// Tags may carry a `v` prefix. Unparsable versions never count as newer.
fn is_newer(latest: &str, current: &str) -> bool {
    let parse = |version: &str| semver::Version::parse(version.trim().trim_start_matches('v'));
    match (parse(latest), parse(current)) {
        (Ok(latest), Ok(current)) => latest > current,
        _ => false,
    }
}
