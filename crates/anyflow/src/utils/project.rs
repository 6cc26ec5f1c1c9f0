use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyflow_cli_common::files::read_json_file;
use anyflow_cli_types::NodeVersion;
use serde::Deserialize;
use xshell::Shell;

use crate::{
    consts::{PACKAGE_JSON_FILE, SDK_PACKAGE},
    messages::{msg_project_root_not_found, MSG_SDK_NOT_INSTALLED},
};

/// The parts of `package.json` the CLI cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default)]
    pub engines: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, serde_json::Value>,
}

impl PackageJson {
    pub fn read(shell: &Shell, project_root: &Path) -> anyhow::Result<Self> {
        read_json_file(shell, project_root.join(PACKAGE_JSON_FILE))
    }

    pub fn node_version(&self) -> NodeVersion {
        self.engines
            .get("node")
            .map(|requirement| NodeVersion::from_requirement(requirement))
            .unwrap_or_default()
    }

    pub fn depends_on(&self, package: &str) -> bool {
        self.dependencies.contains_key(package) || self.dev_dependencies.contains_key(package)
    }
}

/// Nearest ancestor of `start` (inclusive) holding a `package.json`.
pub fn find_project_root(start: &Path) -> anyhow::Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PACKAGE_JSON_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!(msg_project_root_not_found(start)))
}

pub fn ensure_sdk_installed(package: &PackageJson) -> anyhow::Result<()> {
    if !package.depends_on(SDK_PACKAGE) {
        anyhow::bail!(MSG_SDK_NOT_INSTALLED);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn root_is_found_from_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("contracts/tokens");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        assert_eq!(find_project_root(&nested).unwrap(), dir.path());
    }

    #[test]
    fn package_fields_are_optional() {
        let shell = Shell::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "demo"}"#).unwrap();

        let package = PackageJson::read(&shell, dir.path()).unwrap();

        assert_eq!(package.node_version(), NodeVersion::V20);
        assert!(ensure_sdk_installed(&package).is_err());
    }

    #[test]
    fn sdk_may_be_a_dev_dependency() {
        let package: PackageJson = serde_json::from_str(
            r#"{
                "engines": {"node": ">=18"},
                "devDependencies": {"anyflow-sdk": "^1.0.0", "hardhat": "^2.22.0"}
            }"#,
        )
        .unwrap();

        assert_eq!(package.node_version(), NodeVersion::V18);
        assert!(package.depends_on("hardhat"));
        ensure_sdk_installed(&package).unwrap();
    }
}
