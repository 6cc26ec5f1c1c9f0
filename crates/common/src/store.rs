//! Key-value storage kept in the user's configuration directory.
//!
//! Values are stored as a flat JSON object. The file may hold credentials, so it is
//! written with owner-only permissions on unix.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use xshell::Shell;

use crate::{
    files::{read_json_file, save_json_file},
    logger,
};

const APP_DIR: &str = "anyflow";

#[derive(Debug)]
pub struct LocalStore<'a> {
    shell: &'a Shell,
    path: PathBuf,
}

impl<'a> LocalStore<'a> {
    pub const FILE_NAME: &'static str = "env.json";

    /// `<config dir>/anyflow`, e.g. `~/.config/anyflow` on Linux.
    pub fn default_dir() -> anyhow::Result<PathBuf> {
        let base = dirs::config_dir().context("Unable to determine the user config directory")?;
        Ok(base.join(APP_DIR))
    }

    pub fn open(shell: &'a Shell, dir: impl AsRef<Path>) -> Self {
        Self {
            shell,
            path: dir.as_ref().join(Self::FILE_NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// An unreadable store is reported and read as empty.
    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match self.load() {
            Ok(mut values) => Ok(values.remove(key)),
            Err(err) => {
                logger::warn(format!("Ignoring unreadable local store: {err:#}"));
                Ok(None)
            }
        }
    }

    /// Fails without touching the file when the existing store can't be parsed.
    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut values = self.load()?;
        values.insert(key.to_owned(), value.to_owned());
        self.persist(&values)
    }

    /// Returns `false` when the key was not stored.
    pub fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let mut values = self.load()?;
        if values.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&values)?;
        Ok(true)
    }

    fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.shell.path_exists(&self.path) {
            return Ok(BTreeMap::new());
        }
        read_json_file(self.shell, &self.path)
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> anyhow::Result<()> {
        save_json_file(self.shell, &self.path, values)
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        restrict_permissions(&self.path)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions of {path:?}"))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_reads_as_empty() {
        let shell = Shell::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(&shell, dir.path().join("anyflow"));

        assert_eq!(store.get("ANYFLOW_API_KEY").unwrap(), None);
        assert!(!store.delete("ANYFLOW_API_KEY").unwrap());
    }

    #[test]
    fn set_overwrites_and_delete_removes() {
        let shell = Shell::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(&shell, dir.path().join("anyflow"));

        store.set("ANYFLOW_BACKEND_URL", "http://a").unwrap();
        store.set("ANYFLOW_BACKEND_URL", "http://b").unwrap();
        store.set("ANYFLOW_API_KEY", "token").unwrap();

        assert_eq!(
            store.get("ANYFLOW_BACKEND_URL").unwrap().as_deref(),
            Some("http://b")
        );
        assert!(store.delete("ANYFLOW_API_KEY").unwrap());
        assert_eq!(store.get("ANYFLOW_API_KEY").unwrap(), None);
        assert!(store.get("ANYFLOW_BACKEND_URL").unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let shell = Shell::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(&shell, dir.path());
        store.set("ANYFLOW_API_KEY", "token").unwrap();

        let mode = fs::metadata(dir.path().join(LocalStore::FILE_NAME))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn corrupt_store_is_read_as_empty_but_never_overwritten() {
        let shell = Shell::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LocalStore::FILE_NAME);
        fs::write(&path, "{\"ANYFLOW_BACKEND_URL\": \"http://a\",").unwrap();
        let store = LocalStore::open(&shell, dir.path());

        assert_eq!(store.get("ANYFLOW_API_KEY").unwrap(), None);
        assert!(store.set("ANYFLOW_API_KEY", "token").is_err());
        assert!(store.delete("ANYFLOW_BACKEND_URL").is_err());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"ANYFLOW_BACKEND_URL\": \"http://a\","
        );
    }
}
