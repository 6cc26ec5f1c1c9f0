use std::path::Path;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use xshell::Shell;

pub fn read_json_file<T>(shell: &Shell, file_path: impl AsRef<Path>) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let content = shell.read_file(file_path.as_ref())?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file {:?}", file_path.as_ref()))
}

pub fn save_json_file(
    shell: &Shell,
    file_path: impl AsRef<Path>,
    content: impl Serialize,
) -> anyhow::Result<()> {
    let data = serde_json::to_string_pretty(&content)?;
    shell.write_file(file_path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn save_creates_parent_directories() {
        let shell = Shell::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");
        let data = BTreeMap::from([("key".to_string(), 7u64)]);

        save_json_file(&shell, &path, &data).unwrap();
        let read: BTreeMap<String, u64> = read_json_file(&shell, &path).unwrap();

        assert_eq!(read, data);
    }

    #[test]
    fn invalid_json_mentions_file() {
        let shell = Shell::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        shell.write_file(&path, "{ not json").unwrap();

        let err = read_json_file::<serde_json::Value>(&shell, &path).unwrap_err();

        assert!(err.to_string().contains("broken.json"));
    }
}
