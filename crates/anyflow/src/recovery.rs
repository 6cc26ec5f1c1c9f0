//! Journal of chain-deployment status updates that never reached the backend.
//!
//! One plain text line per record. `fix` replays them.

use std::{
    fmt,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyflow_cli_types::DeploymentStatus;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;

pub const RECOVERY_FILE_NAME: &str = "anyflow_failed_deployments.txt";

static RECORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Chain ID: (\d+), Status: (.+)").expect("record pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailedStatusRecord {
    pub chain_deployment_id: u64,
    pub status: DeploymentStatus,
}

impl FailedStatusRecord {
    /// Lines that don't match the record format, or carry an unknown status, yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let captures = RECORD_PATTERN.captures(line)?;
        Some(Self {
            chain_deployment_id: captures[1].parse().ok()?,
            status: DeploymentStatus::from_str(captures[2].trim()).ok()?,
        })
    }
}

impl fmt::Display for FailedStatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chain ID: {}, Status: {}",
            self.chain_deployment_id, self.status
        )
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryJournal {
    path: PathBuf,
}

impl RecoveryJournal {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(RECOVERY_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: FailedStatusRecord) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {:?}", self.path))?;
        writeln!(file, "{record}").with_context(|| format!("Failed to write {:?}", self.path))
    }

    /// Distinct records in file order. A missing file has none.
    pub fn records(&self) -> anyhow::Result<Vec<FailedStatusRecord>> {
        let Some(content) = self.read()? else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        for record in content.lines().filter_map(FailedStatusRecord::parse) {
            if !records.contains(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Drops every line holding `record`, re-reading the file first so lines
    /// appended in the meantime survive. The file is deleted once nothing but
    /// whitespace is left.
    pub fn remove(&self, record: FailedStatusRecord) -> anyhow::Result<()> {
        let Some(content) = self.read()? else {
            return Ok(());
        };
        let kept: Vec<&str> = content
            .lines()
            .filter(|line| FailedStatusRecord::parse(line) != Some(record))
            .collect();

        if kept.iter().all(|line| line.trim().is_empty()) {
            return fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {:?}", self.path));
        }

        let mut updated = kept.join("\n");
        updated.push('\n');
        fs::write(&self.path, updated).with_context(|| format!("Failed to write {:?}", self.path))
    }

    fn read(&self) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read {:?}", self.path)),
        }
    }
}
