use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use anyflow_cli_common::{logger, spinner::Spinner};
use anyhow::Context;
use walkdir::WalkDir;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{
    api::BackendApi,
    messages::{
        msg_artifacts_not_found, msg_remove_archive_failed, MSG_ARCHIVE_FAILED,
        MSG_UPLOADING_ARTIFACTS_SPINNER, MSG_UPLOAD_ARTIFACTS_FAILED,
    },
};

pub const ARTIFACTS_DIR: &str = "artifacts";
pub const ARCHIVE_FILE: &str = "artifact.zip";

/// Compresses `<project_root>/artifacts` into `<project_root>/artifact.zip`, with
/// entry names relative to the artifacts directory.
pub fn zip_artifacts(project_root: &Path) -> anyhow::Result<PathBuf> {
    let artifacts_dir = project_root.join(ARTIFACTS_DIR);
    if !artifacts_dir.is_dir() {
        anyhow::bail!(msg_artifacts_not_found(&artifacts_dir));
    }

    let archive_path = project_root.join(ARCHIVE_FILE);
    write_archive(&artifacts_dir, &archive_path).context(MSG_ARCHIVE_FAILED)?;
    Ok(archive_path)
}

fn write_archive(source: &Path, archive_path: &Path) -> anyhow::Result<()> {
    let mut zip = ZipWriter::new(File::create(archive_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source)?;
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            io::copy(&mut File::open(entry.path())?, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}

/// Uploads the archive and removes it afterwards, whether the upload worked or not.
pub async fn send_artifacts(
    api: &dyn BackendApi,
    archive_path: &Path,
    deployment_id: u64,
) -> anyhow::Result<()> {
    let spinner = Spinner::new(MSG_UPLOADING_ARTIFACTS_SPINNER);
    let result = api.upload_artifacts(deployment_id, archive_path).await;

    if let Err(err) = std::fs::remove_file(archive_path) {
        logger::warn(msg_remove_archive_failed(archive_path, &err));
    }

    match result {
        Ok(()) => {
            spinner.finish();
            Ok(())
        }
        Err(err) => {
            spinner.fail();
            Err(err).context(MSG_UPLOAD_ARTIFACTS_FAILED)
        }
    }
}
