//! Archive command - bundle a source directory into dated zip archives.

use crate::cli::{fail, output, CommandResult, EXIT_INPUT, EXIT_OPERATION, EXIT_STORE, EXIT_UPLOAD};
use shoebox_archive::archiver::{upload_bundles, Archiver, MAX_BUNDLE_BYTES};
use shoebox_media::Directories;
use shoebox_store::{ObjectStore, S3Store};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct ArchiveArgs {
    pub dir: PathBuf,
    pub s3_bucket: Option<String>,
    pub media_inbox: Option<PathBuf>,
    pub keyword: Option<String>,
    pub library: Option<String>,
}

pub fn run(args: ArchiveArgs) -> CommandResult {
    let dirs = Directories::resolve(None, args.media_inbox).map_err(|err| fail(EXIT_INPUT, err))?;
    dirs.ensure().map_err(|err| fail(EXIT_INPUT, err))?;

    // Validate the bucket up front: moving files for an hour and then
    // discovering bad credentials would leave the worst kind of half-run.
    let store = match &args.s3_bucket {
        Some(bucket) => Some(S3Store::open(bucket).map_err(|err| {
            fail(
                EXIT_STORE,
                anyhow::Error::from(err).context(format!("Problem validating bucket: {bucket}")),
            )
        })?),
        None => None,
    };

    let mut archiver = Archiver::new(
        &args.dir,
        &dirs.archive_files_dir,
        args.keyword,
        args.library,
    );
    let outcome = archiver.process(MAX_BUNDLE_BYTES).map_err(|err| {
        fail(
            EXIT_OPERATION,
            anyhow::Error::from(err)
                .context(format!("Problem creating archive for: {}", args.dir.display())),
        )
    })?;

    println!(
        "Archived {} files ({}) into {} bundle(s) under {}",
        outcome.records.len(),
        output::format_size(outcome.summary.total_size_bytes),
        outcome.bundle_dirs.len(),
        dirs.archive_files_dir.display()
    );
    for zip_path in &outcome.zip_paths {
        println!("  {}", zip_path.display());
    }

    if let Some(store) = store {
        info!("Uploading archives to {}", store.name());
        upload_bundles(&store, &outcome.zip_paths).map_err(|err| {
            fail(
                EXIT_UPLOAD,
                anyhow::Error::from(err).context("Problem uploading archives"),
            )
        })?;
        println!("Uploaded {} archive(s) to {}", outcome.zip_paths.len(), store.name());
    }

    info!("Media archiving completed");
    Ok(())
}
