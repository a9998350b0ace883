//! Rearchive command - re-bundle archives already in the store.

use crate::cli::{fail, CommandResult, EXIT_INPUT, EXIT_OPERATION, EXIT_STORE};
use shoebox_archive::archiver::MAX_BUNDLE_BYTES;
use shoebox_import::ReArchiver;
use shoebox_media::Directories;
use shoebox_store::S3Store;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct RearchiveArgs {
    pub s3_bucket: String,
    pub media_inbox: Option<PathBuf>,
    pub library: Option<String>,
}

pub fn run(args: RearchiveArgs) -> CommandResult {
    let dirs = Directories::resolve(None, args.media_inbox).map_err(|err| fail(EXIT_INPUT, err))?;
    dirs.ensure().map_err(|err| fail(EXIT_INPUT, err))?;

    let store = S3Store::open(&args.s3_bucket).map_err(|err| {
        fail(
            EXIT_STORE,
            anyhow::Error::from(err)
                .context(format!("Problem validating bucket: {}", args.s3_bucket)),
        )
    })?;

    let rearchiver = ReArchiver::new(&store, &dirs, args.library, MAX_BUNDLE_BYTES);
    let summary = rearchiver.process().map_err(|err| {
        fail(
            EXIT_OPERATION,
            anyhow::Error::from(err)
                .context(format!("Problem re-archiving bucket: {}", args.s3_bucket)),
        )
    })?;

    println!(
        "Re-archived {} key(s); {} failed",
        summary.completed.len(),
        summary.failed.len()
    );
    if !summary.all_succeeded() {
        return Err(fail(
            EXIT_OPERATION,
            anyhow::anyhow!(
                "{} key(s) failed to re-archive: {}",
                summary.failed.len(),
                summary.failed.join(", ")
            ),
        ));
    }
    info!("Completed re-archiving");
    Ok(())
}
