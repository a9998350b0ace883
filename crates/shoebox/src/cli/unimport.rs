//! Unimport command - delete previously imported copies.

use crate::cli::{fail, parse_filters, CommandResult, EXIT_INPUT, EXIT_OPERATION, EXIT_STORE};
use shoebox_import::{Importer, RunMode, StoreImporter};
use shoebox_media::Directories;
use shoebox_store::S3Store;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct UnimportArgs {
    pub dir: Option<PathBuf>,
    pub s3_bucket: Option<String>,
    pub root_import_dir: Option<PathBuf>,
    pub media_inbox: Option<PathBuf>,
    pub library: Option<String>,
    pub filters: Option<String>,
}

pub fn run(args: UnimportArgs) -> CommandResult {
    let dirs = Directories::resolve(None, args.media_inbox.clone())
        .map_err(|err| fail(EXIT_INPUT, err))?;
    dirs.ensure().map_err(|err| fail(EXIT_INPUT, err))?;
    let root = args
        .root_import_dir
        .clone()
        .unwrap_or_else(|| dirs.media_root.clone());

    match (&args.dir, &args.s3_bucket) {
        (Some(source_dir), None) => {
            let importer = Importer::new(source_dir, &root, args.library, RunMode::Unimport);
            let counters = importer.process(false).map_err(|err| {
                fail(
                    EXIT_OPERATION,
                    anyhow::Error::from(err).context(format!(
                        "Problem un-importing from directory: {}",
                        source_dir.display()
                    )),
                )
            })?;
            println!("Un-imported {} files", counters.un_imported);
            info!("Local media un-import completed");
            Ok(())
        }
        (None, Some(bucket)) => {
            let store = S3Store::open(bucket).map_err(|err| {
                fail(
                    EXIT_STORE,
                    anyhow::Error::from(err)
                        .context(format!("Problem validating bucket: {bucket}")),
                )
            })?;
            let filters = parse_filters(args.filters.as_deref());
            let importer = StoreImporter::new(
                &store,
                &dirs,
                args.root_import_dir,
                args.library,
                RunMode::Unimport,
            );
            let summary = importer.process(&filters).map_err(|err| {
                fail(
                    EXIT_OPERATION,
                    anyhow::Error::from(err)
                        .context(format!("Problem un-importing from bucket: {bucket}")),
                )
            })?;
            println!(
                "Un-imported {} archive(s); {} failed",
                summary.completed.len(),
                summary.failed.len()
            );
            if !summary.all_succeeded() {
                return Err(fail(
                    EXIT_OPERATION,
                    anyhow::anyhow!("{} archive(s) failed to un-import", summary.failed.len()),
                ));
            }
            info!("Store media un-import completed");
            Ok(())
        }
        _ => Err(fail(
            EXIT_INPUT,
            anyhow::anyhow!("Exactly one of --dir or --s3-bucket is required"),
        )),
    }
}
