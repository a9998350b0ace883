//! Import command - from a local directory or a bucket of archives.

use crate::cli::{
    confirm, fail, output, parse_filters, CommandResult, EXIT_INPUT, EXIT_OPERATION, EXIT_STORE,
};
use shoebox_import::{Importer, RunMode, StoreImporter};
use shoebox_media::Directories;
use shoebox_store::S3Store;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct ImportArgs {
    pub dir: Option<PathBuf>,
    pub s3_bucket: Option<String>,
    pub root_import_dir: Option<PathBuf>,
    pub media_inbox: Option<PathBuf>,
    pub library: Option<String>,
    pub filters: Option<String>,
    pub list: bool,
    pub force: bool,
    pub cleanup: bool,
}

pub fn run(args: ImportArgs) -> CommandResult {
    if args.dir.is_some() == args.s3_bucket.is_some() {
        return Err(fail(
            EXIT_INPUT,
            anyhow::anyhow!("Exactly one of --dir or --s3-bucket is required"),
        ));
    }
    if args.dir.is_some() {
        run_local(args)
    } else {
        run_store(args)
    }
}

fn resolve_dirs(args: &ImportArgs) -> Result<Directories, crate::cli::CommandFailure> {
    let dirs = Directories::resolve(None, args.media_inbox.clone())
        .map_err(|err| fail(EXIT_INPUT, err))?;
    dirs.ensure().map_err(|err| fail(EXIT_INPUT, err))?;
    Ok(dirs)
}

fn run_local(args: ImportArgs) -> CommandResult {
    let dirs = resolve_dirs(&args)?;
    let source_dir = args.dir.clone().ok_or_else(|| {
        fail(EXIT_INPUT, anyhow::anyhow!("--dir is required for a local import"))
    })?;
    let root = args
        .root_import_dir
        .clone()
        .unwrap_or_else(|| dirs.media_root.clone());

    let importer = Importer::new(&source_dir, &root, args.library.clone(), RunMode::Import);
    let counters = importer.process(args.cleanup).map_err(|err| {
        fail(
            EXIT_OPERATION,
            anyhow::Error::from(err).context(format!(
                "Problem importing from directory: {}",
                source_dir.display()
            )),
        )
    })?;

    println!(
        "Imported {} files ({} pictures, {} movies, {} audio); {} already present, {} not imported",
        counters.total_imported,
        counters.picture_imports,
        counters.movie_imports,
        counters.audio_imports,
        counters.already_imported,
        counters.not_imported
    );
    info!("Local media import completed");
    Ok(())
}

fn run_store(args: ImportArgs) -> CommandResult {
    let dirs = resolve_dirs(&args)?;
    let bucket = args.s3_bucket.clone().ok_or_else(|| {
        fail(EXIT_INPUT, anyhow::anyhow!("--s3-bucket is required for a store import"))
    })?;
    let store = S3Store::open(&bucket).map_err(|err| {
        fail(
            EXIT_STORE,
            anyhow::Error::from(err).context(format!("Problem validating bucket: {bucket}")),
        )
    })?;
    let filters = parse_filters(args.filters.as_deref());
    let importer = StoreImporter::new(
        &store,
        &dirs,
        args.root_import_dir.clone(),
        args.library.clone(),
        RunMode::Import,
    );

    let pending = importer
        .pending_keys(&filters)
        .map_err(|err| fail(EXIT_OPERATION, err))?;
    if args.list {
        output::print_table(
            &["Pending archive"],
            pending.iter().map(|key| vec![key.clone()]).collect(),
        );
        println!("{} archive(s) remaining in bucket: {}", pending.len(), bucket);
        return Ok(());
    }
    if pending.is_empty() {
        println!("Nothing to import from bucket: {bucket}");
        return Ok(());
    }

    if !args.force {
        println!("shoebox will import {} archive(s) from bucket: {}", pending.len(), bucket);
        for key in &pending {
            println!("  {key}");
        }
        let proceed = confirm("Proceed with imports?").map_err(|err| fail(EXIT_INPUT, err))?;
        if !proceed {
            println!("Exiting...");
            return Ok(());
        }
    }

    let summary = importer
        .process(&filters)
        .map_err(|err| {
            fail(
                EXIT_OPERATION,
                anyhow::Error::from(err)
                    .context(format!("Problem importing from bucket: {bucket}")),
            )
        })?;
    println!(
        "Imported {} archive(s); {} failed",
        summary.completed.len(),
        summary.failed.len()
    );
    if !summary.all_succeeded() {
        return Err(fail(
            EXIT_OPERATION,
            anyhow::anyhow!(
                "{} archive(s) failed to import: {}",
                summary.failed.len(),
                summary.failed.join(", ")
            ),
        ));
    }
    info!("Store media import completed");
    Ok(())
}
