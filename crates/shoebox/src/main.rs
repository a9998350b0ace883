//! shoebox - personal media lifecycle CLI.
//!
//! Bundles scattered media into dated, size-bounded archives, imports them
//! into a date-partitioned library, and reconciles that library against an
//! object store and an encrypted cloud remote.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "shoebox", version, about = "Personal media archiving, importing and mirroring")]
struct Cli {
    /// Enable verbose logging (debug level to the console)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bundle a directory of media into dated, size-bounded zip archives
    Archive {
        /// Directory of media files to archive
        #[arg(long)]
        dir: PathBuf,

        /// Upload finished archives to this S3 bucket
        #[arg(long = "s3-bucket")]
        s3_bucket: Option<String>,

        /// Staging directory for archives (default: the media inbox)
        #[arg(long = "media-inbox")]
        media_inbox: Option<PathBuf>,

        /// Identity word for archive names instead of a random one
        #[arg(long)]
        keyword: Option<String>,

        /// Library name recorded in bundle provenance
        #[arg(long)]
        library: Option<String>,
    },

    /// Import media from a local directory or a bucket of archives
    Import {
        /// Local directory of media files to import
        #[arg(long)]
        dir: Option<PathBuf>,

        /// S3 bucket holding archive bundles to import
        #[arg(long = "s3-bucket")]
        s3_bucket: Option<String>,

        /// Root directory to import media files under
        #[arg(long = "root-import-dir")]
        root_import_dir: Option<PathBuf>,

        /// Staging directory for downloads (default: the media inbox)
        #[arg(long = "media-inbox")]
        media_inbox: Option<PathBuf>,

        /// Library to import into, under the root import dir
        #[arg(long)]
        library: Option<String>,

        /// Comma-separated substrings to filter bucket keys on
        #[arg(long)]
        filters: Option<String>,

        /// List remaining archives instead of importing
        #[arg(long)]
        list: bool,

        /// Import without asking for confirmation
        #[arg(long)]
        force: bool,

        /// Delete the source directory after a clean import
        #[arg(long)]
        cleanup: bool,
    },

    /// Delete previously imported copies of media
    Unimport {
        /// Local directory whose imported copies should be removed
        #[arg(long)]
        dir: Option<PathBuf>,

        /// S3 bucket whose archives should be un-imported
        #[arg(long = "s3-bucket")]
        s3_bucket: Option<String>,

        /// Root directory the media was imported under
        #[arg(long = "root-import-dir")]
        root_import_dir: Option<PathBuf>,

        /// Staging directory for downloads (default: the media inbox)
        #[arg(long = "media-inbox")]
        media_inbox: Option<PathBuf>,

        /// Library the media was imported into
        #[arg(long)]
        library: Option<String>,

        /// Comma-separated substrings to filter bucket keys on
        #[arg(long)]
        filters: Option<String>,
    },

    /// Re-bundle archives listed in the re-archive ledger
    Rearchive {
        /// S3 bucket holding the archives
        #[arg(long = "s3-bucket")]
        s3_bucket: String,

        /// Staging directory for downloads (default: the media inbox)
        #[arg(long = "media-inbox")]
        media_inbox: Option<PathBuf>,

        /// Library name recorded in the new bundles
        #[arg(long)]
        library: Option<String>,
    },

    /// Reconcile imports with the MEGA cloud
    Mega {
        #[command(subcommand)]
        action: cli::mega::MegaAction,
    },

    /// Create the media inbox directory tree
    Init {
        /// Media inbox location (default: Desktop/Media_Inbox)
        #[arg(long = "media-inbox")]
        media_inbox: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = if verbose { "shoebox=debug" } else { "shoebox=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let mut log_guard = None;
    let file_layer = match cli::ensure_logs_dir() {
        Ok(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "shoebox.log");
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            log_guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| default_filter.into()),
                    ),
            )
        }
        Err(err) => {
            eprintln!("Warning: failed to create logs directory: {}", err);
            None
        }
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();
    log_guard
}

fn dispatch(command: Commands) -> cli::CommandResult {
    match command {
        Commands::Archive {
            dir,
            s3_bucket,
            media_inbox,
            keyword,
            library,
        } => cli::archive::run(cli::archive::ArchiveArgs {
            dir,
            s3_bucket,
            media_inbox,
            keyword,
            library,
        }),
        Commands::Import {
            dir,
            s3_bucket,
            root_import_dir,
            media_inbox,
            library,
            filters,
            list,
            force,
            cleanup,
        } => cli::import::run(cli::import::ImportArgs {
            dir,
            s3_bucket,
            root_import_dir,
            media_inbox,
            library,
            filters,
            list,
            force,
            cleanup,
        }),
        Commands::Unimport {
            dir,
            s3_bucket,
            root_import_dir,
            media_inbox,
            library,
            filters,
        } => cli::unimport::run(cli::unimport::UnimportArgs {
            dir,
            s3_bucket,
            root_import_dir,
            media_inbox,
            library,
            filters,
        }),
        Commands::Rearchive {
            s3_bucket,
            media_inbox,
            library,
        } => cli::rearchive::run(cli::rearchive::RearchiveArgs {
            s3_bucket,
            media_inbox,
            library,
        }),
        Commands::Mega { action } => cli::mega::run(action),
        Commands::Init { media_inbox } => cli::init::run(cli::init::InitArgs { media_inbox }),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // Held until exit so buffered file logs flush.
    let _log_guard = init_logging(cli.verbose);

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            // Print the causal chain: what failed, and what it broke.
            error!("{}", failure.error);
            for cause in failure.error.chain().skip(1) {
                error!("  caused by: {}", cause);
            }
            ExitCode::from(failure.exit_code)
        }
    }
}
