//! Mega command - reconcile imports with the MEGA cloud, or recover the
//! MEGAcmd background server.

use crate::cli::{fail, press_enter, CommandResult, EXIT_INPUT, EXIT_OPERATION};
use clap::Subcommand;
use shoebox_sync::{kill_server, MegaCmd, SyncReconciler};
use std::path::PathBuf;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum MegaAction {
    /// Upload completed imports that are missing from the MEGA remote
    Upload {
        /// Root directory of the imports on this machine
        #[arg(long = "root-import-dir")]
        root_import_dir: PathBuf,

        /// Root directory of the same media on MEGA
        #[arg(long = "mega-root")]
        mega_root: String,

        /// Skip the interactive prerequisite check
        #[arg(long)]
        force: bool,
    },

    /// Kill the MEGAcmd background server and any wedged transfers
    Kill,
}

pub fn run(action: MegaAction) -> CommandResult {
    match action {
        MegaAction::Upload {
            root_import_dir,
            mega_root,
            force,
        } => run_upload(root_import_dir, mega_root, force),
        MegaAction::Kill => run_kill(),
    }
}

fn run_upload(root_import_dir: PathBuf, mega_root: String, force: bool) -> CommandResult {
    if !force {
        println!("Please ensure the following and press ENTER when ready:");
        println!("  1. You have a MEGA account");
        println!("  2. The MEGAcmd application is installed and started");
        println!("  3. In the MEGAcmd server, run [update --auto=OFF] so it does not restart mid-batch");
        press_enter("Press enter when ready: ").map_err(|err| fail(EXIT_INPUT, err))?;
    }

    let mega = MegaCmd::new();
    let reconciler = SyncReconciler::new(&mega, &root_import_dir, mega_root);
    let report = reconciler.sync().map_err(|err| {
        fail(
            EXIT_OPERATION,
            anyhow::Error::from(err).context(format!(
                "Problem syncing imports from: {}",
                root_import_dir.display()
            )),
        )
    })?;

    println!(
        "Reconciled {} item(s): {} already on remote, {} uploaded, {} recorded earlier, {} foreign",
        report.reconciled(),
        report.already_on_remote.len(),
        report.uploaded.len(),
        report.already_recorded,
        report.foreign
    );
    if !report.failed.is_empty() {
        for path in &report.failed {
            println!("FAILED: {}", path.display());
        }
        return Err(fail(
            EXIT_OPERATION,
            anyhow::anyhow!("{} upload(s) failed after retries", report.failed.len()),
        ));
    }
    info!("Remote sync completed");
    Ok(())
}

fn run_kill() -> CommandResult {
    let killed = kill_server().map_err(|err| {
        fail(
            EXIT_INPUT,
            anyhow::Error::from(err).context("Problem killing the MEGAcmd server"),
        )
    })?;
    println!("Signalled {killed} MEGAcmd server process(es)");
    Ok(())
}
