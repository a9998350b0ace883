//! Init command - create the media inbox directory tree.

use crate::cli::{fail, CommandResult, EXIT_INPUT};
use shoebox_media::Directories;
use std::path::PathBuf;

#[derive(Debug)]
pub struct InitArgs {
    pub media_inbox: Option<PathBuf>,
}

pub fn run(args: InitArgs) -> CommandResult {
    let dirs = Directories::resolve(None, args.media_inbox).map_err(|err| fail(EXIT_INPUT, err))?;
    dirs.ensure().map_err(|err| fail(EXIT_INPUT, err))?;
    println!("Media inbox ready: {}", dirs.media_inbox.display());
    println!("  auto imports:  {}", dirs.auto_import_dir.display());
    println!("  archive files: {}", dirs.archive_files_dir.display());
    Ok(())
}
