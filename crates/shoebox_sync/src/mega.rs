//! MEGAcmd subprocess wrapper.
//!
//! Uploads go through `mega-put`, existence probes through `mega-ls`. The
//! MEGAcmd suite keeps a background server process that is known to wedge
//! under long batch uploads; [`kill_server`] tears it down so a retry can
//! start it fresh.

use crate::error::SyncError;
use std::path::Path;
use std::process::Command;
use sysinfo::{ProcessesToUpdate, Signal, System};
use tracing::{debug, info, warn};

/// Exit code `mega-ls` uses for an absent remote path. Not an error: it is
/// the negative half of the existence probe.
pub const MEGA_NOT_FOUND_EXIT: i32 = 53;

/// Process names belonging to the MEGAcmd background server.
const MEGA_SERVER_NAMES: &[&str] = &["mega-cmd-server", "mega-cmd"];

/// Captured result of one sync-tool invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub code: i32,
    pub output: String,
}

/// The slice of remote-sync behavior the reconciler depends on. Split out
/// so reconciliation logic can be exercised against a scripted fake.
pub trait RemoteSync {
    /// Whether `remote_path` already exists on the remote.
    fn exists(&self, remote_path: &str) -> Result<bool, SyncError>;

    /// Upload a local file or directory to `remote_path`.
    fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), SyncError>;

    /// Recovery action between retry attempts.
    fn restart(&self) -> Result<(), SyncError>;
}

/// The real MEGAcmd CLI.
#[derive(Debug, Default)]
pub struct MegaCmd;

impl MegaCmd {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, SyncError> {
        let rendered = format!("{} {}", program, args.join(" "));
        debug!("Running sync tool command: [{}]", rendered);
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| SyncError::Spawn {
                command: rendered.clone(),
                source,
            })?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        // A killed process has no exit code; treat it as a generic failure.
        let code = output.status.code().unwrap_or(-1);
        Ok(CommandOutput {
            code,
            output: combined,
        })
    }
}

impl RemoteSync for MegaCmd {
    fn exists(&self, remote_path: &str) -> Result<bool, SyncError> {
        let result = self.run("mega-ls", &[remote_path])?;
        match result.code {
            0 => Ok(true),
            MEGA_NOT_FOUND_EXIT => Ok(false),
            code => Err(SyncError::CommandFailed {
                command: format!("mega-ls {remote_path}"),
                code,
                output: result.output,
            }),
        }
    }

    fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), SyncError> {
        let local = local_path.display().to_string();
        let args = ["-c", "--ignore-quota-warn", local.as_str(), remote_path];
        info!("Uploading {} to remote path {}", local, remote_path);
        let result = self.run("mega-put", &args)?;
        if result.code != 0 {
            return Err(SyncError::CommandFailed {
                command: format!("mega-put {local} {remote_path}"),
                code: result.code,
                output: result.output,
            });
        }
        Ok(())
    }

    fn restart(&self) -> Result<(), SyncError> {
        let killed = kill_server()?;
        info!("Sync tool recovery: terminated {} server process(es)", killed);
        Ok(())
    }
}

/// PIDs of running MEGAcmd server processes.
pub fn server_pids() -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system
        .processes()
        .iter()
        .filter(|(_, process)| {
            let name = process.name().to_string_lossy();
            MEGA_SERVER_NAMES.iter().any(|server| name.contains(server))
        })
        .map(|(pid, _)| pid.as_u32())
        .collect()
}

/// Terminate (then kill) every MEGAcmd server process. Returns how many
/// processes were signalled.
pub fn kill_server() -> Result<usize, SyncError> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut signalled = 0usize;
    for (pid, process) in system.processes() {
        let name = process.name().to_string_lossy().into_owned();
        if !MEGA_SERVER_NAMES.iter().any(|server| name.contains(server)) {
            continue;
        }
        info!("Stopping sync-tool server process {} ({})", pid, name);
        // Ask politely first; fall back to SIGKILL where TERM is unsupported
        // or ignored.
        match process.kill_with(Signal::Term) {
            Some(true) => {}
            _ => {
                if !process.kill() {
                    warn!("Could not signal process {} ({})", pid, name);
                    continue;
                }
            }
        }
        signalled += 1;
    }
    if signalled == 0 {
        info!("No sync-tool server processes found");
    }
    Ok(signalled)
}
