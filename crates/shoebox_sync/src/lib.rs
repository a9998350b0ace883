//! Remote-sync reconciliation.
//!
//! Diffs the locally completed imports against the remote-upload ledger and
//! pushes the difference through the external MEGAcmd tool, which is treated
//! as unreliable by design: its background server can wedge, and killing and
//! restarting it between attempts is the documented recovery action, not an
//! error path.

pub mod error;
pub mod mega;
pub mod reconcile;

pub use error::SyncError;
pub use mega::{kill_server, server_pids, MegaCmd, RemoteSync};
pub use reconcile::{ReconcileReport, SyncLedger, SyncReconciler};
