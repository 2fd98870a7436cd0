// ── Offline handling ──

mod detector;
mod operation;
mod state;
mod timers;

pub use detector::OfflineDetector;
pub use operation::{OperationKind, PendingOperation};
pub use state::{ConnectivityState, OfflineEvent};
