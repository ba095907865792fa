pub mod record;
pub mod state;

pub use record::{DownloadAttempt, DownloadStatus, Record};
pub use state::{LoginStatus, RunState, RunStatistics, SessionState, WorkflowPhase};
