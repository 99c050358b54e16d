pub mod arbiter;
pub mod cycle;
pub mod gates;
pub mod similarity;
pub mod state;
pub mod types;

pub use arbiter::arbitrate;
pub use cycle::{CycleDisposition, CycleReport, Supervisor};
pub use similarity::{ContentProfile, fingerprint};
pub use state::{EmissionRecord, EmissionStatistics, SourceCounters, SupervisorState};
pub use types::{Arbitration, ArbitrationPolicy, Rejection, RejectionReason};
