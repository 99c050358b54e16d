pub mod ingress;
pub mod runtime;
pub mod types;

pub use ingress::{IngressError, IngressErrorKind, SessionIngress, session_channel};
pub use runtime::MeetingSession;
pub use types::{CycleRecord, SessionEvent, SessionSummary};
