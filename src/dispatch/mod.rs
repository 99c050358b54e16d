pub mod dispatcher;
pub mod error;
pub mod ports;
pub mod sinks;

pub use dispatcher::{DispatchPolicy, DispatchReceipt, Dispatcher, SinkKind, render_message};
pub use error::{DispatchError, DispatchErrorKind};
pub use ports::OutputSink;
pub use sinks::TracingOutputSink;
