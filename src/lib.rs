pub mod bridge;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod evaluator;
pub mod logging;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod supervisor;
pub mod testing;
pub mod transcript;
