//! External process adapter: bounded, cancellable invocations of helper binaries.

pub mod command;
pub mod runner;

pub use command::ExternalCommand;
pub use runner::{run_fallback_chain, ProcessRunner, TokioProcessRunner};
