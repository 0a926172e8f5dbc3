//! Command-line entry point for the incident relay.

pub mod bootstrap;
pub mod cli_args;
pub mod commands;

pub use bootstrap::init_tracing;
pub use cli_args::{Cli, CliCommand};
pub use commands::{build_poll_loop, inspect_store, run_once, run_relay};
