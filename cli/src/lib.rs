//! `tcli`, a command-line client for the todo API.
//!
//! Argument parsing lives in `args`, the work in `commands`, and all output
//! in `render`. HTTP goes through `transport::UreqTransport`, which plugs
//! into `todo_core::TodoApi`.

pub mod args;
pub mod commands;
pub mod dates;
pub mod error;
pub mod identify;
pub mod logging;
pub mod render;
pub mod transport;

pub use args::Cli;
pub use error::CliError;
