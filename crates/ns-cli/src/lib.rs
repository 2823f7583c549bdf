//! Night sleep tracker CLI library.
//!
//! This crate provides the `ns` command-line host for the night editor.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, Edge};
pub use config::Config;
