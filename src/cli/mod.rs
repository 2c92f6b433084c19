//! CLI module for the bgremove library
//!
//! This module is only available when the "cli" feature is enabled.

#[path = "main.rs"]
mod main_impl;

pub use main_impl::{main, remove_background, run, Cli, ShellError, USAGE};
