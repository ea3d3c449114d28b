//! CLI module for loadpulse - command-line interface and run modes.
//!
//! Provides the argument parser and the mapping from the mode argument to a
//! continuous run or a single workload.

pub mod commands;

pub use commands::{Cli, MODE_NAMES, Mode};
