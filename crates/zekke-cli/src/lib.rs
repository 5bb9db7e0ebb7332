//! ZeKKe CLI library.
//!
//! Argument parsing helpers and output rendering shared by the `zekke-cli`
//! binary and its tests.

pub mod args;
pub mod output;
