//! # weft-cli
//!
//! The `weft` command layer: mesh lifecycle (`init`, `start`, `stop`,
//! `status`), trust operations (`invite`, `join`), and operator messaging
//! (`send`, `ask`, `peers`). Kept thin; everything interesting lives in the
//! library crates.

mod commands;

pub use commands::Cli;
