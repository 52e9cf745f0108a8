// Internal library for testing purposes
// Not intended for external use as a library

#[cfg(feature = "cli")]
pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod mask;
pub mod sink;
pub mod split;
pub mod transport;

pub use error::{Result, SplitShareError};
