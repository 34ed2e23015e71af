//! Command-line front end for the calendar import pipeline.
//!
//! This crate provides the `calimport` binary: it loads the configuration,
//! reads or fetches the feed, runs the pipeline, writes the result artifacts
//! and optionally exports accepted events.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
