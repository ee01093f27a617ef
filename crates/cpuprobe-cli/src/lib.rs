//! Command-line front end for cpuprobe.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Dependencies used only by the binary in main.rs
use anyhow as _;
use cpuprobe_runtime as _;
use dotenvy as _;
use tracing as _;
use tracing_subscriber as _;

pub mod error;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use error::CliError;
pub use parser::Cli;
