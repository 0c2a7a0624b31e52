//! # volumectl
//!
//! Command-line client for the `volumed` storage-volume management service.
//!
//! Provides commands for:
//! - Volume lifecycle (create, inspect, list, remove, back up)
//! - Storage profile management
//! - Backup management
//!
//! # Architecture
//!
//! The CLI talks HTTP/1.1 with JSON bodies over a Unix domain socket
//! discovered under `/var/run/volumed*`, or over TCP when an explicit
//! endpoint is configured. A single invocation performs at most one remote
//! call and exits.
//!
//! ```text
//! ┌───────────┐      HTTP over UDS      ┌───────────┐
//! │ volumectl │◄───────────────────────►│  volumed  │
//! └───────────┘   /volume /profile ...  └───────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod params;

pub use cli::{Cli, Commands};
pub use client::{RemoteRequest, RemoteResponse, ResourceClient, Transport};
pub use config::GlobalConfig;
pub use error::{CommandContext, CommandError, Error};
pub use output::Formatter;
pub use params::ParamMap;
