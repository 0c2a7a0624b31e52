//! Error taxonomy and the command-context wrapper.
//!
//! Every failure raised while building parameters or performing the remote
//! call is wrapped into a [`CommandError`] carrying the resolved
//! [`CommandContext`], then re-propagated unchanged to `main`, which renders
//! it once and translates it to a non-zero exit.

use std::fmt;

use thiserror::Error;

use crate::params::ParamMap;

/// Failures of a single command invocation.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid CLI option, parameter, or attribute token.
    #[error("{message}")]
    Usage {
        /// The offending field, e.g. `--name`.
        field: String,
        /// Human-readable description naming the field.
        message: String,
    },

    /// No candidate control socket responded during discovery.
    #[error("volumed does not appear to be running (no control socket found)")]
    Discovery,

    /// The service answered with a status outside the acceptable set.
    #[error("unexpected response status {status}: {body}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded; `(empty)` when absent.
        body: String,
    },

    /// The response body was not valid JSON where decoding was required.
    #[error("invalid JSON in response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The response could not be parsed as HTTP.
    #[error("malformed response: {0}")]
    Protocol(String),

    /// A remote call over an explicit TCP endpoint failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection-level I/O failure.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    /// The invocation was interrupted.
    #[error("interrupted")]
    Interrupted,

    /// Output serialization failed.
    #[error("output error: {0}")]
    Format(String),
}

impl Error {
    /// Usage error for a missing required option or parameter.
    #[must_use]
    pub fn missing(field: &str) -> Self {
        Self::Usage {
            field: field.to_string(),
            message: format!("required option {field} missing"),
        }
    }

    /// Usage error for an invalid value of `field`.
    #[must_use]
    pub fn usage(field: &str, message: &str) -> Self {
        Self::Usage {
            field: field.to_string(),
            message: format!("{field}: {message}"),
        }
    }

    /// Process exit code this failure maps to.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage { .. } => 2,
            _ => 1,
        }
    }

    /// Attach the resolved command context.
    #[must_use]
    pub fn with_context(self, context: CommandContext) -> CommandError {
        CommandError { context, source: self }
    }
}

/// Resolved state of the executing command at the point of failure.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    path: Vec<&'static str>,
    params: serde_json::Map<String, serde_json::Value>,
}

impl CommandContext {
    /// Context for the command at `path` (e.g. `["volume", "create"]`).
    #[must_use]
    pub fn new(path: Vec<&'static str>) -> Self {
        Self {
            path,
            params: serde_json::Map::new(),
        }
    }

    /// Snapshot the parameters resolved so far.
    pub fn record(&mut self, params: &ParamMap) {
        self.params = params.as_map().clone();
    }

    /// The command path as typed, e.g. `volume create`.
    #[must_use]
    pub fn command_path(&self) -> String {
        self.path.join(" ")
    }

    /// Resource kind (first path segment), when any.
    #[must_use]
    pub fn resource(&self) -> Option<&'static str> {
        self.path.first().copied()
    }

    /// Operation verb (last path segment), when any.
    #[must_use]
    pub fn verb(&self) -> Option<&'static str> {
        self.path.last().copied()
    }

    /// Parameters that had been resolved before the failure.
    #[must_use]
    pub fn params(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.params
    }
}

impl fmt::Display for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_path())
    }
}

/// An [`Error`] annotated with the command it occurred in.
#[derive(Debug)]
pub struct CommandError {
    /// Resolved command state at the failure site.
    pub context: CommandContext,
    /// The underlying failure, unmodified.
    pub source: Error,
}

impl CommandError {
    /// Process exit code this failure maps to.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.source.exit_code()
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.command_path().is_empty() {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{}: {}", self.context, self.source)
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
