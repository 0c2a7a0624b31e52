//! Version command implementation.
//!
//! Prints the client version; the service version is appended when an
//! endpoint answers. Reaching the service is best-effort and never fails the
//! command.

use std::io::Write;

use serde_json::Value;
use tracing::debug;

use crate::client::ResourceClient;
use crate::config::{GlobalConfig, RenderMode};
use crate::error::{CommandContext, CommandError, Error};
use crate::output::Formatter;
use crate::params::ParamMap;

/// Version command executor.
pub struct VersionCommand<'a> {
    volumes: &'a ResourceClient<'a>,
    config: &'a GlobalConfig,
}

impl<'a> VersionCommand<'a> {
    /// Executor; the volume client carries the `info` probe.
    #[must_use]
    pub fn new(volumes: &'a ResourceClient<'a>, config: &'a GlobalConfig) -> Self {
        Self { volumes, config }
    }

    /// Execute the version command; returns the resolved command context.
    ///
    /// # Errors
    ///
    /// Any failure is returned wrapped with the resolved command context.
    pub async fn execute<W: Write>(&self, writer: &mut W) -> Result<CommandContext, CommandError> {
        let mut context = CommandContext::new(vec!["version"]);
        match self.run(writer, &mut context).await {
            Ok(()) => Ok(context),
            Err(source) => Err(source.with_context(context)),
        }
    }

    async fn run<W: Write>(&self, writer: &mut W, context: &mut CommandContext) -> Result<(), Error> {
        let server = match self.volumes.info(ParamMap::new()).await {
            Ok(payload) => payload.and_then(|info| {
                info.get("version").and_then(Value::as_str).map(String::from)
            }),
            Err(err) => {
                debug!(error = %err, "service version unavailable");
                None
            }
        };

        if matches!(self.config.render, RenderMode::Human) {
            writeln!(writer, "volumectl {}", self.config.version)?;
            if let Some(version) = server {
                writeln!(writer, "volumed {version}")?;
            }
            return Ok(());
        }

        let mut payload = serde_json::Map::new();
        payload.insert("client".into(), Value::String(self.config.version.clone()));
        if let Some(version) = server {
            payload.insert("server".into(), Value::String(version));
        }
        Formatter::new(self.config).render(writer, context, Some(&Value::Object(payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    fn config_for(argv: &[&str]) -> GlobalConfig {
        GlobalConfig::from_cli(&Cli::parse_from(argv)).expect("config")
    }

    #[tokio::test]
    async fn prints_client_version_when_service_is_down() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_for(&[
            "volumectl", "--socket-dir", dir.path().to_str().expect("utf8"), "version",
        ]);
        let volumes = ResourceClient::new(&config, "volume");

        let mut buf = Vec::new();
        VersionCommand::new(&volumes, &config)
            .execute(&mut buf)
            .await
            .expect("version never fails on unreachable service");

        let output = String::from_utf8(buf).expect("valid utf8");
        assert!(output.starts_with("volumectl "));
        assert!(!output.contains("volumed "));
    }

    #[tokio::test]
    async fn machine_mode_emits_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_for(&[
            "volumectl", "--machine", "--socket-dir", dir.path().to_str().expect("utf8"),
            "version",
        ]);
        let volumes = ResourceClient::new(&config, "volume");

        let mut buf = Vec::new();
        VersionCommand::new(&volumes, &config)
            .execute(&mut buf)
            .await
            .expect("version");

        let output = String::from_utf8(buf).expect("valid utf8");
        let parsed: Value = serde_json::from_str(&output).expect("valid json");
        assert!(parsed["client"].is_string());
    }
}
