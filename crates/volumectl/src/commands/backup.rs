//! Backup command implementation.
//!
//! All operations optionally scope to a profile via `--profile`, passed as a
//! query parameter.

use std::io::Write;

use crate::cli::BackupCommands;
use crate::client::ResourceClient;
use crate::config::GlobalConfig;
use crate::error::{CommandContext, CommandError, Error};
use crate::output::Formatter;
use crate::params::ParamMap;

use super::require;

/// Backup command executor.
pub struct BackupCommand<'a> {
    client: &'a ResourceClient<'a>,
    config: &'a GlobalConfig,
}

impl<'a> BackupCommand<'a> {
    /// Executor backed by the `/backup` resource client.
    #[must_use]
    pub fn new(client: &'a ResourceClient<'a>, config: &'a GlobalConfig) -> Self {
        Self { client, config }
    }

    /// Execute a backup subcommand; returns the resolved command context.
    ///
    /// # Errors
    ///
    /// Any failure is returned wrapped with the resolved command context.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        command: &BackupCommands,
    ) -> Result<CommandContext, CommandError> {
        let mut context = CommandContext::new(vec!["backup", command.verb()]);
        match self.run(writer, &mut context, command).await {
            Ok(()) => Ok(context),
            Err(source) => Err(source.with_context(context)),
        }
    }

    async fn run<W: Write>(
        &self,
        writer: &mut W,
        context: &mut CommandContext,
        command: &BackupCommands,
    ) -> Result<(), Error> {
        let formatter = Formatter::new(self.config);

        match command {
            BackupCommands::List { profile } => {
                let params = profile_params(profile.as_deref());
                context.record(&params);
                let payload = self.client.list(params).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            BackupCommands::Inspect { profile, name } => {
                let name = require(name.as_deref(), "NAME")?;
                let params = profile_params(profile.as_deref());
                context.record(&params);
                let payload = self.client.inspect(name, params).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            BackupCommands::Remove { profile, name } => {
                let name = require(name.as_deref(), "NAME")?;
                let params = profile_params(profile.as_deref());
                context.record(&params);
                let response = self.client.delete(name, params).await?;
                let payload = response.decode()?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            BackupCommands::Info { profile } => {
                let params = profile_params(profile.as_deref());
                context.record(&params);
                let payload = self.client.info(params).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
        }
        Ok(())
    }
}

fn profile_params(profile: Option<&str>) -> ParamMap {
    let mut params = ParamMap::new();
    params.insert_opt("profile", profile);
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Commands};

    fn config_for(argv: &[&str]) -> GlobalConfig {
        GlobalConfig::from_cli(&Cli::parse_from(argv)).expect("config")
    }

    #[test]
    fn profile_param_is_optional() {
        assert!(profile_params(None).is_empty());
        assert_eq!(profile_params(Some("gold")).as_map()["profile"], "gold");
    }

    #[tokio::test]
    async fn inspect_requires_a_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_for(&[
            "volumectl", "--socket-dir", dir.path().to_str().expect("utf8"),
            "backup", "inspect",
        ]);
        let cli = Cli::parse_from(["volumectl", "backup", "inspect", "--profile", "gold"]);
        let Some(Commands::Backup(command)) = cli.command else {
            panic!("expected backup command");
        };

        let client = ResourceClient::new(&config, "backup");
        let mut buf = Vec::new();
        let err = BackupCommand::new(&client, &config)
            .execute(&mut buf, &command)
            .await
            .expect_err("usage error");

        assert!(err.to_string().contains("NAME"));
        assert_eq!(err.context.command_path(), "backup inspect");
    }

    #[tokio::test]
    async fn info_surfaces_discovery_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_for(&[
            "volumectl", "--socket-dir", dir.path().to_str().expect("utf8"),
            "backup", "info",
        ]);
        let cli = Cli::parse_from(["volumectl", "backup", "info"]);
        let Some(Commands::Backup(command)) = cli.command else {
            panic!("expected backup command");
        };

        let client = ResourceClient::new(&config, "backup");
        let mut buf = Vec::new();
        let err = BackupCommand::new(&client, &config)
            .execute(&mut buf, &command)
            .await
            .expect_err("no socket");

        assert!(matches!(err.source, Error::Discovery));
    }
}
