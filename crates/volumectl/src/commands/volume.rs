//! Volume command implementation.
//!
//! Provides create, remove, inspect, list, and backup operations against the
//! `/volume` resource.

use std::io::Write;

use crate::cli::VolumeCommands;
use crate::client::ResourceClient;
use crate::config::GlobalConfig;
use crate::error::{CommandContext, CommandError, Error};
use crate::output::Formatter;
use crate::params::ParamMap;

use super::{build_create_params, require};

/// Volume command executor.
pub struct VolumeCommand<'a> {
    client: &'a ResourceClient<'a>,
    config: &'a GlobalConfig,
}

impl<'a> VolumeCommand<'a> {
    /// Executor backed by the `/volume` resource client.
    #[must_use]
    pub fn new(client: &'a ResourceClient<'a>, config: &'a GlobalConfig) -> Self {
        Self { client, config }
    }

    /// Execute a volume subcommand; returns the resolved command context.
    ///
    /// # Errors
    ///
    /// Any failure is returned wrapped with the resolved command context.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        command: &VolumeCommands,
    ) -> Result<CommandContext, CommandError> {
        let mut context = CommandContext::new(vec!["volume", command.verb()]);
        match self.run(writer, &mut context, command).await {
            Ok(()) => Ok(context),
            Err(source) => Err(source.with_context(context)),
        }
    }

    async fn run<W: Write>(
        &self,
        writer: &mut W,
        context: &mut CommandContext,
        command: &VolumeCommands,
    ) -> Result<(), Error> {
        let formatter = Formatter::new(self.config);

        match command {
            VolumeCommands::Create(args) => {
                let params = build_create_params(args, context)?;
                let payload = self.client.create(params).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            VolumeCommands::Remove { otp, name } => {
                let name = require(name.as_deref(), "NAME")?;
                let mut params = ParamMap::new();
                params.insert_opt("otp", otp.as_deref());
                context.record(&params);

                let response = self.client.delete(name, params).await?;
                let payload = response.decode()?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            VolumeCommands::Inspect { name } => {
                let name = require(name.as_deref(), "NAME")?;
                let payload = self.client.inspect(name, ParamMap::new()).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            VolumeCommands::List => {
                let payload = self.client.list(ParamMap::new()).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            VolumeCommands::Backup { name, backup_name, s3 } => {
                let name = require(name.as_deref(), "NAME")?;
                let mut params = ParamMap::new();
                params.insert_opt("name", backup_name.as_deref());
                params.insert_opt("s3", s3.as_deref());
                context.record(&params);

                let payload = self.client.backup(name, params).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
        }
        Ok(())
    }
}
