//! Storage profile command implementation.

use std::io::Write;

use crate::cli::ProfileCommands;
use crate::client::ResourceClient;
use crate::config::GlobalConfig;
use crate::error::{CommandContext, CommandError, Error};
use crate::output::Formatter;
use crate::params::ParamMap;

use super::{build_create_params, require};

/// Profile command executor.
pub struct ProfileCommand<'a> {
    client: &'a ResourceClient<'a>,
    config: &'a GlobalConfig,
}

impl<'a> ProfileCommand<'a> {
    /// Executor backed by the `/profile` resource client.
    #[must_use]
    pub fn new(client: &'a ResourceClient<'a>, config: &'a GlobalConfig) -> Self {
        Self { client, config }
    }

    /// Execute a profile subcommand; returns the resolved command context.
    ///
    /// # Errors
    ///
    /// Any failure is returned wrapped with the resolved command context.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        command: &ProfileCommands,
    ) -> Result<CommandContext, CommandError> {
        let mut context = CommandContext::new(vec!["profile", command.verb()]);
        match self.run(writer, &mut context, command).await {
            Ok(()) => Ok(context),
            Err(source) => Err(source.with_context(context)),
        }
    }

    async fn run<W: Write>(
        &self,
        writer: &mut W,
        context: &mut CommandContext,
        command: &ProfileCommands,
    ) -> Result<(), Error> {
        let formatter = Formatter::new(self.config);

        match command {
            ProfileCommands::Create(args) => {
                let params = build_create_params(args, context)?;
                let payload = self.client.create(params).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            ProfileCommands::Remove { name } => {
                let name = require(name.as_deref(), "NAME")?;
                let response = self.client.delete(name, ParamMap::new()).await?;
                let payload = response.decode()?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            ProfileCommands::Inspect { name } => {
                let name = require(name.as_deref(), "NAME")?;
                let payload = self.client.inspect(name, ParamMap::new()).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
            ProfileCommands::List => {
                let payload = self.client.list(ParamMap::new()).await?;
                formatter.render(writer, context, payload.as_ref())?;
            }
        }
        Ok(())
    }
}
