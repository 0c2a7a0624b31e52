//! volumectl binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use volumectl::cli::{self, Cli, Commands};
use volumectl::client::ResourceClient;
use volumectl::commands::{BackupCommand, ProfileCommand, VersionCommand, VolumeCommand};
use volumectl::config::GlobalConfig;
use volumectl::error::{CommandContext, CommandError, Error};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing; --debug raises the default filter, RUST_LOG wins.
    let default_filter = if cli.debug { "volumectl=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.help {
        let path = cli.command.as_ref().map(Commands::path).unwrap_or_default();
        print!("{}", cli::render_usage(&path, cli.verbose || cli.debug));
        return ExitCode::SUCCESS;
    }

    let Some(command) = cli.command.clone() else {
        eprint!("{}", cli::render_usage(&[], cli.verbose || cli.debug));
        return ExitCode::from(2);
    };

    let config = match GlobalConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(source) => {
            let err = source.with_context(CommandContext::new(command.path()));
            eprintln!("{err}");
            return ExitCode::from(err.exit_code());
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        tokio::select! {
            result = run(&command, &config) => result,
            _ = tokio::signal::ctrl_c() => {
                Err(Error::Interrupted.with_context(CommandContext::new(command.path())))
            }
        }
    });

    match result {
        Ok(_context) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

/// Dispatch the resolved command through its executor.
async fn run(command: &Commands, config: &GlobalConfig) -> Result<CommandContext, CommandError> {
    // The three resource clients are built once here and passed by reference.
    let volumes = ResourceClient::new(config, "volume");
    let profiles = ResourceClient::new(config, "profile");
    let backups = ResourceClient::new(config, "backup");
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Volume(command) => {
            VolumeCommand::new(&volumes, config)
                .execute(&mut stdout, command)
                .await
        }
        Commands::Profile(command) => {
            ProfileCommand::new(&profiles, config)
                .execute(&mut stdout, command)
                .await
        }
        Commands::Backup(command) => {
            BackupCommand::new(&backups, config)
                .execute(&mut stdout, command)
                .await
        }
        Commands::Version => VersionCommand::new(&volumes, config).execute(&mut stdout).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_volume_list() {
        let cli = Cli::parse_from(["volumectl", "volume", "list"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Volume(volumectl::cli::VolumeCommands::List))
        ));
    }

    #[test]
    fn cli_without_command_is_allowed_for_help() {
        let cli = Cli::parse_from(["volumectl", "-h"]);
        assert!(cli.help);
        assert!(cli.command.is_none());
    }

    #[tokio::test]
    async fn run_fails_with_discovery_error_when_no_service() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = Cli::parse_from([
            "volumectl",
            "--socket-dir",
            dir.path().to_str().expect("utf8"),
            "volume",
            "list",
        ]);
        let command = cli.command.clone().expect("command");
        let config = GlobalConfig::from_cli(&cli).expect("config");

        let err = run(&command, &config).await.expect_err("no service");
        assert!(matches!(err.source, Error::Discovery));
        assert_eq!(err.context.command_path(), "volume list");
    }
}
