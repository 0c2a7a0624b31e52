//! Command-line argument parsing with clap.
//!
//! The derive structs below are the single source of truth for every option,
//! including the hidden endpoint/auth flags and the env-backed overrides.
//! The built-in help flag is disabled on every node: `-h/--help` is declared
//! as an ordinary global flag so that help requests short-circuit execution
//! in the binary entrypoint and can reveal hidden options under `--verbose`.

use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};

/// volumectl - storage volume management client.
#[derive(Parser, Debug, Clone)]
#[command(name = "volumectl")]
#[command(version, about, long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Print help for the selected command.
    #[arg(short = 'h', long, global = true, action = ArgAction::SetTrue)]
    pub help: bool,

    /// Verbose output (with --help, also shows hidden options).
    #[arg(long, global = true, env = "VOLUMECTL_VERBOSE", value_parser = FalseyValueParser::new())]
    pub verbose: bool,

    /// Debug output (implies --verbose, raises the log filter).
    #[arg(long, global = true, env = "VOLUMECTL_DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Dump the response payload instead of rendering it.
    #[arg(short = 'R', long, global = true)]
    pub raw: bool,

    /// With --raw, dump the payload as YAML instead of JSON.
    #[arg(long, global = true)]
    pub yaml: bool,

    /// Machine-readable output: pretty-printed JSON only.
    #[arg(long, global = true, hide = true)]
    pub machine: bool,

    /// Service protocol for explicit endpoints (default: http).
    #[arg(long, global = true, hide = true, value_name = "PROTO")]
    pub api_proto: Option<String>,

    /// Service host for explicit endpoints (default: localhost).
    #[arg(long, global = true, hide = true, value_name = "HOST")]
    pub api_host: Option<String>,

    /// Service port for explicit endpoints (default: 27001).
    #[arg(long, global = true, hide = true, value_name = "PORT")]
    pub api_port: Option<u16>,

    /// Full service URL; overrides --api-proto/--api-host/--api-port.
    #[arg(long, global = true, hide = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Bearer token for the service.
    #[arg(long, global = true, hide = true, value_name = "TOKEN")]
    pub api_token: Option<String>,

    /// Basic credentials for the service.
    #[arg(short = 'u', global = true, hide = true, value_name = "USER:PASS")]
    pub credentials: Option<String>,

    /// Do not verify TLS certificates.
    #[arg(short = 'k', global = true, hide = true)]
    pub insecure: bool,

    /// Override the control-socket search directory.
    #[arg(long, global = true, hide = true, env = "VOLUMECTL_SOCKET_DIR", value_name = "DIR")]
    pub socket_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage volumes.
    #[command(subcommand)]
    #[command(disable_help_flag = true)]
    Volume(VolumeCommands),

    /// Manage storage profiles.
    #[command(subcommand)]
    #[command(disable_help_flag = true)]
    Profile(ProfileCommands),

    /// Manage backups.
    #[command(subcommand)]
    #[command(disable_help_flag = true)]
    Backup(BackupCommands),

    /// Show the client version and, when reachable, the service version.
    #[command(disable_help_flag = true)]
    Version,
}

impl Commands {
    /// Command path from the root, e.g. `["volume", "create"]`.
    #[must_use]
    pub fn path(&self) -> Vec<&'static str> {
        match self {
            Self::Volume(cmd) => vec!["volume", cmd.verb()],
            Self::Profile(cmd) => vec!["profile", cmd.verb()],
            Self::Backup(cmd) => vec!["backup", cmd.verb()],
            Self::Version => vec!["version"],
        }
    }
}

/// Options shared by every create command.
#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
    /// Volume type.
    #[arg(long = "type", value_name = "TYPE")]
    pub volume_type: Option<String>,

    /// Capacity in bytes.
    #[arg(long, value_name = "BYTES")]
    pub capacity: Option<u64>,

    /// Provisioned IOPS limit.
    #[arg(long, value_name = "IOPS")]
    pub iops: Option<u64>,

    /// Owning user.
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// Transport the volume is exposed over.
    #[arg(long, value_name = "TRANSPORT")]
    pub transport: Option<String>,

    /// Access token for the created resource.
    #[arg(long, value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Restore content from a backup reference (OBJECT/LABEL).
    #[arg(long, value_name = "OBJECT/LABEL")]
    pub from_backup: Option<String>,

    /// Name of the resource to create.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Storage profile to apply.
    #[arg(long, value_name = "PROFILE")]
    pub profile: Option<String>,

    /// One-time password authorizing the operation.
    #[arg(long, value_name = "OTP")]
    pub otp: Option<String>,

    /// Additional attributes as KEY=VALUE pairs.
    #[arg(value_name = "ATTR")]
    pub attrs: Vec<String>,
}

/// Volume subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum VolumeCommands {
    /// Create a new volume.
    #[command(disable_help_flag = true)]
    Create(CreateArgs),

    /// Remove a volume.
    #[command(visible_alias = "rm", disable_help_flag = true)]
    Remove {
        /// One-time password authorizing the removal.
        #[arg(long, value_name = "OTP")]
        otp: Option<String>,

        /// Volume name.
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Show one volume in detail.
    #[command(disable_help_flag = true)]
    Inspect {
        /// Volume name.
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// List volumes.
    #[command(visible_alias = "ls", disable_help_flag = true)]
    List,

    /// Back up a volume.
    #[command(disable_help_flag = true)]
    Backup {
        /// Volume to back up.
        #[arg(value_name = "NAME")]
        name: Option<String>,

        /// Label for the new backup.
        #[arg(value_name = "BACKUP-NAME")]
        backup_name: Option<String>,

        /// S3 target for the backup.
        #[arg(long, value_name = "S3")]
        s3: Option<String>,
    },
}

impl VolumeCommands {
    /// Verb name as typed on the command line.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Remove { .. } => "remove",
            Self::Inspect { .. } => "inspect",
            Self::List => "list",
            Self::Backup { .. } => "backup",
        }
    }
}

/// Storage profile subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommands {
    /// Create a new storage profile.
    #[command(disable_help_flag = true)]
    Create(CreateArgs),

    /// Remove a storage profile.
    #[command(visible_alias = "rm", disable_help_flag = true)]
    Remove {
        /// Profile name.
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Show one storage profile in detail.
    #[command(disable_help_flag = true)]
    Inspect {
        /// Profile name.
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// List storage profiles.
    #[command(visible_alias = "ls", disable_help_flag = true)]
    List,
}

impl ProfileCommands {
    /// Verb name as typed on the command line.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Remove { .. } => "remove",
            Self::Inspect { .. } => "inspect",
            Self::List => "list",
        }
    }
}

/// Backup subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum BackupCommands {
    /// List backups.
    #[command(visible_alias = "ls", disable_help_flag = true)]
    List {
        /// Restrict to backups made under a profile.
        #[arg(long, value_name = "PROFILE")]
        profile: Option<String>,
    },

    /// Show one backup in detail.
    #[command(disable_help_flag = true)]
    Inspect {
        /// Restrict to backups made under a profile.
        #[arg(long, value_name = "PROFILE")]
        profile: Option<String>,

        /// Backup name.
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Remove a backup.
    #[command(visible_alias = "rm", disable_help_flag = true)]
    Remove {
        /// Restrict to backups made under a profile.
        #[arg(long, value_name = "PROFILE")]
        profile: Option<String>,

        /// Backup name.
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Show backup storage information.
    #[command(disable_help_flag = true)]
    Info {
        /// Restrict to backups made under a profile.
        #[arg(long, value_name = "PROFILE")]
        profile: Option<String>,
    },
}

impl BackupCommands {
    /// Verb name as typed on the command line.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Inspect { .. } => "inspect",
            Self::Remove { .. } => "remove",
            Self::Info { .. } => "info",
        }
    }
}

/// Render the usage text for the node at `path` (empty path: the root).
///
/// Hidden options are revealed when `verbose` is set.
#[must_use]
pub fn render_usage(path: &[&str], verbose: bool) -> String {
    let mut cmd = Cli::command();
    if verbose {
        let ids: Vec<clap::Id> = cmd.get_arguments().map(|arg| arg.get_id().clone()).collect();
        for id in ids {
            cmd = cmd.mut_arg(id, |arg| arg.hide(false));
        }
    }
    cmd.build();

    let mut node = &cmd;
    for name in path {
        match node.find_subcommand(name) {
            Some(sub) => node = sub,
            None => break,
        }
    }
    node.clone().render_long_help().to_string()
}
