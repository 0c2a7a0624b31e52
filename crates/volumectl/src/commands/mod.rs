//! Command executors.
//!
//! Each submodule implements one verb group:
//! - [`volume`] - volume management
//! - [`profile`] - storage profile management
//! - [`backup`] - backup management
//! - [`version`] - client/service version
//!
//! Executors validate their declared required fields, assemble the parameter
//! map, invoke one resource-client operation, and hand the payload to the
//! formatter. Every failure is wrapped with the resolved command context
//! before it propagates.

pub mod backup;
pub mod profile;
pub mod version;
pub mod volume;

pub use backup::BackupCommand;
pub use profile::ProfileCommand;
pub use version::VersionCommand;
pub use volume::VolumeCommand;

use crate::cli::CreateArgs;
use crate::error::{CommandContext, Error};
use crate::params::ParamMap;

/// Resolve a required option or positional parameter.
pub(crate) fn require<'v>(value: Option<&'v str>, field: &str) -> Result<&'v str, Error> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::missing(field))
}

/// Assemble the parameter map for a create command.
///
/// The map is recorded on the context before required-field validation so a
/// validation failure still exposes everything resolved up to that point.
pub(crate) fn build_create_params(
    args: &CreateArgs,
    context: &mut CommandContext,
) -> Result<ParamMap, Error> {
    let mut params = ParamMap::new();
    params.insert_opt("type", args.volume_type.as_deref());
    params.insert_opt("capacity", args.capacity);
    params.insert_opt("iops", args.iops);
    params.insert_opt("user", args.user.as_deref());
    params.insert_opt("transport", args.transport.as_deref());
    params.insert_opt("access_token", args.access_token.as_deref());
    if let Some(reference) = &args.from_backup {
        params.insert_backup_ref(reference);
    }
    params.insert_opt("name", args.name.as_deref());
    params.insert_opt("profile", args.profile.as_deref());
    params.insert_opt("otp", args.otp.as_deref());
    params.extend_attrs(&args.attrs)?;
    context.record(&params);

    require(args.name.as_deref(), "--name")?;
    require(args.volume_type.as_deref(), "--type")?;
    if args.capacity.is_none() {
        return Err(Error::missing("--capacity"));
    }
    Ok(params)
}
