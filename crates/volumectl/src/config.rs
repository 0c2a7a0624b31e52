//! Resolved global configuration.
//!
//! [`GlobalConfig`] is built once from the parsed [`Cli`] and shared by
//! reference with the transport and the output formatter. It is immutable
//! after resolution.

use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::Error;

/// Default protocol for explicit endpoints.
pub const DEFAULT_PROTO: &str = "http";

/// Default host for explicit endpoints.
pub const DEFAULT_HOST: &str = "localhost";

/// Default port for explicit endpoints.
pub const DEFAULT_PORT: u16 = 27001;

/// How the response payload is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Per-resource human-readable rendering.
    Human,
    /// Pretty-printed JSON, parser-stable.
    Machine,
    /// Generic JSON dump, skipping human rendering.
    Raw,
    /// Generic YAML dump, skipping human rendering.
    Yaml,
}

/// Where the service is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Discover a control socket under the well-known directory patterns.
    Local {
        /// Search-directory override, when set.
        socket_dir: Option<PathBuf>,
    },
    /// Explicit URL, used verbatim.
    Url(String),
    /// Explicit protocol/host/port.
    HostPort {
        /// `http` or `https`.
        proto: String,
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
    },
}

impl Endpoint {
    /// Base URL for TCP endpoints; `None` for the local socket.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        match self {
            Self::Local { .. } => None,
            Self::Url(url) => Some(url.trim_end_matches('/').to_string()),
            Self::HostPort { proto, host, port } => Some(format!("{proto}://{host}:{port}")),
        }
    }
}

/// Authentication for the service, at most one mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// No authentication header.
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// `Authorization: Basic <user:password>`.
    Basic {
        /// User name.
        user: String,
        /// Password.
        password: String,
    },
}

/// Resolved values of the inherited global options.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Verbose rendering (implied by `debug`).
    pub verbose: bool,
    /// Debug mode.
    pub debug: bool,
    /// Render mode for the payload.
    pub render: RenderMode,
    /// Effective endpoint.
    pub endpoint: Endpoint,
    /// Effective authentication.
    pub auth: Auth,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Client version string, honoring the `VOLUMECTL_VERSION` override.
    pub version: String,
}

impl GlobalConfig {
    /// Resolve the configuration from parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns a usage error when `-u` is not of the form `USER:PASS`.
    pub fn from_cli(cli: &Cli) -> Result<Self, Error> {
        let auth = if let Some(token) = &cli.api_token {
            Auth::Bearer(token.clone())
        } else if let Some(credentials) = &cli.credentials {
            let (user, password) = credentials
                .split_once(':')
                .ok_or_else(|| Error::usage("-u", "expected USER:PASS"))?;
            Auth::Basic {
                user: user.to_string(),
                password: password.to_string(),
            }
        } else {
            Auth::None
        };

        let endpoint = if let Some(url) = &cli.api_url {
            Endpoint::Url(url.trim_end_matches('/').to_string())
        } else if cli.api_proto.is_some() || cli.api_host.is_some() || cli.api_port.is_some() {
            Endpoint::HostPort {
                proto: cli.api_proto.clone().unwrap_or_else(|| DEFAULT_PROTO.to_string()),
                host: cli.api_host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: cli.api_port.unwrap_or(DEFAULT_PORT),
            }
        } else {
            Endpoint::Local {
                socket_dir: cli.socket_dir.clone(),
            }
        };

        let render = if cli.machine {
            RenderMode::Machine
        } else if cli.yaml {
            RenderMode::Yaml
        } else if cli.raw {
            RenderMode::Raw
        } else {
            RenderMode::Human
        };

        let version = std::env::var("VOLUMECTL_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        Ok(Self {
            verbose: cli.verbose || cli.debug,
            debug: cli.debug,
            render,
            endpoint,
            auth,
            insecure: cli.insecure,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config_for(argv: &[&str]) -> GlobalConfig {
        GlobalConfig::from_cli(&Cli::parse_from(argv)).expect("config")
    }

    #[test]
    fn defaults_to_local_discovery_and_human_rendering() {
        let config = config_for(&["volumectl", "volume", "list"]);
        assert!(matches!(config.endpoint, Endpoint::Local { socket_dir: None }));
        assert_eq!(config.render, RenderMode::Human);
        assert_eq!(config.auth, Auth::None);
        assert!(!config.insecure);
    }

    #[test]
    fn explicit_url_wins_over_host_and_port() {
        let config = config_for(&[
            "volumectl", "--api-url", "https://store:8443/", "--api-host", "other",
            "volume", "list",
        ]);
        assert_eq!(config.endpoint.base_url().as_deref(), Some("https://store:8443"));
    }

    #[test]
    fn partial_host_port_fills_defaults() {
        let config = config_for(&["volumectl", "--api-host", "store", "volume", "list"]);
        assert_eq!(
            config.endpoint,
            Endpoint::HostPort {
                proto: "http".into(),
                host: "store".into(),
                port: 27001,
            }
        );
        assert_eq!(config.endpoint.base_url().as_deref(), Some("http://store:27001"));
    }

    #[test]
    fn bearer_token_wins_over_basic_credentials() {
        let config = config_for(&[
            "volumectl", "--api-token", "tok", "-u", "op:secret", "volume", "list",
        ]);
        assert_eq!(config.auth, Auth::Bearer("tok".into()));
    }

    #[test]
    fn basic_credentials_split_on_first_colon() {
        let config = config_for(&["volumectl", "-u", "op:se:cret", "volume", "list"]);
        assert_eq!(
            config.auth,
            Auth::Basic {
                user: "op".into(),
                password: "se:cret".into(),
            }
        );
    }

    #[test]
    fn malformed_credentials_are_a_usage_error() {
        let cli = Cli::parse_from(["volumectl", "-u", "nopass", "volume", "list"]);
        let err = GlobalConfig::from_cli(&cli).expect_err("should fail");
        assert!(err.to_string().contains("-u"));
    }

    #[test]
    fn machine_mode_wins_over_raw_and_yaml() {
        let config = config_for(&["volumectl", "--machine", "--raw", "--yaml", "volume", "list"]);
        assert_eq!(config.render, RenderMode::Machine);
    }

    #[test]
    fn yaml_implies_raw_dumping() {
        let config = config_for(&["volumectl", "--yaml", "volume", "list"]);
        assert_eq!(config.render, RenderMode::Yaml);
    }

    #[test]
    fn debug_implies_verbose() {
        let config = config_for(&["volumectl", "--debug", "volume", "list"]);
        assert!(config.verbose);
        assert!(config.debug);
    }
}
