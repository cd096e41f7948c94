//! Demo configuration, loaded from RON
//!
//! ```ron
//! (
//!     socket: "/run/vpp/api.sock",
//!     connection: (
//!         client_name: "vapi-pt",
//!         max_reconnect_attempts: 3,
//!         health_check: (enabled: false),
//!     ),
//! )
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vapi_client::ConnectionConfig;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "VAPI_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtConfig {
    /// Path of the binary API socket
    ///
    /// Default: `/run/vpp/api.sock`
    #[serde(default = "defaults::socket")]
    pub socket: PathBuf,

    #[serde(default = "defaults::connection")]
    pub connection: ConnectionConfig,
}

impl Default for PtConfig {
    fn default() -> Self {
        Self {
            socket: defaults::socket(),
            connection: defaults::connection(),
        }
    }
}

impl PtConfig {
    /// Parse a RON document
    ///
    /// # Errors
    ///
    /// Returns the parse error with its position in `content`
    pub fn from_ron(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    /// Read and parse the file at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or describes an
    /// unusable connection
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config = Self::from_ron(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.connection.validate()?;
        Ok(config)
    }

    /// Load the configuration named on the command line or by
    /// [`CONFIG_ENV`], falling back to defaults when neither is given
    ///
    /// # Errors
    ///
    /// Returns an error if a named file does not exist or cannot be loaded
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match config_path(explicit, env) {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => anyhow::bail!("Config file does not exist: {}", path.display()),
            None => Ok(Self::default()),
        }
    }

    /// Replace the socket path when one was given on the command line
    #[must_use]
    pub fn with_socket(mut self, socket: Option<PathBuf>) -> Self {
        if let Some(socket) = socket {
            self.socket = socket;
        }
        self
    }
}

/// The command line wins over the environment
fn config_path(explicit: Option<&Path>, env: Option<PathBuf>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or(env)
}

mod defaults {
    use std::path::PathBuf;

    use vapi_client::{ConnectionConfig, DEFAULT_SOCKET};

    pub fn socket() -> PathBuf {
        PathBuf::from(DEFAULT_SOCKET)
    }

    pub fn connection() -> ConnectionConfig {
        ConnectionConfig {
            client_name: "vapi-pt".to_string(),
            ..ConnectionConfig::default()
        }
    }
}
