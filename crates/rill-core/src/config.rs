//! Runtime and dev server configuration.
//!
//! `ServerConfig` is read from `rill.config.json` in the project root:
//!
//! ```json
//! {
//!   "port": 9090,
//!   "host": "localhost",
//!   "index": "index.html",
//!   "modules_dir": "node_modules",
//!   "component_extensions": ["vue", "component"],
//!   "script_extensions": ["js", "mjs"],
//!   "request_timeout_ms": 30000
//! }
//! ```
//!
//! Every key is optional; missing keys take the defaults above.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the project root.
pub const CONFIG_FILE: &str = "rill.config.json";

/// Runtime configuration for the rill CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// Dev server options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Host to bind to.
    pub host: String,
    /// Document served for `/`.
    pub index: String,
    /// Directory (relative to the root) holding installed packages.
    pub modules_dir: String,
    /// Extensions treated as component documents.
    pub component_extensions: Vec<String>,
    /// Extensions served as rewritten ES modules.
    pub script_extensions: Vec<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9090,
            host: "localhost".to_string(),
            index: "index.html".to_string(),
            modules_dir: "node_modules".to_string(),
            component_extensions: vec!["vue".to_string(), "component".to_string()],
            script_extensions: vec!["js".to_string(), "mjs".to_string()],
            request_timeout_ms: 30_000,
        }
    }
}

impl ServerConfig {
    /// Whether `ext` (without the dot) names a component document.
    #[must_use]
    pub fn is_component_ext(&self, ext: &str) -> bool {
        self.component_extensions.iter().any(|e| e == ext)
    }

    /// Whether `ext` (without the dot) names a script served through the rewriter.
    #[must_use]
    pub fn is_script_ext(&self, ext: &str) -> bool {
        self.script_extensions.iter().any(|e| e == ext)
    }
}

/// Load the server config for `root`.
///
/// If `config_path` is `Some`, that file must exist. Otherwise `rill.config.json`
/// is looked up in `root` and `Ok(None)` is returned when absent.
pub fn load_server_config(
    root: &Path,
    config_path: Option<&Path>,
) -> Result<Option<(PathBuf, ServerConfig)>> {
    let path = match config_path {
        Some(p) => {
            let abs = if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            };
            if !abs.exists() {
                return Err(Error::NotFound { path: abs });
            }
            abs
        }
        None => {
            let candidate = root.join(CONFIG_FILE);
            if !candidate.exists() {
                return Ok(None);
            }
            candidate
        }
    };

    let raw = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
        path: path.clone(),
        source,
    })?;
    let config = serde_json::from_str(&raw).map_err(|source| Error::ConfigParse {
        path: path.clone(),
        source,
    })?;

    Ok(Some((path, config)))
}
