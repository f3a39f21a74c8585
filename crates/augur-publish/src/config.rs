//! Credentials and the `~/.augur/config.toml` file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{value, DocumentMut, Item, Table};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.structurizr.com";

pub const ENV_WORKSPACE_ID: &str = "AUGUR_WORKSPACE_ID";
pub const ENV_API_KEY: &str = "AUGUR_API_KEY";
pub const ENV_API_SECRET: &str = "AUGUR_API_SECRET";
pub const ENV_API_URL: &str = "AUGUR_API_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml_edit::TomlError),

    #[error("missing {0}; set it in the config file or the environment")]
    Missing(&'static str),

    #[error("invalid value for {field}: '{value}'")]
    Invalid { field: &'static str, value: String },
}

/// What the service needs to accept a workspace.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub workspace_id: u64,
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(workspace_id: u64, api_key: &str, api_secret: &str) -> Self {
        Credentials {
            workspace_id,
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    /// Safe to log: the workspace id and the last four characters of the key.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("workspace {} (key ...{})", self.workspace_id, tail)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("workspace_id", &self.workspace_id)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub api_url: String,
}

/// `~/.augur`, falling back to the working directory without a home.
pub fn augur_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".augur")
}

pub fn default_config_path() -> PathBuf {
    augur_dir().join("config.toml")
}

impl Config {
    /// Read the config file (if there is one) and apply environment overrides.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let raw = if path.exists() {
            debug!(path = %path.display(), "reading config");
            Some(fs::read_to_string(path)?)
        } else {
            None
        };
        Config::from_sources(raw.as_deref(), |name| std::env::var(name).ok())
    }

    /// Merge a config file's text with variables looked up through `env`.
    /// Environment values win.
    pub fn from_sources(
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Config, ConfigError> {
        let doc: DocumentMut = match file {
            Some(raw) => raw.parse()?,
            None => DocumentMut::new(),
        };
        let table = doc.get("workspace");
        let file_str = |key: &str| {
            table
                .and_then(|t| t.get(key))
                .and_then(Item::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let workspace_id = match env(ENV_WORKSPACE_ID) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                field: "workspace id",
                value: raw,
            })?,
            None => match table.and_then(|t| t.get("id")).and_then(Item::as_integer) {
                Some(id) if id > 0 => id as u64,
                Some(id) => {
                    return Err(ConfigError::Invalid {
                        field: "workspace id",
                        value: id.to_string(),
                    })
                }
                None => return Err(ConfigError::Missing("workspace id")),
            },
        };
        let api_key = env(ENV_API_KEY)
            .or_else(|| file_str("api_key"))
            .ok_or(ConfigError::Missing("api key"))?;
        let api_secret = env(ENV_API_SECRET)
            .or_else(|| file_str("api_secret"))
            .ok_or(ConfigError::Missing("api secret"))?;
        let api_url = env(ENV_API_URL)
            .or_else(|| file_str("api_url"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Config {
            credentials: Credentials {
                workspace_id,
                api_key,
                api_secret,
            },
            api_url,
        })
    }
}

/// Write a `[workspace]` template to `path`, keeping everything already in
/// the file. Returns `true` when the file changed.
pub fn write_template(path: &Path) -> Result<bool, ConfigError> {
    let existing = if path.exists() {
        Some(fs::read_to_string(path)?)
    } else {
        None
    };
    let mut doc: DocumentMut = match &existing {
        Some(raw) => raw.parse()?,
        None => DocumentMut::new(),
    };

    if !doc.contains_table("workspace") {
        doc["workspace"] = Item::Table(Table::new());
    }
    let defaults = [
        ("id", value(0)),
        ("api_key", value("")),
        ("api_secret", value("")),
        ("api_url", value(DEFAULT_API_URL)),
    ];
    let mut changed = existing.is_none();
    for (key, default) in defaults {
        if doc["workspace"].get(key).is_none() {
            doc["workspace"][key] = default;
            changed = true;
        }
    }
    if !changed {
        return Ok(false);
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, doc.to_string())?;
    Ok(true)
}
