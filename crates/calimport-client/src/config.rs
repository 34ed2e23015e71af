//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calimport/config.toml` by default:
//!
//! ```toml
//! [feed]
//! url = "https://calendar.example.org/feed.ics"
//! timeout = 30
//!
//! [import]
//! cutoff = "2024-06-30"
//! uid_domain = "afosterri.org"
//!
//! [export]
//! endpoint = "https://api.example.org/graphql"
//! token = "env::CALIMPORT_TOKEN"
//! author_id = "ck9x2..."
//!
//! [locations]
//! Gym = "room-id-of-the-new-gym"
//! ```
//!
//! The export token supports secret references (see [`crate::secret`]).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use calimport_core::{Category, LocationTable};
use calimport_feed::{EventSchema, ExportConfig, FeedConfig, Pipeline};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder written instead of a plain-text token when dumping.
const REDACTED: &str = "<redacted>";

/// Configuration for the calimport client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Where the feed comes from.
    pub feed: FeedSettings,

    /// Pipeline settings.
    pub import: ImportSettings,

    /// Export endpoint settings.
    pub export: ExportSettings,

    /// Room identifier overrides, keyed by category label.
    pub locations: BTreeMap<String, String>,
}

/// Feed source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// URL of the ICS feed.
    pub url: Option<String>,

    /// Local copy of the feed, read when not fetching.
    pub cache_path: Option<PathBuf>,

    /// Fetch timeout in seconds.
    pub timeout: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: None,
            cache_path: None,
            timeout: FeedConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FeedSettings {
    /// Converts to fetch configuration.
    pub fn to_feed_config(&self) -> Result<FeedConfig, String> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| "feed url is missing from [feed] section in config.toml".to_string())?;

        FeedConfig::new(url)
            .map(|config| config.with_timeout(Duration::from_secs(self.timeout)))
            .map_err(|e| format!("invalid feed url {:?}: {}", url, e))
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Drop events ending after this date.
    pub cutoff: Option<NaiveDate>,

    /// Domain every event UID must belong to.
    pub uid_domain: String,

    /// Directory receiving the result artifacts.
    pub output_dir: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            cutoff: None,
            uid_domain: EventSchema::DEFAULT_UID_DOMAIN.to_string(),
            output_dir: None,
        }
    }
}

/// Export endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// API endpoint.
    pub endpoint: Option<String>,

    /// Bearer token (supports `pass::` and `env::` prefixes).
    pub token: Option<String>,

    /// Author recorded on created events.
    pub author_id: Option<String>,

    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            author_id: None,
            timeout: ExportConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ExportSettings {
    /// Returns true if any export setting is present.
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() || self.token.is_some() || self.author_id.is_some()
    }

    /// Converts to export configuration, resolving the token.
    pub fn to_export_config(&self) -> Result<ExportConfig, String> {
        let endpoint = self.require(&self.endpoint, "endpoint")?;
        let token = self.require(&self.token, "token")?;
        let author_id = self.require(&self.author_id, "author_id")?;

        let token = crate::secret::resolve(token)
            .map_err(|e| format!("failed to resolve export token: {}", e))?;

        ExportConfig::new(endpoint, token, author_id)
            .map(|config| config.with_timeout(Duration::from_secs(self.timeout)))
            .map_err(|e| format!("invalid export endpoint {:?}: {}", endpoint, e))
    }

    fn require<'a>(&self, value: &'a Option<String>, name: &str) -> Result<&'a str, String> {
        value
            .as_deref()
            .ok_or_else(|| format!("{} is missing from [export] section in config.toml", name))
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calimport")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calimport")
    }

    /// Returns the path of the cached feed.
    pub fn cache_path(&self) -> PathBuf {
        self.feed
            .cache_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("feed.ics"))
    }

    /// Returns the artifact directory.
    pub fn output_dir(&self) -> PathBuf {
        self.import
            .output_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Builds the location table from the defaults and `[locations]`.
    pub fn location_table(&self) -> Result<LocationTable, String> {
        let overrides = self
            .locations
            .iter()
            .map(|(label, id)| {
                label
                    .parse::<Category>()
                    .map(|category| (category, id.clone()))
                    .map_err(|e| format!("[locations]: {}", e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LocationTable::with_overrides(overrides))
    }

    /// Builds the configured pipeline.
    pub fn pipeline(&self) -> Result<Pipeline, String> {
        let schema = EventSchema::new(&self.import.uid_domain)
            .map_err(|e| format!("invalid uid_domain {:?}: {}", self.import.uid_domain, e))?;
        Ok(Pipeline::new(schema, self.location_table()?))
    }

    /// Returns a copy safe to print: plain-text tokens are masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        let plain = config
            .export
            .token
            .as_deref()
            .is_some_and(|token| !crate::secret::is_reference(token));
        if plain {
            config.export.token = Some(REDACTED.to_string());
        }
        config
    }
}
