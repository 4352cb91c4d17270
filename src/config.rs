//! Configuration handling for the ledger.
//!
//! Settings come from an optional `$LEDGER_HOME/config.json` and from environment variables, which
//! take precedence. Everything is resolved once, in `Config::load`, and the result is passed to the
//! components that need it.

use crate::model::Participants;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const APP_NAME: &str = "couple-ledger";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const TRANSACTIONS_JSON: &str = "transactions.json";

/// How long a facade read stays fresh.
pub const READ_CACHE_TTL: Duration = Duration::from_secs(60);

/// How long a dataset stays cached under one version marker.
pub const VERSION_CACHE_TTL: Duration = Duration::from_secs(3600);

pub const USE_GOOGLE_SHEETS_VAR: &str = "USE_GOOGLE_SHEETS";
pub const SHEET_ID_VAR: &str = "GOOGLE_SHEET_ID";
pub const CLIENT_EMAIL_VAR: &str = "GOOGLE_CLIENT_EMAIL";
pub const PRIVATE_KEY_VAR: &str = "GOOGLE_PRIVATE_KEY";
pub const USER1_LABEL_VAR: &str = "USER1_LABEL";
pub const USER2_LABEL_VAR: &str = "USER2_LABEL";

/// Where transactions live.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    /// The Google sheet is the source of truth.
    Remote,
    /// A JSON file in the ledger home directory.
    #[default]
    Local,
}

serde_plain::derive_display_from_serialize!(StoreMode);
serde_plain::derive_fromstr_from_deserialize!(StoreMode);

/// What is needed to reach the spreadsheet as a service account.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    spreadsheet_id: String,
    client_email: String,
    private_key: String,
}

impl Credentials {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        client_email: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            client_email: client_email.into(),
            private_key: private_key.into(),
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub(crate) fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// The `Config` object represents the resolved configuration of the app. You instantiate it by
/// providing the path to `$LEDGER_HOME`; from there it loads `$LEDGER_HOME/config.json` if it
/// exists and applies environment overrides.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    store_mode: StoreMode,
    credentials: Option<Credentials>,
    participants: Participants,
    read_ttl: Duration,
    version_ttl: Duration,
}

impl Config {
    /// Creates the home directory and writes an initial `config.json`, then loads it.
    pub async fn create(dir: impl Into<PathBuf>, init: ConfigInit) -> Result<Self> {
        let root = dir.into();
        utils::make_dir(&root)
            .await
            .context("Unable to create the ledger home directory")?;
        let config_path = root.join(CONFIG_JSON);
        if utils::is_file(&config_path).await {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            );
        }
        if let Some(url) = &init.sheet_url {
            to_spreadsheet_id(url).context("Failed to extract spreadsheet ID from sheet URL")?;
        }
        let config_file = ConfigFile {
            use_google_sheets: init.remote,
            sheet_url: init.sheet_url,
            client_email: init.client_email,
            service_account_key: init.service_account_key,
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;
        Self::load(root).await
    }

    /// Loads `config.json` (when present) and applies overrides from the process environment.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with(home, |name| std::env::var(name).ok()).await
    }

    /// Like `load` but reads overrides through `env`, so callers can supply them without touching
    /// the process environment.
    pub async fn load_with<F>(home: impl Into<PathBuf>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String> + Send + Sync,
    {
        let root = home.into();
        let config_path = root.join(CONFIG_JSON);
        let config_file = if utils::is_file(&config_path).await {
            ConfigFile::load(&config_path).await?
        } else {
            debug!("No config file at {}, using defaults", config_path.display());
            ConfigFile::default()
        };
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let use_google_sheets = match var(USE_GOOGLE_SHEETS_VAR) {
            Some(v) => parse_flag(&v),
            None => config_file.use_google_sheets,
        };
        let store_mode = if use_google_sheets {
            StoreMode::Remote
        } else {
            StoreMode::Local
        };

        let key_file = match config_file.service_account_key.as_ref() {
            Some(p) => Some(ServiceAccountKey::load(&utils::resolve(&root, p)).await?),
            None => None,
        };

        let spreadsheet_id = match var(SHEET_ID_VAR).or_else(|| config_file.sheet_url.clone()) {
            Some(s) => Some(
                to_spreadsheet_id(&s)
                    .context("Failed to extract spreadsheet ID from sheet URL")?
                    .to_string(),
            ),
            None => None,
        };
        let client_email = var(CLIENT_EMAIL_VAR)
            .or_else(|| key_file.as_ref().map(|k| k.client_email.clone()))
            .or_else(|| config_file.client_email.clone());
        let private_key = var(PRIVATE_KEY_VAR)
            .map(|k| unescape_newlines(&k))
            .or_else(|| key_file.as_ref().map(|k| k.private_key.clone()));

        let credentials = match (spreadsheet_id, client_email, private_key) {
            (Some(id), Some(email), Some(key)) if !id.is_empty() => {
                Some(Credentials::new(id, email, key))
            }
            _ => None,
        };

        let participants = Participants::new(
            var(USER1_LABEL_VAR)
                .or_else(|| config_file.user1_label.clone())
                .unwrap_or_default(),
            var(USER2_LABEL_VAR)
                .or_else(|| config_file.user2_label.clone())
                .unwrap_or_default(),
        );

        Ok(Self {
            root,
            config_path,
            config_file,
            store_mode,
            credentials,
            participants,
            read_ttl: READ_CACHE_TTL,
            version_ttl: VERSION_CACHE_TTL,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn store_mode(&self) -> StoreMode {
        self.store_mode
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    pub fn sheet_url(&self) -> Option<&str> {
        self.config_file.sheet_url.as_deref()
    }

    /// The JSON file used by local mode.
    pub fn local_store_path(&self) -> PathBuf {
        self.root.join(TRANSACTIONS_JSON)
    }

    pub fn read_ttl(&self) -> Duration {
        self.read_ttl
    }

    pub fn version_ttl(&self) -> Duration {
        self.version_ttl
    }
}

/// Settings written by `ledger init`.
#[derive(Debug, Default, Clone)]
pub struct ConfigInit {
    pub sheet_url: Option<String>,
    pub client_email: Option<String>,
    pub service_account_key: Option<PathBuf>,
    pub remote: bool,
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "couple-ledger",
///   "config_version": 1,
///   "use_google_sheets": true,
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "service_account_key": "service_account.json",
///   "user1_label": "민수",
///   "user2_label": "지영"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "couple-ledger"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Use the Google sheet instead of the local file
    #[serde(default)]
    use_google_sheets: bool,

    /// URL (or bare id) of the Google sheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sheet_url: Option<String>,

    /// Service account email, if not taken from the key file or the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_email: Option<String>,

    /// Path to a downloaded service account key (relative to the home directory or absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_account_key: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    user1_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    user2_label: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            use_google_sheets: false,
            sheet_url: None,
            client_email: None,
            service_account_key: None,
            user1_label: None,
            user2_label: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from `path` and checks its `app_name`.
    async fn load(path: &Path) -> Result<Self> {
        let config: ConfigFile = utils::deserialize(path)
            .await
            .context("Unable to load the config file")?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    async fn save(&self, path: &Path) -> Result<()> {
        utils::serialize(path, self)
            .await
            .context("Unable to write config file")
    }
}

/// The fields of a Google service account key file that are used here.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
}

impl ServiceAccountKey {
    async fn load(path: &Path) -> Result<Self> {
        utils::deserialize(path)
            .await
            .context("Unable to load the service account key")
    }
}

/// Environment values are usually stored on one line, with newlines written as `\n`.
fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Accepts either a bare spreadsheet id or a full sheet URL.
fn to_spreadsheet_id(s: &str) -> Result<&str> {
    let s = s.trim();
    if s.contains('/') {
        extract_spreadsheet_id(s)
    } else {
        Ok(s)
    }
}

/// Extracts the spreadsheet ID from a Google Sheets URL
///
/// # Arguments
/// * `url` - The Google Sheets URL (e.g., "https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...")
///
/// # Returns
/// The spreadsheet ID or an error if the URL format is invalid.
fn extract_spreadsheet_id(url: &str) -> Result<&str> {
    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            let id_part = parts[i + 1];
            let id = id_part
                .split(['?', '#'])
                .next()
                .unwrap_or(id_part);
            if id.is_empty() {
                break;
            }
            return Ok(id);
        }
    }
    bail!(
        "Invalid Google Sheets URL format. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    )
}
