use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com";
const PLACEHOLDER_MARKER: &str = "YOUR_";
const DEFAULT_POLL_SECS: u64 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Firebase web credential bundle, same keys as the JS config object, plus a
/// few client knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: String,
    /// Firestore host, overridable for the emulator.
    pub endpoint: String,
    /// Optional Firebase Auth ID token sent as a bearer token.
    pub id_token: Option<String>,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: "YOUR_API_KEY".into(),
            auth_domain: "YOUR_AUTH_DOMAIN".into(),
            project_id: "YOUR_PROJECT_ID".into(),
            storage_bucket: "YOUR_STORAGE_BUCKET".into(),
            messaging_sender_id: "YOUR_MESSAGING_SENDER_ID".into(),
            app_id: "YOUR_APP_ID".into(),
            measurement_id: "YOUR_MEASUREMENT_ID".into(),
            endpoint: DEFAULT_ENDPOINT.into(),
            id_token: None,
            poll_interval_secs: DEFAULT_POLL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FirebaseConfig {
    /// Load with priority: env vars > config file > defaults.
    ///
    /// A missing config file is not an error; an unreadable or malformed one is.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = set("GAMESBOARD_API_KEY") {
            self.api_key = key;
        }
        if let Some(project) = set("GAMESBOARD_PROJECT_ID") {
            self.project_id = project;
        }
        if let Some(endpoint) = set("GAMESBOARD_FIRESTORE_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(token) = set("GAMESBOARD_ID_TOKEN") {
            self.id_token = Some(token);
        }
    }

    /// Remote sync is on only with a real API key and a project id.
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && !key.contains(PLACEHOLDER_MARKER) && !self.project_id.trim().is_empty()
    }

    pub fn endpoint(&self) -> &str {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() { DEFAULT_ENDPOINT } else { endpoint }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// `GAMESBOARD_FIREBASE_CONFIG`, else `$XDG_CONFIG_HOME/gamesboard/firebase.json`,
/// else `$HOME/.config/gamesboard/firebase.json`.
pub fn config_path() -> Option<PathBuf> {
    let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
    if let Some(path) = var("GAMESBOARD_FIREBASE_CONFIG") {
        return Some(PathBuf::from(path));
    }
    if let Some(config_dir) = var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(config_dir).join("gamesboard").join("firebase.json"));
    }
    var("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("gamesboard")
            .join("firebase.json")
    })
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
