use gamesboard_api::config::FirebaseConfig;
use log::LevelFilter;
use std::str::FromStr;

pub const LOG_ENV: &str = "GAMESBOARD_LOG";

#[derive(Debug, Default, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
    pub firebase: FirebaseConfig,
}

impl AppSettings {
    /// Credentials from the config file and environment; a broken file is
    /// logged and the bundled data is used instead.
    pub fn load() -> Self {
        let firebase = FirebaseConfig::load().unwrap_or_else(|e| {
            log::warn!("{e}; using bundled data");
            FirebaseConfig::default()
        });
        Self {
            full_screen: false,
            log_level: std::env::var(LOG_ENV).ok().as_deref().and_then(parse_level),
            firebase,
        }
    }
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(value.trim()).ok()
}
