use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::apiai::DEFAULT_BASE_URL;

pub const DEFAULT_CONFIG_PATH: &str = "config/toura.json";
pub const TOKEN_ENV_VAR: &str = "TOURA_ACCESS_TOKEN";

pub const DEFAULT_GREETING: &str = "Hi There, Welcome To The land of deserts, I am Toura, I am here to help you, To Start tell me where you want to go to ?";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub access_token: String,
    pub api_base_url: String,
    /// Language sent with every query.
    pub language: String,
    /// BCP-47 tag handed to the speaker.
    pub speech_language: String,
    /// External TTS program and arguments; `{lang}` is replaced with the
    /// speech language. Empty means replies are only logged.
    pub speech_command: Vec<String>,
    pub greeting: String,
    pub reply_timeout_secs: u64,
    pub image_max_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            language: "en".to_string(),
            speech_language: "en-AU".to_string(),
            speech_command: Vec::new(),
            greeting: DEFAULT_GREETING.to_string(),
            reply_timeout_secs: 30,
            image_max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs.max(1))
    }

    /// Token precedence: explicit flag, then environment, then file.
    pub fn apply_token_overrides(&mut self, flag: Option<String>, env: Option<String>) {
        if let Some(token) = flag.or(env).filter(|token| !token.trim().is_empty()) {
            self.access_token = token;
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|err| {
            log::warn!("Failed to parse config file {}: {err}", path.display());
            AppConfig::default()
        }),
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

fn parse_config(content: &str) -> serde_json::Result<AppConfig> {
    serde_json::from_str::<AppConfig>(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let config = parse_config(r#"{ "access_token": "abc", "reply_timeout_secs": 5 }"#).unwrap();

        assert_eq!(config.access_token, "abc");
        assert_eq!(config.reply_timeout(), Duration::from_secs(5));
        assert_eq!(config.speech_language, "en-AU");
        assert_eq!(config.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn malformed_or_missing_file_falls_back_to_defaults() {
        assert!(parse_config("{ not json").is_err());
        assert_eq!(
            load_config("config/definitely-missing-toura.json"),
            AppConfig::default()
        );
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let config = AppConfig {
            reply_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.reply_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn flag_beats_environment_beats_file() {
        let mut config = AppConfig {
            access_token: "from-file".to_string(),
            ..AppConfig::default()
        };

        config.apply_token_overrides(None, Some("from-env".to_string()));
        assert_eq!(config.access_token, "from-env");

        config.apply_token_overrides(Some("from-flag".to_string()), Some("from-env".to_string()));
        assert_eq!(config.access_token, "from-flag");

        config.apply_token_overrides(Some(" ".to_string()), None);
        assert_eq!(config.access_token, "from-flag");
    }
}
