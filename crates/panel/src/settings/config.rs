use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use insight_chat_api::ChatApiConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const SETTINGS_DIRECTORY_NAME: &str = "insight";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const PREFERENCES_FILE_NAME: &str = "preferences.json";
pub const ENV_PREFIX: &str = "INSIGHT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Where the layout preference file lives; defaults next to the settings file.
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            preferences_path: None,
        }
    }
}

impl PanelSettings {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".insight"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn load() -> Self {
        Self::load_from(&Self::default_config_path())
    }

    /// Defaults, then the JSON file (if present), then `INSIGHT_*` environment variables.
    pub fn load_from(path: &Path) -> Self {
        Self::from_figment(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Json::file(path))
                .merge(Env::prefixed(ENV_PREFIX)),
            path,
        )
    }

    fn from_figment(figment: Figment, path: &Path) -> Self {
        match figment.extract::<PanelSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.api_base_url = match self.api_base_url.trim().trim_end_matches('/') {
            "" => default_api_base_url(),
            trimmed => trimmed.to_string(),
        };
        self.api_token = self
            .api_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .unwrap_or_else(|| Self::default_config_dir().join(PREFERENCES_FILE_NAME))
    }

    pub fn to_api_config(&self) -> ChatApiConfig {
        let config = ChatApiConfig::new(&self.api_base_url)
            .with_request_timeout(self.request_timeout());
        match &self.api_token {
            Some(token) => config.with_bearer_token(token),
            None => config,
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = PanelSettings::from_figment(
            Figment::from(Serialized::defaults(PanelSettings::default()))
                .merge(Json::file(dir.path().join("absent.json"))),
            &dir.path().join("absent.json"),
        );
        assert_eq!(settings, PanelSettings::default());
    }

    #[test]
    fn file_values_are_merged_and_normalized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(
            &path,
            r#"{"api_base_url": " https://reports.example.com/api/ ", "api_token": "  ", "request_timeout_secs": 0}"#,
        )
        .expect("write fixture");

        let settings = PanelSettings::from_figment(
            Figment::from(Serialized::defaults(PanelSettings::default())).merge(Json::file(&path)),
            &path,
        );

        assert_eq!(settings.api_base_url, "https://reports.example.com/api");
        assert_eq!(settings.api_token, None);
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_types_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, r#"{"request_timeout_secs": "soon"}"#).expect("write fixture");

        let settings = PanelSettings::from_figment(
            Figment::from(Serialized::defaults(PanelSettings::default())).merge(Json::file(&path)),
            &path,
        );
        assert_eq!(settings, PanelSettings::default());
    }

    #[test]
    fn api_config_carries_token_and_timeout() {
        let settings = PanelSettings {
            api_token: Some("t0k".to_string()),
            request_timeout_secs: 5,
            ..PanelSettings::default()
        };

        let config = settings.to_api_config();
        assert_eq!(config.bearer_token.as_deref(), Some("t0k"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.base_url, DEFAULT_API_BASE_URL);
    }
}
