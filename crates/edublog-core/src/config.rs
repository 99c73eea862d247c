//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. edublog.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Error;

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the blog backend (including the `/api` prefix)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Delay between clearing the stored session at startup and
    /// reporting `Unauthenticated` (matches the splash screen)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Path to the SQLite credential store
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            store_path: default_store_path(),
        }
    }
}

impl SessionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// No settling delay (tests and headless tools)
    pub fn immediate() -> Self {
        Self {
            settle_delay_ms: 0,
            ..Self::default()
        }
    }
}

fn default_base_url() -> String {
    "https://backend-techchalenge.vercel.app/api".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_settle_delay_ms() -> u64 {
    1_500
}

fn default_store_path() -> String {
    "data/edublog.db".to_string()
}

/// Main configuration for edublog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// TOML file layout; every key is optional
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    api: Option<TomlApiConfig>,
    session: Option<TomlSessionConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlApiConfig {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlSessionConfig {
    settle_delay_ms: Option<u64>,
    store_path: Option<String>,
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;

        // 環境変数が優先
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Parse TOML text (after `${VAR}` expansion) without env overrides
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Ok(Self::from_toml_config(toml))
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./edublog.toml` があればそれを使い、なければ環境変数のみ。
    pub fn load() -> crate::Result<Self> {
        if Path::new("edublog.toml").exists() {
            return Self::from_toml_file("edublog.toml");
        }

        Ok(Self::from_env())
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let api = toml.api.unwrap_or_default();
        let session = toml.session.unwrap_or_default();

        Config {
            api: ApiConfig {
                base_url: api.base_url.unwrap_or_else(default_base_url),
                timeout_ms: api.timeout_ms.unwrap_or_else(default_timeout_ms),
            },
            session: SessionConfig {
                settle_delay_ms: session
                    .settle_delay_ms
                    .unwrap_or_else(default_settle_delay_ms),
                store_path: session.store_path.unwrap_or_else(default_store_path),
            },
        }
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("EDUBLOG_API_BASE_URL") {
            if !url.is_empty() {
                self.api.base_url = url;
            }
        }
        if let Ok(timeout) = std::env::var("EDUBLOG_API_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.api.timeout_ms = ms;
            }
        }
        if let Ok(delay) = std::env::var("EDUBLOG_SETTLE_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                self.session.settle_delay_ms = ms;
            }
        }
        if let Ok(path) = std::env::var("EDUBLOG_STORE_PATH") {
            if !path.is_empty() {
                self.session.store_path = path;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.api.base_url,
            "https://backend-techchalenge.vercel.app/api"
        );
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(config.session.settle_delay(), Duration::from_millis(1500));
        assert_eq!(config.session.store_path, "data/edublog.db");
    }

    #[test]
    fn test_immediate_session_config() {
        let session = SessionConfig::immediate();
        assert_eq!(session.settle_delay(), Duration::ZERO);
        assert_eq!(session.store_path, default_store_path());
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("EDUBLOG_TEST_HOST", "localhost:4000");
        }
        let result = Config::expand_env_vars("http://${EDUBLOG_TEST_HOST}/api");
        assert_eq!(result, "http://localhost:4000/api");
        unsafe {
            std::env::remove_var("EDUBLOG_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_and_empty() {
        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("${}_content"), "_content");
        assert_eq!(
            Config::expand_env_vars("a${EDUBLOG_SURELY_UNSET_VAR}b"),
            "ab"
        );
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[api]
base_url = "http://127.0.0.1:3000/api"
timeout_ms = 2500

[session]
settle_delay_ms = 0
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:3000/api");
        assert_eq!(config.api.timeout_ms, 2500);
        assert_eq!(config.session.settle_delay_ms, 0);
        // 未指定のキーはデフォルト値
        assert_eq!(config.session.store_path, "data/edublog.db");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[api\nbase_url = 1").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
