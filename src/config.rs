use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROD_BASE_URL: &str = "https://api.runloop.ai";
pub const DEV_BASE_URL: &str = "https://api.runloop.pro";

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClientConfig {
    pub source: Option<String>,
    pub api_key: Option<String>,
    pub base_url: String,
    pub refresh_ms: Option<u64>,
    pub poll_ms: Option<u64>,
    pub max_page_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default, alias = "token")]
    api_key: Option<String>,
    #[serde(default, alias = "env")]
    environment: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default, alias = "refresh")]
    refresh_ms: Option<u64>,
    #[serde(default, alias = "poll")]
    poll_ms: Option<u64>,
    #[serde(default)]
    max_page_size: Option<usize>,
}

/// Environment variables that override the file.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub environment: Option<String>,
}

impl EnvOverrides {
    pub fn from_process() -> Self {
        Self {
            api_key: non_empty_var("RUNLOOP_API_KEY"),
            environment: non_empty_var("RUNLOOP_ENV"),
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self> {
        let path = discover_config_path();
        Self::load_from(path.as_deref(), &EnvOverrides::from_process())
    }

    pub fn load_from(path: Option<&Path>, env: &EnvOverrides) -> Result<Self> {
        let (source, file) = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                let parsed: ConfigFile = serde_yaml::from_str(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?;
                (Some(path.display().to_string()), parsed)
            }
            None => (None, ConfigFile::default()),
        };

        let environment = env.environment.clone().or(file.environment);
        let base_url = file
            .base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| base_url_for(environment.as_deref()).to_string());

        Ok(Self {
            source,
            api_key: env
                .api_key
                .clone()
                .or(file.api_key)
                .filter(|key| !key.trim().is_empty()),
            base_url,
            refresh_ms: file.refresh_ms,
            poll_ms: file.poll_ms,
            max_page_size: file.max_page_size.filter(|size| *size > 0),
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .context("RUNLOOP_API_KEY must be set in the environment or config file")
    }
}

pub fn base_url_for(environment: Option<&str>) -> &'static str {
    match environment {
        Some(env) if env.eq_ignore_ascii_case("dev") => DEV_BASE_URL,
        _ => PROD_BASE_URL,
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn discover_config_path() -> Option<PathBuf> {
    if let Some(path) = non_empty_var("RUNLOOP_CONFIG") {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("runloop.yaml"),
        PathBuf::from("runloop.yml"),
        PathBuf::from(".runloop.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Some(home) = non_empty_var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/runloop/config.yaml"),
            PathBuf::from(&home).join(".config/runloop/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{ClientConfig, DEV_BASE_URL, EnvOverrides, PROD_BASE_URL};
    use std::fs;

    #[test]
    fn defaults_to_prod_without_file() {
        let config = ClientConfig::load_from(None, &EnvOverrides::default()).expect("config");
        assert_eq!(config.base_url, PROD_BASE_URL);
        assert!(config.api_key.is_none());
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("runloop.yaml");
        fs::write(
            &path,
            "api_key: from-file\nenvironment: prod\nrefresh_ms: 3000\nmax_page_size: 0\n",
        )
        .expect("write config");

        let env = EnvOverrides {
            api_key: Some("from-env".to_string()),
            environment: Some("DEV".to_string()),
        };
        let config = ClientConfig::load_from(Some(&path), &env).expect("config");
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.base_url, DEV_BASE_URL);
        assert_eq!(config.refresh_ms, Some(3000));
        assert_eq!(config.max_page_size, None);
        assert!(config.source.is_some());
    }

    #[test]
    fn explicit_base_url_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("runloop.yaml");
        fs::write(&path, "token: abc\nbase_url: http://localhost:8080\npoll: 750\n")
            .expect("write config");

        let config =
            ClientConfig::load_from(Some(&path), &EnvOverrides::default()).expect("config");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.require_api_key().ok(), Some("abc"));
        assert_eq!(config.poll_ms, Some(750));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("runloop.yaml");
        fs::write(&path, "refresh_ms: [nope").expect("write config");
        assert!(ClientConfig::load_from(Some(&path), &EnvOverrides::default()).is_err());
    }
}
