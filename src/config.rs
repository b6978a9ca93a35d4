use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ApolloError;

pub const CONFIG_FILE_NAME: &str = "apolloConfig.yaml";
pub const PASSWORD_ENV: &str = "ApolloPass";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_EXPORT_PATH: &str = "/IOService/write";
const DEFAULT_SEQUENCE_PATH: &str = "/sequence/sequenceByName";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub base_url: String,
    pub user: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub export_path: Option<String>,
    #[serde(default)]
    pub sequence_path: Option<String>,
}

/// Everything needed to talk to one Apollo server.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub base_url: String,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
    pub export_path: String,
    pub sequence_path: String,
}

impl ConnectionConfig {
    pub fn export_url(&self) -> String {
        format!("{}{}", self.base_url, self.export_path)
    }

    pub fn sequence_url(&self) -> String {
        format!("{}{}", self.base_url, self.sequence_path)
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("export_path", &self.export_path)
            .field("sequence_path", &self.sequence_path)
            .finish()
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ConnectionConfig, ApolloError> {
        let config_path = Self::locate(path)?;
        let password = std::env::var(PASSWORD_ENV).ok();
        Self::resolve_file(&config_path, password)
    }

    pub fn locate(path: Option<&str>) -> Result<PathBuf, ApolloError> {
        if let Some(path) = path {
            return Ok(PathBuf::from(path));
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(local);
        }
        ProjectDirs::from("", "", "apollo-pep")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|candidate| candidate.exists())
            .ok_or(ApolloError::MissingConfig)
    }

    pub fn resolve_file(
        path: &Path,
        password: Option<String>,
    ) -> Result<ConnectionConfig, ApolloError> {
        let content =
            fs::read_to_string(path).map_err(|_| ApolloError::ConfigRead(path.to_path_buf()))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|err| ApolloError::ConfigParse(err.to_string()))?;
        Self::resolve_config(config, password)
    }

    pub fn resolve_config(
        config: Config,
        password: Option<String>,
    ) -> Result<ConnectionConfig, ApolloError> {
        let password = password
            .filter(|value| !value.trim().is_empty())
            .ok_or(ApolloError::MissingPassword)?;

        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApolloError::InvalidConfig("base_url is empty".to_string()));
        }
        let user = config.user.trim().to_string();
        if user.is_empty() {
            return Err(ApolloError::InvalidConfig("user is empty".to_string()));
        }

        Ok(ConnectionConfig {
            base_url,
            user,
            password,
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            export_path: endpoint_path(config.export_path, DEFAULT_EXPORT_PATH),
            sequence_path: endpoint_path(config.sequence_path, DEFAULT_SEQUENCE_PATH),
        })
    }
}

fn endpoint_path(value: Option<String>, default: &str) -> String {
    let value = value.unwrap_or_else(|| default.to_string());
    if value.starts_with('/') {
        value
    } else {
        format!("/{value}")
    }
}
