use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::render::DEFAULT_TITLE;
use crate::seatable::DEFAULT_SERVER_URL;
use crate::store::DEFAULT_OUTPUT_DIR;

pub const DEFAULT_CONFIG_FILE: &str = "catalog.json";
pub const TOKEN_ENV: &str = "SEATABLE_API_TOKEN";
pub const SERVER_ENV: &str = "SEATABLE_SERVER_URL";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub view_name: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Values taken from command-line flags; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub api_token: Option<String>,
    pub table_name: Option<String>,
    pub view_name: Option<String>,
    pub output_dir: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EnvValues {
    pub api_token: Option<String>,
    pub server_url: Option<String>,
}

impl EnvValues {
    pub fn from_env() -> Self {
        Self {
            api_token: std::env::var(TOKEN_ENV).ok(),
            server_url: std::env::var(SERVER_ENV).ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub server_url: String,
    pub api_token: String,
    pub table_name: Option<String>,
    pub view_name: Option<String>,
    pub output_dir: Utf8PathBuf,
    pub title: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file. An explicit path must exist; the default
    /// `catalog.json` is optional.
    pub fn load(path: Option<&str>) -> Result<Config, CatalogError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if !config_path.exists() {
            return match path {
                Some(_) => Err(CatalogError::MissingConfig(config_path)),
                None => Ok(Config::default()),
            };
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CatalogError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| CatalogError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, CatalogError> {
        let config = Self::load(path)?;
        Self::resolve_config(config, overrides, EnvValues::from_env())
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
        env: EnvValues,
    ) -> Result<ResolvedConfig, CatalogError> {
        let api_token = first_set([overrides.api_token, env.api_token, config.api_token])
            .ok_or(CatalogError::MissingCredential)?;
        let server_url = first_set([overrides.server_url, env.server_url, config.server_url])
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let table_name = first_set([overrides.table_name, config.table_name]);
        let view_name = first_set([overrides.view_name, config.view_name]);
        let output_dir = first_set([overrides.output_dir, config.output_dir])
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
        let title = first_set([overrides.title, config.title])
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Ok(ResolvedConfig {
            server_url,
            api_token,
            table_name,
            view_name,
            output_dir: Utf8PathBuf::from(output_dir),
            title,
        })
    }
}

/// First value that is present and not blank.
fn first_set<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_count_as_unset() {
        assert_eq!(
            first_set([Some("  ".to_string()), Some("Works".to_string())]),
            Some("Works".to_string())
        );
        assert_eq!(first_set([None, Some(String::new())]), None);
    }
}
