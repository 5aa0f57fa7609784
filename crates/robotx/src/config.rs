use std::path::PathBuf;

use derive_more::{Display, Error, From};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::output::{CliError, ErrorCode};

/// Configuration loading errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ConfigError {
    /// Unable to load the configuration using [`figment`].
    Figment(figment::Error),

    /// User's home directory cannot be determined.
    #[display(fmt = "unable to find home directory")]
    HomeDirNotFound,
}

/// Values read once at startup.
///
/// Sources, lowest to highest precedence: `~/.robotx/config.toml`,
/// `ROBOTX_*` environment variables, global CLI flags.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    /// Server base URL.
    #[serde(default)]
    base_url: Option<String>,

    /// API credential sent as a bearer token.
    #[serde(default)]
    api_key: Option<String>,
}

impl Config {
    /// Load the configuration, applying CLI flag overrides last.
    pub(crate) fn load(
        base_url_flag: Option<String>,
        api_key_flag: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config: Config = Figment::new()
            .merge(Toml::file(Self::config_path()?))
            .merge(Env::prefixed("ROBOTX_"))
            .extract()?;
        if base_url_flag.is_some() {
            config.base_url = base_url_flag;
        }
        if api_key_flag.is_some() {
            config.api_key = api_key_flag;
        }
        Ok(config)
    }

    /// Base URL with surrounding whitespace and any trailing slash removed.
    pub(crate) fn base_url(&self) -> Result<String, CliError> {
        self.base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                CliError::new(
                    ErrorCode::MissingBaseUrl,
                    "base URL is required (use --base-url or set ROBOTX_BASE_URL)",
                )
            })
    }

    /// API key for the authenticated owner.
    pub(crate) fn api_key(&self) -> Result<String, CliError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                CliError::new(
                    ErrorCode::MissingApiKey,
                    "API key is required (use --api-key or set ROBOTX_API_KEY)",
                )
            })
    }

    /// Configuration file location under the user's home directory.
    fn config_path() -> Result<PathBuf, ConfigError> {
        let mut home_dir = home::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
        home_dir.push(".robotx/config.toml");
        Ok(home_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a config directly from field values.
    fn config(base_url: Option<&str>, api_key: Option<&str>) -> Config {
        Config {
            base_url: base_url.map(ToOwned::to_owned),
            api_key: api_key.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn base_url_is_normalized() {
        let loaded = config(Some(" https://robotx.example/ "), Some("key"));
        assert_eq!(loaded.base_url().unwrap(), "https://robotx.example");
    }

    #[test]
    fn missing_values_map_to_configuration_errors() {
        let loaded = config(None, Some(""));
        assert_eq!(
            loaded.base_url().unwrap_err().code,
            ErrorCode::MissingBaseUrl
        );
        assert_eq!(loaded.api_key().unwrap_err().code, ErrorCode::MissingApiKey);
    }
}
