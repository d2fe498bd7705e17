//! Configuration management for Concess.
//!
//! This module handles loading and validating environment variables and application settings.

use crate::error::{ConcessError, Result};
use std::env;

/// Default interval between two FiveM presence polls, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
/// Default interval between two compliance sweeps, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30 * 60;
/// Default FiveM job name tracked by the presence monitor.
pub const DEFAULT_TRACKED_JOB: &str = "cardealer";

/// Configuration for the application, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Directory holding the JSON persistence documents
    pub data_dir: String,
    /// Base URL of the FiveM server HTTP API (http://host:port)
    pub fivem_base_url: String,
    /// FiveM job name the presence monitor tracks
    pub tracked_job: String,
    /// Guild the bot manages roles in (optional; role sync on sweep is skipped without it)
    pub guild_id: Option<u64>,
    /// Channel receiving domain-event notifications (optional; falls back to stderr)
    pub log_channel_id: Option<u64>,
    /// Seconds between two presence polls
    pub poll_interval_secs: u64,
    /// Seconds between two compliance sweeps
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This will attempt to load a .env file if present using dotenv,
    /// then read required environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required environment variable is missing or invalid.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use concess::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load configuration");
    /// println!("FiveM server: {}", config.fivem_base_url);
    /// ```
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors - it's optional)
        dotenv::dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| ConcessError::Config(
                "Missing DISCORD_TOKEN environment variable. Set it in your environment or create a .env file (never commit this file).".to_string()
            ))?;

        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

        let fivem_base_url = env::var("FIVEM_BASE_URL")
            .map_err(|_| ConcessError::Config(
                "Missing FIVEM_BASE_URL environment variable. Set it in your environment or .env file (e.g., FIVEM_BASE_URL=http://localhost:30120).".to_string()
            ))?;
        Self::validate_base_url(&fivem_base_url)?;

        let tracked_job =
            env::var("FIVEM_TRACKED_JOB").unwrap_or_else(|_| DEFAULT_TRACKED_JOB.to_string());

        let guild_id = Self::parse_optional_id("GUILD_ID")?;
        let log_channel_id = Self::parse_optional_id("LOG_CHANNEL_ID")?;

        let poll_interval_secs =
            Self::parse_interval("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let sweep_interval_secs =
            Self::parse_interval("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;

        Ok(Self {
            discord_token,
            data_dir,
            fivem_base_url,
            tracked_job,
            guild_id,
            log_channel_id,
            poll_interval_secs,
            sweep_interval_secs,
        })
    }

    /// Validate the FiveM base URL format using proper URL parsing.
    fn validate_base_url(url_str: &str) -> Result<()> {
        use url::Url;

        let parsed_url = Url::parse(url_str)
            .map_err(|e| ConcessError::Config(
                format!("Invalid FIVEM_BASE_URL '{}': {}", url_str, e)
            ))?;

        let scheme = parsed_url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ConcessError::Config(
                format!("FIVEM_BASE_URL must use http:// or https:// scheme, got: '{}'", scheme)
            ));
        }

        if parsed_url.host_str().is_none() {
            return Err(ConcessError::Config(
                format!("FIVEM_BASE_URL must contain a valid host: '{}'", url_str)
            ));
        }

        Ok(())
    }

    /// Parse an optional Discord snowflake from the environment.
    fn parse_optional_id(var: &str) -> Result<Option<u64>> {
        match env::var(var) {
            Ok(raw) => {
                let id = raw.parse::<u64>().map_err(|_| ConcessError::Config(
                    format!("Invalid {}: '{}' is not a Discord id", var, raw)
                ))?;
                Ok(Some(id))
            }
            Err(_) => Ok(None),
        }
    }

    /// Parse a positive interval in seconds, falling back to a default when unset.
    fn parse_interval(var: &str, default: u64) -> Result<u64> {
        match env::var(var) {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| ConcessError::Config(
                    format!("Invalid {}: '{}' is not a number of seconds", var, raw)
                ))?;
                if secs == 0 {
                    return Err(ConcessError::Config(
                        format!("Invalid {}: interval must be at least 1 second", var)
                    ));
                }
                Ok(secs)
            }
            Err(_) => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_validate_base_url() {
        assert!(Config::validate_base_url("http://localhost:30120").is_ok());
        assert!(Config::validate_base_url("https://fivem.example.com").is_ok());
        assert!(Config::validate_base_url("http://127.0.0.1:30120").is_ok());

        assert!(Config::validate_base_url("localhost:30120").is_err());
        assert!(Config::validate_base_url("ftp://example.com").is_err());
        assert!(Config::validate_base_url("not a url").is_err());
    }

    #[test]
    fn test_parse_interval() {
        // Save original value (if any)
        let original_value = env::var("TEST_INTERVAL").ok();

        env::remove_var("TEST_INTERVAL");
        assert_eq!(Config::parse_interval("TEST_INTERVAL", 30).unwrap(), 30);

        env::set_var("TEST_INTERVAL", "120");
        assert_eq!(Config::parse_interval("TEST_INTERVAL", 30).unwrap(), 120);

        env::set_var("TEST_INTERVAL", "0");
        assert!(Config::parse_interval("TEST_INTERVAL", 30).is_err());

        env::set_var("TEST_INTERVAL", "abc");
        assert!(Config::parse_interval("TEST_INTERVAL", 30).is_err());

        // Restore original value
        match original_value {
            Some(val) => env::set_var("TEST_INTERVAL", val),
            None => env::remove_var("TEST_INTERVAL"),
        }
    }

    #[test]
    fn test_parse_optional_id() {
        let original_value = env::var("TEST_SNOWFLAKE").ok();

        env::remove_var("TEST_SNOWFLAKE");
        assert_eq!(Config::parse_optional_id("TEST_SNOWFLAKE").unwrap(), None);

        env::set_var("TEST_SNOWFLAKE", "123456789012345678");
        assert_eq!(
            Config::parse_optional_id("TEST_SNOWFLAKE").unwrap(),
            Some(123456789012345678)
        );

        env::set_var("TEST_SNOWFLAKE", "not-an-id");
        assert!(Config::parse_optional_id("TEST_SNOWFLAKE").is_err());

        match original_value {
            Some(val) => env::set_var("TEST_SNOWFLAKE", val),
            None => env::remove_var("TEST_SNOWFLAKE"),
        }
    }
}
