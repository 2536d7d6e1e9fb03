use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub index_path: PathBuf,
    pub max_upload_bytes: usize,
    pub analyze_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let openai_api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            AppError::ConfigError(
                "Missing OPENAI_API_KEY. Set it in .env or as an environment variable.".to_string(),
            )
        })?;
        if openai_api_key.trim().is_empty() {
            return Err(AppError::ConfigError("OPENAI_API_KEY is empty".to_string()));
        }

        let model = env::var("MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());
        let index_path = env::var("INDEX_HTML").unwrap_or_else(|_| "static/index.html".to_string());

        // Load server configuration with defaults
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let max_upload_bytes = parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let timeout_secs = parse_or("ANALYZE_TIMEOUT_SECS", 90u64)?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            openai_api_key,
            openai_base_url: openai_base_url.trim_end_matches('/').to_string(),
            model,
            index_path: PathBuf::from(index_path),
            max_upload_bytes,
            analyze_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u64 = parse_or("PAGE_CRITIC_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_or_reports_the_offending_key() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("PAGE_CRITIC_TEST_BAD_NUMBER", "lots") };
        let err = parse_or::<u64>("PAGE_CRITIC_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(err.to_string().contains("PAGE_CRITIC_TEST_BAD_NUMBER"));
    }
}
