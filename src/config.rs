//! Application settings
//!
//! Loaded from the environment (and `.env` for local development) once at
//! startup, then passed explicitly to whatever needs it.

use crate::error::OrchestrationError;
use crate::Result;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_host: String,
    pub app_port: u16,
    pub log_level: String,

    pub market_analysis_api_url: String,
    pub trading_strategy_api_url: String,
    pub market_analysis_timeout: Duration,
    pub trading_strategy_timeout: Duration,
    pub request_timeout: Duration,

    pub openai_api_key: String,
    pub openai_base_url: String,
    pub main_llm_model: String,
    pub llm_timeout: Duration,
    pub agent_timeout: Duration,
    pub trading_tool_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_host: "0.0.0.0".to_string(),
            app_port: 8000,
            log_level: "info".to_string(),
            market_analysis_api_url: "http://localhost:8002".to_string(),
            trading_strategy_api_url: "http://localhost:8001".to_string(),
            market_analysis_timeout: Duration::from_secs(30),
            trading_strategy_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            main_llm_model: "gpt-4o-mini".to_string(),
            llm_timeout: Duration::from_secs(120),
            agent_timeout: Duration::from_secs(180),
            trading_tool_enabled: false,
        }
    }
}

impl Settings {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let secs = |keys: &[&str], default: Duration| -> Result<Duration> {
            get(keys)
                .map(|v| parse::<u64>(keys[0], &v).map(Duration::from_secs))
                .unwrap_or(Ok(default))
        };

        let settings = Self {
            app_host: get(&["APP_HOST"]).unwrap_or(defaults.app_host),
            app_port: get(&["PORT", "APP_PORT"])
                .map(|v| parse::<u16>("APP_PORT", &v))
                .transpose()?
                .unwrap_or(defaults.app_port),
            log_level: get(&["LOG_LEVEL"])
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_level),

            market_analysis_api_url: get(&["MARKET_ANALYSIS_API_BASE_URL", "MARKET_ANALYSIS_API_URL"])
                .map(trim_url)
                .unwrap_or(defaults.market_analysis_api_url),
            trading_strategy_api_url: get(&["TRADING_STRATEGY_API_BASE_URL", "TRADING_STRATEGY_API_URL"])
                .map(trim_url)
                .unwrap_or(defaults.trading_strategy_api_url),
            market_analysis_timeout: secs(
                &["MARKET_ANALYSIS_TIMEOUT_SECS"],
                defaults.market_analysis_timeout,
            )?,
            trading_strategy_timeout: secs(
                &["TRADING_STRATEGY_TIMEOUT_SECS"],
                defaults.trading_strategy_timeout,
            )?,
            request_timeout: secs(&["REQUEST_TIMEOUT_SECS"], defaults.request_timeout)?,

            openai_api_key: get(&["OPENAI_API_KEY"]).unwrap_or(defaults.openai_api_key),
            openai_base_url: get(&["OPENAI_BASE_URL"])
                .map(trim_url)
                .unwrap_or(defaults.openai_base_url),
            main_llm_model: get(&["MAIN_LLM_MODEL"]).unwrap_or(defaults.main_llm_model),
            llm_timeout: secs(&["LLM_TIMEOUT_SECS"], defaults.llm_timeout)?,
            agent_timeout: secs(&["AGENT_TIMEOUT_SECS"], defaults.agent_timeout)?,
            trading_tool_enabled: get(&["TRADING_TOOL_ENABLED"])
                .map(|v| parse_bool("TRADING_TOOL_ENABLED", &v))
                .transpose()?
                .unwrap_or(defaults.trading_tool_enabled),
        };

        Ok(settings)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| OrchestrationError::Config(format!("{}={:?}: {}", key, value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OrchestrationError::Config(format!(
            "{}={:?}: expected a boolean",
            key, value
        ))),
    }
}
