//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

use crate::pricing::rules::{self, Holiday, HolidayCalendar, PricingConfig};
use crate::types::StayRateError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    /// Omitted entirely -> the built-in holiday table.
    #[serde(default)]
    pub holidays: Option<Vec<HolidayConfig>>,
    #[serde(default)]
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub horizon_days: u32,
    pub last_minute_days: u32,
    pub max_suggestions: usize,
    pub winter_rule: bool,
    pub multi_factor_bonus: bool,
    pub refresh_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon_days: rules::DEFAULT_HORIZON_DAYS,
            last_minute_days: rules::DEFAULT_LAST_MINUTE_DAYS,
            max_suggestions: rules::DEFAULT_MAX_SUGGESTIONS,
            winter_rule: true,
            multi_factor_bonus: true,
            refresh_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HolidayConfig {
    pub month: u32,
    pub day: u32,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: String,
    pub model: String,
    /// Tried when the primary model fails.
    pub fallback_model: Option<String>,
    pub api_key_env: String,
    pub max_tokens: u32,
    /// Overall budget for the advisor stage before falling back.
    pub timeout_secs: u64,
    /// Override for OpenAI-compatible gateways.
    pub api_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openrouter".to_string(),
            model: "anthropic/claude-sonnet-4".to_string(),
            fallback_model: None,
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            max_tokens: 2048,
            timeout_secs: 20,
            api_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub properties_path: String,
    pub database_url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.horizon_days == 0 {
            return Err(StayRateError::Config("engine.horizon_days must be at least 1".into()).into());
        }
        if self.engine.last_minute_days > self.engine.horizon_days {
            return Err(StayRateError::Config(format!(
                "engine.last_minute_days ({}) exceeds horizon_days ({})",
                self.engine.last_minute_days, self.engine.horizon_days
            ))
            .into());
        }
        if self.engine.max_suggestions == 0 {
            return Err(StayRateError::Config("engine.max_suggestions must be at least 1".into()).into());
        }
        for h in self.holidays.iter().flatten() {
            // 2024 is a leap year, so Feb 29 is accepted
            if NaiveDate::from_ymd_opt(2024, h.month, h.day).is_none() {
                return Err(StayRateError::Config(format!(
                    "holiday {:?} has invalid date {}/{}",
                    h.name, h.month, h.day
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Engine settings in the form the pricing engine consumes.
    pub fn pricing_config(&self) -> PricingConfig {
        let holidays = match &self.holidays {
            Some(list) => HolidayCalendar::new(
                list.iter()
                    .map(|h| Holiday::new(h.month, h.day, &h.name))
                    .collect(),
            ),
            None => HolidayCalendar::default(),
        };

        PricingConfig {
            horizon_days: self.engine.horizon_days,
            last_minute_days: self.engine.last_minute_days,
            max_suggestions: self.engine.max_suggestions,
            holidays,
            winter_rule: self.engine.winter_rule,
            multi_factor_bonus: self.engine.multi_factor_bonus,
        }
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve an environment variable into a secret, treating an empty
    /// value as unset.
    pub fn resolve_secret(env_name: &str) -> Option<SecretString> {
        Self::resolve_env(env_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::new)
    }
}
