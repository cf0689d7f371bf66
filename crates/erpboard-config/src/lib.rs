//! Configuration management for erpboard
//!
//! This module handles loading, validation, and management of
//! erpboard configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::ConfigError;

/// Environment variable that overrides `erp.api_key`
pub const API_KEY_ENV: &str = "ERPBOARD_API_KEY";

/// Fixed store name for persisted preferences
pub const PREFERENCES_STORE_NAME: &str = "erpboard-preferences";

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Upstream ERP REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpConfig {
    /// Base URL, e.g. `https://erp.example.com/api/v1`
    #[serde(default)]
    pub base_url: String,
    /// API key sent with every request
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Query parameter carrying the API key
    #[serde(default = "default_api_key_param")]
    pub api_key_param: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            api_key_param: default_api_key_param(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

fn default_api_key_param() -> String {
    "api_key".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_page_size() -> usize {
    1000
}

/// Retry and page batching for resource fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Attempts per resource before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, doubled on each further retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for the retry delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Pages requested concurrently after the first one
    #[serde(default = "default_page_batch_size")]
    pub page_batch_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            page_batch_size: default_page_batch_size(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_page_batch_size() -> usize {
    3
}

/// Plausibility window for record years
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationConfig {
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default = "default_max_year")]
    pub max_year: i32,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
        }
    }
}

fn default_min_year() -> i32 {
    2000
}

fn default_max_year() -> i32 {
    2050
}

/// Trend comparison settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    /// While today's day-of-month is below this value the current month
    /// counts as incomplete and is left out of trend comparisons.
    /// `null` disables the check.
    #[serde(default = "default_partial_month_cutoff_day")]
    pub partial_month_cutoff_day: Option<u32>,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            partial_month_cutoff_day: default_partial_month_cutoff_day(),
        }
    }
}

fn default_partial_month_cutoff_day() -> Option<u32> {
    Some(25)
}

/// Ranking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Number of top items to show
    #[serde(default = "default_top_items")]
    pub top_items_count: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_items_count: default_top_items(),
        }
    }
}

fn default_top_items() -> usize {
    10
}

/// Size/color analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TycConfig {
    /// Sizes shown per matrix row (at most 20)
    #[serde(default = "default_max_sizes")]
    pub max_sizes: usize,
    /// Lifetime of a cached analysis
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for TycConfig {
    fn default() -> Self {
        Self {
            max_sizes: default_max_sizes(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_max_sizes() -> usize {
    20
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Csv
    }
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// MIME type used for downloads
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            _ => Err(format!("Invalid export format: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub default_format: ExportFormat,
    /// Directory used by the CLI export command
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: ExportFormat::default(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./exports")
}

/// Where user preferences are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default = "default_preferences_dir")]
    pub dir: PathBuf,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            dir: default_preferences_dir(),
        }
    }
}

fn default_preferences_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl PreferencesConfig {
    /// Full path of the preferences file
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", PREFERENCES_STORE_NAME))
    }
}

/// Currency and number formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Default currency
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Number of decimal places
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    /// Thousands separator
    #[serde(default = "default_thousands_sep")]
    pub thousands_separator: String,
    /// Decimal separator
    #[serde(default = "default_decimal_sep")]
    pub decimal_separator: String,
    /// Currency symbol position ("before" or "after")
    #[serde(default)]
    pub symbol_position: SymbolPosition,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            decimal_places: default_decimal_places(),
            thousands_separator: default_thousands_sep(),
            decimal_separator: default_decimal_sep(),
            symbol_position: SymbolPosition::default(),
        }
    }
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

fn default_thousands_sep() -> String {
    ".".to_string()
}

fn default_decimal_sep() -> String {
    ",".to_string()
}

/// Currency symbol position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPosition {
    Before,
    After,
}

impl Default for SymbolPosition {
    fn default() -> Self {
        SymbolPosition::After
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub erp: ErpConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub normalization: NormalizationConfig,
    #[serde(default)]
    pub trends: TrendConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub tyc: TycConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::IoError {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides();
        config.validate()?;

        log::debug!(target: "erpboard::config", "Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from YAML text without validating it
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })
    }

    /// Apply environment overrides (currently only the API key)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.erp.api_key = key;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "Port must be greater than 0"));
        }

        if self.erp.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "erp.base_url".to_string(),
            });
        }

        if self.erp.page_size == 0 {
            return Err(invalid("erp.page_size", "Page size must be greater than 0"));
        }

        if self.fetch.max_attempts == 0 {
            return Err(invalid("fetch.max_attempts", "At least one attempt is required"));
        }

        if self.fetch.page_batch_size == 0 {
            return Err(invalid("fetch.page_batch_size", "Batch size must be greater than 0"));
        }

        if self.fetch.max_delay_ms < self.fetch.base_delay_ms {
            return Err(invalid(
                "fetch.max_delay_ms",
                "Maximum delay must not be lower than the base delay",
            ));
        }

        if self.normalization.min_year > self.normalization.max_year {
            return Err(invalid(
                "normalization.min_year",
                "Minimum year must not exceed maximum year",
            ));
        }

        if let Some(day) = self.trends.partial_month_cutoff_day {
            if !(1..=31).contains(&day) {
                return Err(invalid(
                    "trends.partial_month_cutoff_day",
                    "Cutoff day must be between 1 and 31",
                ));
            }
        }

        if self.tyc.max_sizes == 0 || self.tyc.max_sizes > 20 {
            return Err(invalid("tyc.max_sizes", "Size count must be between 1 and 20"));
        }

        if self.tyc.cache_ttl_secs == 0 {
            return Err(invalid("tyc.cache_ttl_secs", "Cache lifetime must be greater than 0"));
        }

        if self.currency.decimal_places > 10 {
            return Err(invalid(
                "currency.decimal_places",
                "Decimal places must be between 0 and 10",
            ));
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
