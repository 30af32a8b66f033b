//! Configuration management for pagepilot
//!
//! Repository-level settings for the completion provider, the browser,
//! the test runner, the self-correction loop, the server and on-disk storage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{PilotError, Result};

/// Directory holding configuration and persisted artifacts
pub const DATA_DIR: &str = ".pagepilot";

/// Repository-level pagepilot configuration
///
/// Loaded from `.pagepilot/config.toml` in the working directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PilotConfig {
    /// Completion provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Test runner settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Self-correction loop defaults
    #[serde(default)]
    pub loop_defaults: LoopDefaults,

    /// HTTP/WebSocket server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// On-disk locations
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model identifier sent to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Output token cap for JSON phases
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,

    /// Output token cap for code generation and refinement
    #[serde(default = "default_code_max_tokens")]
    pub code_max_tokens: usize,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retries on transient (5xx) provider failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run without a visible window
    #[serde(default)]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Navigation timeout in seconds
    #[serde(default = "default_browser_timeout")]
    pub timeout_seconds: u64,

    /// Store a full-page screenshot for every exploration
    #[serde(default = "default_true")]
    pub capture_screenshots: bool,
}

/// Test runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Program used to execute generated test files
    #[serde(default = "default_runner_program")]
    pub program: String,

    /// Arguments passed after the test file path
    #[serde(default = "default_runner_args")]
    pub args: Vec<String>,

    /// Wall-clock limit for a single run
    #[serde(default = "default_runner_timeout")]
    pub timeout_seconds: u64,
}

/// Self-correction loop defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopDefaults {
    /// Execution attempts per generation (at least 1)
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Upper bound on a client-requested round budget
    #[serde(default = "default_max_rounds_limit")]
    pub max_rounds_limit: usize,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin allowed by CORS (the UI dev server)
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

/// Storage locations, relative to the working directory unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Latest verification report (overwritten atomically)
    #[serde(default = "default_report_file")]
    pub report_file: String,

    /// Append-only metrics log (JSON lines)
    #[serde(default = "default_metrics_file")]
    pub metrics_file: String,

    /// Screenshots and other evidence
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,
}

impl StorageConfig {
    pub fn report_path(&self) -> PathBuf {
        self.data_dir.join(&self.report_file)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.data_dir.join(&self.metrics_file)
    }

    pub fn artifacts_path(&self) -> PathBuf {
        self.data_dir.join(&self.artifacts_dir)
    }
}

// Default value providers
fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_max_output_tokens() -> usize {
    2048
}

fn default_code_max_tokens() -> usize {
    3000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_retries() -> u32 {
    3
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_browser_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_runner_program() -> String {
    "pytest".to_string()
}

fn default_runner_args() -> Vec<String> {
    vec!["-v".to_string(), "--tb=short".to_string()]
}

fn default_runner_timeout() -> u64 {
    300
}

fn default_max_rounds() -> usize {
    2
}

fn default_max_rounds_limit() -> usize {
    10
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DATA_DIR)
}

fn default_report_file() -> String {
    "latest_verification.json".to_string()
}

fn default_metrics_file() -> String {
    "metrics.jsonl".to_string()
}

fn default_artifacts_dir() -> String {
    "artifacts".to_string()
}

impl PilotConfig {
    /// Load configuration from `.pagepilot/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(DATA_DIR).join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| PilotError::Config(format!("Failed to parse config file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.pagepilot/config.toml`
    pub fn write_default(root: &Path) -> Result<PathBuf> {
        let config_dir = root.join(DATA_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| PilotError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_output_tokens: default_max_output_tokens(),
            code_max_tokens: default_code_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            timeout_seconds: default_browser_timeout(),
            capture_screenshots: true,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_runner_program(),
            args: default_runner_args(),
            timeout_seconds: default_runner_timeout(),
        }
    }
}

impl Default for LoopDefaults {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_rounds_limit: default_max_rounds_limit(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            report_file: default_report_file(),
            metrics_file: default_metrics_file(),
            artifacts_dir: default_artifacts_dir(),
        }
    }
}
