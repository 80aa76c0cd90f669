use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ProgressConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_step")]
    pub step: u8,
    /// Highest value the simulated progress may reach before the request settles.
    #[serde(default = "default_cap")]
    pub cap: u8,
    #[serde(default = "default_reset_delay_ms")]
    pub reset_delay_ms: u64,
}

fn default_tick_ms() -> u64 {
    200
}

fn default_step() -> u8 {
    10
}

fn default_cap() -> u8 {
    90
}

fn default_reset_delay_ms() -> u64 {
    1000
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            step: default_step(),
            cap: default_cap(),
            reset_delay_ms: default_reset_delay_ms(),
        }
    }
}

impl ProgressConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    /// Cap clamped below 100 so "done" stays distinguishable from "nearly done".
    pub fn effective_cap(&self) -> u8 {
        self.cap.min(99)
    }
}

// ---------------------------------------------------------------------------
// PreviewConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,
    #[serde(default = "default_sandbox")]
    pub sandbox: Vec<String>,
}

fn default_fallback_delay_ms() -> u64 {
    500
}

fn default_sandbox() -> Vec<String> {
    vec!["allow-scripts".to_string()]
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            fallback_delay_ms: default_fallback_delay_ms(),
            sandbox: default_sandbox(),
        }
    }
}

impl PreviewConfig {
    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// TreeConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_auto_expand")]
    pub auto_expand_portfolios: usize,
}

fn default_auto_expand() -> usize {
    2
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            auto_expand_portfolios: default_auto_expand(),
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Separate endpoint for project code generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_endpoint: Option<String>,
    #[serde(default)]
    pub use_real_llm: bool,
    #[serde(default = "default_framework")]
    pub framework: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_framework() -> String {
    "react".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            code_endpoint: None,
            use_real_llm: false,
            framework: default_framework(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    /// The external endpoint to call, or `None` when the mock backend applies.
    pub fn live_endpoint(&self) -> Option<&str> {
        if !self.use_real_llm {
            return None;
        }
        self.endpoint.as_deref().filter(|e| !e.trim().is_empty())
    }

    pub fn live_code_endpoint(&self) -> Option<&str> {
        if !self.use_real_llm {
            return None;
        }
        self.code_endpoint.as_deref().filter(|e| !e.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load `.aura/config.yaml`, falling back to defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
