//! Run configuration: analysis mode, oracle settings, dataset location.

use crate::error::{AgentError, AgentResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Analysis mode. All four accepted values currently select the same
/// production decision framework; the non-production names are a
/// forward-compatibility placeholder kept so the configuration contract
/// does not silently widen. Unknown values are rejected before any
/// scoring occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Production,
    Balanced,
    Conservative,
    Aggressive,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Balanced => "balanced",
            Self::Conservative => "conservative",
            Self::Aggressive => "aggressive",
        }
    }
}

impl Default for AnalysisMode {
    fn default() -> Self {
        Self::Production
    }
}

impl FromStr for AnalysisMode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "balanced" => Ok(Self::Balanced),
            "conservative" => Ok(Self::Conservative),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(AgentError::config(format!(
                "Invalid mode: {other}. Use: production, balanced, conservative, or aggressive"
            ))),
        }
    }
}

/// Settings for the external reasoning oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// OpenAI-compatible chat-completions endpoint.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Transport timeout for a single oracle round-trip.
    pub timeout: Duration,
    /// Maximum tool-call rounds before the orchestrator gives up.
    pub tool_call_budget: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 1500,
            timeout: Duration::from_secs(60),
            tool_call_budget: 12,
        }
    }
}

impl OracleConfig {
    /// Defaults plus `OPENAI_API_KEY` from the environment.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.endpoint.is_empty() {
            return Err(AgentError::config("Oracle endpoint must not be empty"));
        }
        if self.tool_call_budget == 0 {
            return Err(AgentError::config("Tool-call budget must be at least 1"));
        }
        Ok(())
    }
}

/// Dataset location and sampling.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    /// Sampling fraction in (0, 1]; None loads the full dataset.
    pub sample_frac: Option<f64>,
}

impl DataConfig {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            sample_frac: None,
        }
    }

    pub fn with_sample_frac(mut self, frac: f64) -> Self {
        self.sample_frac = Some(frac);
        self
    }

    /// Row-oriented text form.
    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join("paysim.csv")
    }

    /// Indexed binary form, preferred when present.
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("paysim.db")
    }
}
