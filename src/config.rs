//! YAML configuration for sources and for the downstream stages.
//!
//! Two files are read once per run and passed explicitly to the stages:
//!
//! - `sources/sources.yaml`: feeds, recency window, skip keywords, trending settings
//! - `config/config.yaml`: story count, target length, LLM templates, TTS voice
//!
//! Every field has a default so a minimal file only needs `rss_feeds`.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{info, instrument};

use crate::error::PipelineError;
use crate::models::Priority;

pub const DEFAULT_SOURCES_PATH: &str = "sources/sources.yaml";
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const DEFAULT_HOURS_BACK: i64 = 48;

/// One configured feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub priority: Priority,
    /// Overrides the global recency window for this source only.
    #[serde(default, rename = "hours_back")]
    pub hours_back_override: Option<i64>,
}

impl SourceConfig {
    pub fn effective_hours_back(&self, global: i64) -> i64 {
        self.hours_back_override.unwrap_or(global)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrendingConfig {
    pub enabled: bool,
    pub max_repos: usize,
    /// `daily`, `weekly` or `monthly`.
    pub since: String,
    pub language: Option<String>,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_repos: 10,
            since: "daily".to_string(),
            language: None,
        }
    }
}

/// Run-level aggregation parameters, the contents of `sources.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    #[serde(rename = "rss_feeds")]
    pub sources: Vec<SourceConfig>,
    pub hours_back: i64,
    pub keywords_skip: Vec<String>,
    pub trending: TrendingConfig,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            hours_back: DEFAULT_HOURS_BACK,
            keywords_skip: Vec::new(),
            trending: TrendingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub max_stories: usize,
    /// Spoken language of the script, e.g. `Roman Urdu`. Technical terms stay in English.
    pub language: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            max_stories: 8,
            language: "English".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub target_duration_minutes: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target_duration_minutes: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Path to the `awful_aj` config; defaults to its own config directory.
    pub config_path: Option<String>,
    pub script_template: String,
    pub digest_template: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            script_template: "ai_news_script".to_string(),
            digest_template: "ai_news_digest".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    /// Per-request character limit of the speech API.
    pub max_chars: usize,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice_id: "cgSgspJ2msm6clMCkdW9".to_string(),
            model_id: "eleven_turbo_v2_5".to_string(),
            output_format: "mp3_44100_128".to_string(),
            max_chars: 4_500,
        }
    }
}

/// Settings for script writing and speech, the contents of `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub style: StyleConfig,
    pub output: OutputConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let config_err = |source: Box<dyn std::error::Error + Send + Sync>| PipelineError::Config {
        path: path.to_path_buf(),
        source,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| config_err(Box::new(e)))?;
    serde_yaml::from_str(&raw).map_err(|e| config_err(Box::new(e)))
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_sources(path: &Path) -> Result<AggregationConfig, PipelineError> {
    let cfg: AggregationConfig = load_yaml(path)?;
    info!(
        feeds = cfg.sources.len(),
        hours_back = cfg.hours_back,
        skip_keywords = cfg.keywords_skip.len(),
        trending = cfg.trending.enabled,
        "Loaded sources"
    );
    Ok(cfg)
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_app_config(path: &Path) -> Result<AppConfig, PipelineError> {
    let cfg: AppConfig = load_yaml(path)?;
    info!(max_stories = cfg.style.max_stories, "Loaded app config");
    Ok(cfg)
}
