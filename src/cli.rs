//! Command-line interface definitions for AI News Caster.
//!
//! Paths and switches come from flags; secrets come from the environment
//! (or a `.env` file loaded at start-up).

use clap::Parser;
use std::path::PathBuf;

use crate::config::{DEFAULT_CONFIG_PATH, DEFAULT_SOURCES_PATH};

/// Daily AI news briefing: aggregate feeds, write a script, voice it, deliver it.
///
/// # Examples
///
/// ```sh
/// # Full run from the project directory
/// ai_news_caster
///
/// # See what would be covered, without calling the LLM
/// ai_news_caster --dry-run --hours-back 24
///
/// # Script and archive only
/// ai_news_caster --skip-audio --output-dir ./out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the sources file (feeds, lookback, skip keywords, trending)
    #[arg(short, long, default_value = DEFAULT_SOURCES_PATH)]
    pub sources: PathBuf,

    /// Path to the application config (style, output, llm, tts)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override the global lookback window, in hours
    #[arg(long)]
    pub hours_back: Option<i64>,

    /// Root directory for scripts/, audio/ and archive/
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Do not generate audio (also skips delivery)
    #[arg(long)]
    pub skip_audio: bool,

    /// Do not send anything to WhatsApp
    #[arg(long)]
    pub skip_delivery: bool,

    /// Aggregate and print the ranked entries, then stop
    #[arg(long)]
    pub dry_run: bool,

    /// ElevenLabs API key
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    pub elevenlabs_api_key: Option<String>,

    /// WhatsApp recipient in E.164 format
    #[arg(long, env = "WHATSAPP_TARGET_NUMBER")]
    pub whatsapp_target: Option<String>,
}
