//! # AI News Caster
//!
//! A daily AI news briefing pipeline: it aggregates research blogs, lab
//! announcements and trending repositories, has an LLM write a spoken script
//! and a short text digest, voices the script with ElevenLabs, archives the
//! run, and delivers the result to WhatsApp.
//!
//! ## Usage
//!
//! ```sh
//! ai_news_caster --sources sources/sources.yaml --config config/config.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Aggregation**: fetch feeds and trending repositories, rank, filter
//! 2. **Writing**: script and digest through the LLM (with backoff)
//! 3. **Speech**: chunked text-to-speech into one MP3
//! 4. **Archive**: script, digest, run JSON and story summary on disk
//! 5. **Delivery**: voice note plus text message via `openclaw`

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod api;
mod cli;
mod config;
mod deliver;
mod error;
mod models;
mod outputs;
mod scriptwriter;
mod sources;
mod tts;
mod utils;

use cli::Cli;
use deliver::{OpenClaw, default_media_dir, deliver_whatsapp, format_story_message};
use error::PipelineError;
use models::{BriefingArchive, NewsEntry};
use outputs::{BriefingPaths, json, text};
use scriptwriter::{LlmTemplates, extract_story_list, write_digest, write_script};
use sources::{HttpFeedFetcher, HttpTrendingPage};
use utils::{ensure_writable_dir, truncate_for_log, word_count};

fn print_entries(entries: &[NewsEntry]) {
    for (i, e) in entries.iter().enumerate() {
        println!(
            "{:>3}. [{}] {} | {}\n     {} ({})",
            i + 1,
            e.priority,
            e.source,
            e.title,
            e.link,
            e.published
        );
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {e}");
        }
    }

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let today = Local::now().date_naive().to_string();
    info!(%today, "ai_news_caster starting up");

    let args = Cli::parse();
    debug!(?args.sources, ?args.config, ?args.output_dir, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut sources_cfg = config::load_sources(&args.sources)?;
    if let Some(hours) = args.hours_back {
        info!(hours_back = hours, "Overriding lookback window from CLI");
        sources_cfg.hours_back = hours;
    }
    let app_cfg = config::load_app_config(&args.config)?;

    // ---- Aggregation ----
    let fetcher = HttpFeedFetcher::new()?;
    let trending = HttpTrendingPage::new(&sources_cfg.trending)?;
    let entries = aggregator::aggregate(&sources_cfg, &fetcher, &trending).await;

    if entries.is_empty() {
        error!(error = %PipelineError::NoEntries, "Nothing to brief on");
        std::process::exit(1);
    }
    info!(count = entries.len(), "Entries to review");

    if args.dry_run {
        print_entries(&entries);
        info!(elapsed = ?start_time.elapsed(), "Dry run finished");
        return Ok(());
    }

    // ---- Script & digest ----
    ensure_writable_dir(&args.output_dir).await?;
    let paths = BriefingPaths::new(&args.output_dir, &today);
    let top_stories = extract_story_list(&entries, app_cfg.style.max_stories);

    let llm = LlmTemplates::load(&app_cfg.llm).await?;
    let script_llm = api::with_backoff(&llm.config, &llm.script);
    let script = write_script(&script_llm, &entries, &app_cfg, &today).await?;
    text::write_text(&paths.script, &script).await?;

    let digest_llm = api::with_backoff(&llm.config, &llm.digest);
    let digest = match write_digest(&digest_llm, &entries, &app_cfg, &today).await {
        Ok(d) if !d.is_empty() => d,
        Ok(_) => {
            warn!("LLM returned an empty digest; using story list");
            format_story_message(&top_stories)
        }
        Err(e) => {
            warn!(error = %truncate_for_log(&e.to_string(), 200), "Digest generation failed; using story list");
            format_story_message(&top_stories)
        }
    };
    text::write_text(&paths.digest, &digest).await?;

    // ---- Audio ----
    let audio_path = if args.skip_audio {
        info!("Skipping audio generation");
        None
    } else {
        tts::generate_audio(
            &script,
            &paths.audio,
            &app_cfg.tts,
            args.elevenlabs_api_key.as_deref(),
        )
        .await?;
        Some(paths.audio.clone())
    };

    // ---- Archive ----
    let archive = BriefingArchive {
        date: today.clone(),
        entries_found: entries.len(),
        entries,
        top_stories,
        script_path: paths.script.display().to_string(),
        audio_path: audio_path.as_ref().map(|p| p.display().to_string()),
        digest_path: Some(paths.digest.display().to_string()),
        script_word_count: word_count(&script),
    };
    json::write_archive(&archive, &paths.archive).await?;
    json::write_summary(&archive.top_stories, &paths.summary).await?;

    // ---- Delivery ----
    let delivery = match (&audio_path, args.skip_delivery) {
        (Some(audio), false) => deliver(audio, &digest, args.whatsapp_target.as_deref()).await,
        _ => {
            info!("Skipping delivery");
            Ok(())
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        script = %paths.script.display(),
        archive = %paths.archive.display(),
        "Run finished"
    );

    if let Err(e) = delivery {
        error!(error = %e, "Delivery failed");
        return Err(e);
    }
    Ok(())
}

async fn deliver(audio: &Path, message: &str, target: Option<&str>) -> Result<(), Box<dyn Error>> {
    let media_dir = default_media_dir().ok_or("HOME is not set; cannot stage media")?;
    deliver_whatsapp(&OpenClaw, audio, message, target, &media_dir).await
}
