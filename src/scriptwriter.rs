//! Briefing script and text digest generation.
//!
//! The ranked entries are rendered into a numbered list and wrapped in one of
//! two prompts: a spoken script sized to the target duration, or a short
//! messaging digest with links. Both go through any [`AskAsync`] client, in
//! production an `awful_aj` template behind [`crate::api::RetryAsk`].

use awful_aj::config::{AwfulJadeConfig, load_config};
use awful_aj::config_dir;
use awful_aj::template::{ChatTemplate, load_template};
use itertools::Itertools;
use std::error::Error;
use tracing::{info, instrument};

use crate::api::AskAsync;
use crate::config::{AppConfig, LlmConfig};
use crate::models::{NewsEntry, StorySummary};
use crate::utils::{WORDS_PER_MINUTE, estimated_minutes, word_count};

/// LLM configuration and the two chat templates, loaded once per run.
#[derive(Debug)]
pub struct LlmTemplates {
    pub config: AwfulJadeConfig,
    pub script: ChatTemplate,
    pub digest: ChatTemplate,
}

impl LlmTemplates {
    #[instrument(level = "info", skip_all)]
    pub async fn load(llm: &LlmConfig) -> Result<Self, Box<dyn Error>> {
        let config_path = match &llm.config_path {
            Some(p) => p.clone(),
            None => config_dir()?.join("config.yaml").to_string_lossy().into_owned(),
        };
        let config = load_config(&config_path)?;
        info!(%config_path, "Loaded LLM configuration");

        let script = load_template(&llm.script_template).await?;
        let digest = load_template(&llm.digest_template).await?;
        info!(script = %llm.script_template, digest = %llm.digest_template, "Loaded templates");

        Ok(Self {
            config,
            script,
            digest,
        })
    }
}

/// Numbered entry list shared by both prompts.
pub fn format_entries(entries: &[NewsEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            format!(
                "---\n{}. [{}] {}\n   Link: {}\n   Published: {}\n   Summary: {}",
                i + 1,
                e.source,
                e.title,
                e.link,
                e.published,
                e.summary
            )
        })
        .join("\n")
}

pub fn build_script_prompt(entries: &[NewsEntry], cfg: &AppConfig, date: &str) -> String {
    let max_stories = cfg.style.max_stories;
    let minutes = cfg.output.target_duration_minutes;
    let words = minutes * WORDS_PER_MINUTE;
    format!(
        r#"You are writing an AI news briefing for {date} that will be listened to as audio, like a friend catching you up over morning coffee.

From the news entries below, pick the 5-{max_stories} stories that matter most to developers and researchers, then write the full script.

NEWS ENTRIES:
{entries}

STRUCTURE (in exactly this order):

1. INTRO (2 lines): start straight away, mention the date, no long greeting.
2. QUICK RUNDOWN (30-40 seconds): today's top three stories, one punchy line each, then move into the details.
3. STORY DETAILS: 2-3 minutes per story with natural transitions. Cover what happened, why it matters to developers or researchers, and an honest opinion.
4. SIGN OFF (1 line).

TONE:
- Write in {language}, the way people actually speak it. Casual and conversational, short sentences, natural pauses.
- Keep technical terms in English (model, benchmark, API, framework, open source, paper).
- The whole script should run about {minutes} minutes (~{words} words at {wpm} words per minute).

FORMAT:
- No markdown, headers, bullet points, stage directions or [brackets]. This is read aloud word for word.

Write the script now."#,
        entries = format_entries(entries),
        language = cfg.style.language,
        wpm = WORDS_PER_MINUTE,
    )
}

pub fn build_digest_prompt(entries: &[NewsEntry], cfg: &AppConfig, date: &str) -> String {
    let max_stories = cfg.style.max_stories;
    format!(
        r#"Write a short text digest of the AI news for {date}, to be sent as a chat message.

From the news entries below, pick up to {max_stories} stories that matter most to developers and researchers.

NEWS ENTRIES:
{entries}

FORMAT:
- Start with one line headline for the day.
- For each story: a numbered line with the title in *bold*, one sentence on why it matters, and the link on its own line.
- Plain text with chat formatting only (*bold*, _italic_). No headers, no tables.
- Keep the whole message under 1500 characters.

Write the digest now."#,
        entries = format_entries(entries),
    )
}

/// Generate the spoken script.
#[instrument(level = "info", skip_all, fields(entries = entries.len()))]
pub async fn write_script<A>(
    llm: &A,
    entries: &[NewsEntry],
    cfg: &AppConfig,
    date: &str,
) -> Result<String, Box<dyn Error>>
where
    A: AskAsync<Response = String>,
{
    let prompt = build_script_prompt(entries, cfg, date);
    info!(prompt_chars = prompt.len(), "Sending script prompt");
    let script = llm.ask(&prompt).await?;
    let words = word_count(&script);
    info!(
        words,
        est_minutes = format!("{:.1}", estimated_minutes(words)),
        "Script generated"
    );
    Ok(script)
}

/// Generate the text digest for the messaging channel.
#[instrument(level = "info", skip_all, fields(entries = entries.len()))]
pub async fn write_digest<A>(
    llm: &A,
    entries: &[NewsEntry],
    cfg: &AppConfig,
    date: &str,
) -> Result<String, Box<dyn Error>>
where
    A: AskAsync<Response = String>,
{
    let prompt = build_digest_prompt(entries, cfg, date);
    let digest = llm.ask(&prompt).await?;
    info!(chars = digest.chars().count(), "Digest generated");
    Ok(digest.trim().to_string())
}

/// The first `max_stories` entries as `{title, link, source}`.
pub fn extract_story_list(entries: &[NewsEntry], max_stories: usize) -> Vec<StorySummary> {
    entries
        .iter()
        .take(max_stories)
        .map(StorySummary::from)
        .collect()
}
