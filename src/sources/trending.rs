//! Trending-repositories scraper.
//!
//! Mines [GitHub Trending](https://github.com/trending) for `owner/name`,
//! description and "stars today", keeps the AI-related rows, and turns them
//! into high-priority [`NewsEntry`]s.
//!
//! # Topic filter
//!
//! Two tiers, both applied to `owner/name + " " + description`:
//!
//! 1. **Whole-word** tokens (`ai`, `ml`, `rag`, ...) that would otherwise hit
//!    inside unrelated words like `wagtail` or `dragonfly`
//! 2. **Substring** phrases that are unambiguous on their own (`machine learning`, `pytorch`, ...)
//!
//! # Markup
//!
//! Each repository is an `article.Box-row`; the name is the `h2 a[href]`, the
//! description the first `p`, and the stars count the `N stars today` text.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::TrendingConfig;
use crate::models::{NewsEntry, Priority, Published, TrendingRepo};
use crate::sources::TrendingPage;
use crate::utils::human_count;

/// `source` of every entry this module produces.
pub const TRENDING_SOURCE: &str = "GitHub Trending";

const TRENDING_BASE: &str = "https://github.com/trending";
const GITHUB_BASE: &str = "https://github.com/";
const NO_DESCRIPTION: &str = "No description provided.";

static WHOLE_WORD_TOPICS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:ai|ml|llms?|gpt|rag|nlp|agents?|agentic|mcp|genai|transformers?|diffusion|embeddings?|inference|neural|lora|vlm|tts|asr)\b",
    )
    .unwrap()
});

const SUBSTRING_TOPICS: &[&str] = &[
    "machine learning",
    "deep learning",
    "artificial intelligence",
    "language model",
    "openai",
    "anthropic",
    "langchain",
    "llama",
    "huggingface",
    "hugging face",
    "pytorch",
    "chatgpt",
    "copilot",
    "stable diffusion",
    "fine-tun",
];

static STARS_TODAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d,]+)\s+stars?\s+today").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// URL of the listing for the configured window and optional language.
pub fn page_url(cfg: &TrendingConfig) -> String {
    let since = urlencoding::encode(&cfg.since);
    match cfg.language.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(lang) => format!("{}/{}?since={}", TRENDING_BASE, urlencoding::encode(lang), since),
        None => format!("{}?since={}", TRENDING_BASE, since),
    }
}

fn collapse_ws(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Extract repositories from the listing HTML, in page order.
pub fn parse_trending_page(html: &str) -> Vec<TrendingRepo> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("article.Box-row").unwrap();
    let name_selector = Selector::parse("h2 a[href]").unwrap();
    let desc_selector = Selector::parse("p").unwrap();

    let mut repos = Vec::new();
    for row in document.select(&row_selector) {
        let Some(href) = row
            .select(&name_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let full_name = href.trim().trim_matches('/').to_string();
        if full_name.split('/').count() != 2 {
            debug!(%href, "Skipping row without owner/name link");
            continue;
        }

        let description = row
            .select(&desc_selector)
            .next()
            .map(|p| collapse_ws(&p.text().collect::<String>()))
            .filter(|d| !d.is_empty());

        let row_text = row.text().collect::<Vec<_>>().join(" ");
        let stars_today = STARS_TODAY
            .captures(&row_text)
            .and_then(|c| c[1].replace(',', "").parse::<u64>().ok())
            .unwrap_or(0);

        repos.push(TrendingRepo {
            full_name,
            description,
            stars_today,
        });
    }
    repos
}

/// Whether `text` is on-topic, by the two-tier keyword match.
pub fn is_ai_related(text: &str) -> bool {
    if WHOLE_WORD_TOPICS.is_match(text) {
        return true;
    }
    let lower = text.to_lowercase();
    SUBSTRING_TOPICS.iter().any(|phrase| lower.contains(phrase))
}

/// Keep the first `max_count` on-topic repositories, preserving order.
pub fn select_relevant(repos: Vec<TrendingRepo>, max_count: usize) -> Vec<TrendingRepo> {
    repos
        .into_iter()
        .filter(|r| {
            is_ai_related(&format!(
                "{} {}",
                r.full_name,
                r.description.as_deref().unwrap_or_default()
            ))
        })
        .take(max_count)
        .collect()
}

/// Turn a repository into a high-priority entry stamped with `now`.
pub fn repo_to_entry(repo: &TrendingRepo, now: DateTime<Utc>) -> NewsEntry {
    let link = Url::parse(GITHUB_BASE)
        .and_then(|base| base.join(&repo.full_name))
        .map(String::from)
        .unwrap_or_default();
    let title = format!(
        "{} is trending on GitHub ({} stars today)",
        repo.full_name,
        human_count(repo.stars_today)
    );
    let summary = format!(
        "{}: {}",
        repo.full_name,
        repo.description.as_deref().unwrap_or(NO_DESCRIPTION)
    );
    NewsEntry::new(
        title,
        link,
        &summary,
        Published::At(now),
        TRENDING_SOURCE,
        Priority::High,
    )
}

/// Fetch the trending page and return up to `max_count` on-topic entries.
///
/// Fetch failures are logged and produce no entries.
#[instrument(level = "info", skip(page))]
pub async fn fetch_trending_repositories<P: TrendingPage>(
    page: &P,
    max_count: usize,
    now: DateTime<Utc>,
) -> Vec<NewsEntry> {
    let html = match page.fetch_page().await {
        Ok(html) => html,
        Err(e) => {
            warn!(source = TRENDING_SOURCE, error = %e, "Failed to fetch trending repositories");
            return Vec::new();
        }
    };

    let repos = parse_trending_page(&html);
    let scraped = repos.len();
    let entries: Vec<NewsEntry> = select_relevant(repos, max_count)
        .iter()
        .map(|r| repo_to_entry(r, now))
        .collect();
    info!(scraped, kept = entries.len(), "Collected trending repositories");
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    const PAGE: &str = r#"
<html><body>
<article class="Box-row">
  <h2 class="h3 lh-condensed">
    <a href="/wagtail/wagtail"><span class="text-normal">wagtail /</span> wagtail</a>
  </h2>
  <p class="col-9 color-fg-muted my-1 pr-4">A Django content management system</p>
  <div class="f6"><span class="d-inline-block float-sm-right">321 stars today</span></div>
</article>
<article class="Box-row">
  <h2 class="h3 lh-condensed"><a href="/acme/llm-router">acme / llm-router</a></h2>
  <p class="col-9">
     Route prompts   across
     providers
  </p>
  <div class="f6"><span class="d-inline-block float-sm-right">1,234 stars today</span></div>
</article>
<article class="Box-row">
  <h2 class="h3 lh-condensed"><a href="/dragonflydb/dragonfly">dragonflydb / dragonfly</a></h2>
  <p>A modern replacement for Redis and Memcached</p>
  <div class="f6"><span>88 stars today</span></div>
</article>
<article class="Box-row">
  <h2 class="h3 lh-condensed"><a href="/vision/kit">vision / kit</a></h2>
  <p>Reference models built on PyTorch</p>
  <div class="f6"><span>1 star today</span></div>
</article>
<article class="Box-row">
  <h2 class="h3 lh-condensed"><a href="/solo/agents">solo / agents</a></h2>
</article>
</body></html>
"#;

    struct CannedPage(Result<String, String>);

    impl TrendingPage for CannedPage {
        async fn fetch_page(&self) -> Result<String, Box<dyn Error>> {
            self.0.clone().map_err(|e| e.into())
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-21T07:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_parse_trending_page() {
        let repos = parse_trending_page(PAGE);
        let names: Vec<_> = repos.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "wagtail/wagtail",
                "acme/llm-router",
                "dragonflydb/dragonfly",
                "vision/kit",
                "solo/agents"
            ]
        );
        assert_eq!(repos[1].stars_today, 1234);
        assert_eq!(
            repos[1].description.as_deref(),
            Some("Route prompts across providers")
        );
        assert_eq!(repos[3].stars_today, 1);
        assert_eq!(repos[4].description, None);
        assert_eq!(repos[4].stars_today, 0);
    }

    #[test]
    fn test_whole_word_tokens_do_not_match_inside_words() {
        assert!(!is_ai_related("wagtail/wagtail A Django content management system"));
        assert!(!is_ai_related("dragonflydb/dragonfly A modern replacement for Redis"));
        assert!(!is_ai_related("mailgun/html-email templates"));
        assert!(is_ai_related("acme/llm-router Route prompts"));
        assert!(is_ai_related("foo/bar An AI pair programmer"));
        assert!(is_ai_related("foo/rag-kit"));
        assert!(is_ai_related("foo/bar Simple RAG pipeline"));
    }

    #[test]
    fn test_substring_phrases() {
        assert!(is_ai_related("vision/kit Reference models built on PyTorch"));
        assert!(is_ai_related("x/y Tools for Machine Learning engineers"));
        assert!(is_ai_related("x/y Fine-tuning recipes"));
        assert!(!is_ai_related("x/y A static site generator"));
    }

    #[test]
    fn test_select_relevant_respects_max_and_order() {
        let repos = parse_trending_page(PAGE);
        let picked = select_relevant(repos.clone(), 10);
        let names: Vec<_> = picked.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["acme/llm-router", "vision/kit", "solo/agents"]);

        let picked = select_relevant(repos, 2);
        let names: Vec<_> = picked.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["acme/llm-router", "vision/kit"]);
    }

    #[test]
    fn test_repo_to_entry() {
        let repo = TrendingRepo {
            full_name: "acme/llm-router".to_string(),
            description: None,
            stars_today: 1234,
        };
        let entry = repo_to_entry(&repo, now());
        assert_eq!(entry.priority, Priority::High);
        assert_eq!(entry.source, TRENDING_SOURCE);
        assert_eq!(entry.published, Published::At(now()));
        assert_eq!(entry.link, "https://github.com/acme/llm-router");
        assert!(entry.title.contains("acme/llm-router"));
        assert!(entry.title.contains("1.2k"));
        assert!(entry.summary.contains(NO_DESCRIPTION));
    }

    #[test]
    fn test_repo_to_entry_truncates_description() {
        let repo = TrendingRepo {
            full_name: "a/b".to_string(),
            description: Some("ai ".repeat(400)),
            stars_today: 5,
        };
        let entry = repo_to_entry(&repo, now());
        assert_eq!(entry.summary.chars().count(), 500);
    }

    #[test]
    fn test_page_url() {
        let mut cfg = TrendingConfig::default();
        assert_eq!(page_url(&cfg), "https://github.com/trending?since=daily");
        cfg.language = Some("c++".to_string());
        cfg.since = "weekly".to_string();
        assert_eq!(
            page_url(&cfg),
            "https://github.com/trending/c%2B%2B?since=weekly"
        );
    }

    #[tokio::test]
    async fn test_fetch_trending_repositories() {
        let page = CannedPage(Ok(PAGE.to_string()));
        let entries = fetch_trending_repositories(&page, 10, now()).await;
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.priority == Priority::High));
        assert!(entries[0].title.starts_with("acme/llm-router"));
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_nothing() {
        let page = CannedPage(Err("connection refused".to_string()));
        let entries = fetch_trending_repositories(&page, 10, now()).await;
        assert!(entries.is_empty());
    }
}
