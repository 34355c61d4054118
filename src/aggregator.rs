//! Feed aggregation, ranking and skip-keyword filtering.
//!
//! [`aggregate`] is a single pass over the configured sources:
//!
//! 1. Fetch every feed in declaration order, each with its own recency cutoff
//! 2. Append the trending-repository entries
//! 3. Stable-sort by priority, dated entries before undated ones
//! 4. Drop entries whose title or summary contains a skip keyword
//!
//! A failing source is logged and contributes nothing; it never aborts the run.
//! An empty result is returned as-is for the caller to treat as "no entries".

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::config::{AggregationConfig, SourceConfig};
use crate::models::{NewsEntry, Published, RawFeedItem, UNTITLED};
use crate::sources::trending::fetch_trending_repositories;
use crate::sources::{FeedFetcher, TrendingPage};

/// Normalize raw items from `source`, dropping the ones dated before `cutoff`.
///
/// Items with neither a published nor an updated timestamp are kept.
pub fn entries_from_items(
    items: Vec<RawFeedItem>,
    source: &SourceConfig,
    cutoff: DateTime<Utc>,
) -> Vec<NewsEntry> {
    items
        .into_iter()
        .filter_map(|item| {
            let published = Published::from(item.timestamp());
            if let Published::At(dt) = published {
                if dt < cutoff {
                    return None;
                }
            }
            Some(NewsEntry::new(
                item.title.unwrap_or_else(|| UNTITLED.to_string()),
                item.link.unwrap_or_default(),
                item.summary.as_deref().unwrap_or_default(),
                published,
                source.name.clone(),
                source.priority,
            ))
        })
        .collect()
}

/// Fetch one source and return its recent entries.
///
/// Any fetch or parse error is logged as a warning and yields no entries.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn fetch_source_entries<F: FeedFetcher>(
    fetcher: &F,
    source: &SourceConfig,
    cutoff: DateTime<Utc>,
) -> Vec<NewsEntry> {
    match fetcher.fetch(&source.url).await {
        Ok(items) => {
            let entries = entries_from_items(items, source, cutoff);
            info!(count = entries.len(), "Found recent entries");
            entries
        }
        Err(e) => {
            warn!(source = %source.name, url = %source.url, error = %e, "Failed to fetch source");
            Vec::new()
        }
    }
}

/// Stable sort: priority rank first, then dated before unknown.
///
/// No date value takes part in the comparison, so ties keep their input order.
pub fn rank_entries(entries: &mut [NewsEntry]) {
    entries.sort_by_key(|e| (e.priority.rank(), e.published.is_unknown()));
}

/// Remove every entry whose lowercased `title + " " + summary` contains a keyword.
///
/// Matching is a case-insensitive substring test. Blank keywords are ignored.
pub fn filter_skipped(entries: Vec<NewsEntry>, keywords_skip: &[String]) -> Vec<NewsEntry> {
    let keywords: Vec<String> = keywords_skip
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| k.to_lowercase())
        .collect();
    if keywords.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|e| {
            let text = e.search_text();
            !keywords.iter().any(|k| text.contains(k.as_str()))
        })
        .collect()
}

/// `now - hours`, clamped to the earliest representable instant on overflow.
pub fn cutoff_for(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    Duration::try_hours(hours)
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Run the full aggregation with the current time.
pub async fn aggregate<F, P>(config: &AggregationConfig, fetcher: &F, trending: &P) -> Vec<NewsEntry>
where
    F: FeedFetcher,
    P: TrendingPage,
{
    aggregate_at(config, fetcher, trending, Utc::now()).await
}

/// Run the full aggregation as of `now`.
#[instrument(level = "info", skip_all, fields(sources = config.sources.len()))]
pub async fn aggregate_at<F, P>(
    config: &AggregationConfig,
    fetcher: &F,
    trending: &P,
    now: DateTime<Utc>,
) -> Vec<NewsEntry>
where
    F: FeedFetcher,
    P: TrendingPage,
{
    let per_source: Vec<Vec<NewsEntry>> = stream::iter(config.sources.iter())
        .then(|source| {
            let hours = source.effective_hours_back(config.hours_back);
            info!(source = %source.name, hours_back = hours, "Fetching source");
            fetch_source_entries(fetcher, source, cutoff_for(now, hours))
        })
        .collect()
        .await;
    let mut entries: Vec<NewsEntry> = per_source.into_iter().flatten().collect();

    if config.trending.enabled && config.trending.max_repos > 0 {
        entries.extend(fetch_trending_repositories(trending, config.trending.max_repos, now).await);
    }

    rank_entries(&mut entries);

    let before = entries.len();
    let filtered = filter_skipped(entries, &config.keywords_skip);
    info!(
        before,
        after = filtered.len(),
        skipped = before - filtered.len(),
        "Aggregation complete"
    );
    filtered
}
