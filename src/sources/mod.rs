//! Upstream collaborators that fetch raw news material.
//!
//! The aggregator only sees two narrow traits, so ranking and filtering can be
//! tested against canned data without touching the network.
//!
//! | Trait | HTTP implementation | Module |
//! |-------|---------------------|--------|
//! | [`FeedFetcher`] | [`HttpFeedFetcher`] | [`rss`] (RSS 2.0 and Atom) |
//! | [`TrendingPage`] | [`HttpTrendingPage`] | [`trending`] (trending repositories page) |

use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::TrendingConfig;
use crate::models::RawFeedItem;

pub mod rss;
pub mod trending;

const USER_AGENT: &str = concat!("ai_news_caster/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Fetch and parse one feed URL.
pub trait FeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<RawFeedItem>, Box<dyn Error>>;
}

/// Fetch the raw HTML of the trending-repositories listing.
pub trait TrendingPage {
    async fn fetch_page(&self) -> Result<String, Box<dyn Error>>;
}

fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .build()
}

async fn get_text(client: &Client, url: &str) -> Result<String, Box<dyn Error>> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let body = resp.text().await?;
    debug!(%url, bytes = body.len(), "Fetched document");
    Ok(body)
}

/// [`FeedFetcher`] over HTTP with a shared client.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

impl FeedFetcher for HttpFeedFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<RawFeedItem>, Box<dyn Error>> {
        let body = get_text(&self.client, url).await?;
        Ok(rss::parse_feed(&body)?)
    }
}

/// [`TrendingPage`] for `github.com/trending`.
#[derive(Debug, Clone)]
pub struct HttpTrendingPage {
    client: Client,
    url: String,
}

impl HttpTrendingPage {
    pub fn new(cfg: &TrendingConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client()?,
            url: trending::page_url(cfg),
        })
    }
}

impl TrendingPage for HttpTrendingPage {
    #[instrument(level = "debug", skip(self), fields(url = %self.url))]
    async fn fetch_page(&self) -> Result<String, Box<dyn Error>> {
        get_text(&self.client, &self.url).await
    }
}
