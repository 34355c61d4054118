//! RSS 2.0, RSS 1.0 (RDF) and Atom parsing.
//!
//! Documents are deserialized with `quick-xml`'s serde support into minimal
//! structs per dialect and flattened into [`RawFeedItem`]s. The dialect is
//! picked from the root element.
//!
//! Text elements whose body carries unescaped child markup are wrapped in
//! CDATA before deserializing, so the markup ends up in the text instead of
//! failing the document.
//!
//! Timestamps are accepted as RFC 2822 or RFC 3339 and converted to UTC; a
//! value that parses as neither is treated as absent.

use chrono::{DateTime, Utc};
use quick_xml::de::{DeError, from_str};
use std::borrow::Cow;
use std::ops::Range;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;
use tracing::debug;

use crate::error::PipelineError;
use crate::models::RawFeedItem;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// RSS 1.0 puts items next to the channel instead of inside it.
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    /// `dc:date`; elements are matched by local name.
    #[serde(rename = "date")]
    dc_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Atom text constructs carry a `type` attribute, so the body sits in `$text`.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Parse a timestamp in either of the formats feeds use in practice.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Local name of the first element in the document.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Elements read as plain text; raw HTML inside them is tolerated.
const TEXT_ELEMENTS: &[&[u8]] = &[b"title", b"description", b"summary", b"content"];

fn has_child_markup(body: &str) -> bool {
    let trimmed = body.trim_start();
    body.contains('<') && !trimmed.starts_with("<![CDATA[") && !body.contains("]]>")
}

/// Wrap the body of every text element that contains child elements in CDATA.
///
/// Documents the reader cannot walk are returned unchanged for the
/// deserializer to report.
fn protect_markup(xml: &str) -> Cow<'_, str> {
    let mut reader = Reader::from_str(xml);
    let mut bodies: Vec<Range<usize>> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                if !TEXT_ELEMENTS.iter().any(|n| *n == local.as_ref()) {
                    continue;
                }
                let end = e.to_end().into_owned();
                let Ok(span) = reader.read_to_end(end.name()) else {
                    return Cow::Borrowed(xml);
                };
                let body = span.start as usize..span.end as usize;
                if xml.get(body.clone()).is_some_and(has_child_markup) {
                    bodies.push(body);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return Cow::Borrowed(xml),
            Ok(_) => {}
        }
    }
    if bodies.is_empty() {
        return Cow::Borrowed(xml);
    }

    let mut out = String::with_capacity(xml.len() + bodies.len() * 12);
    let mut last = 0;
    for body in bodies {
        out.push_str(&xml[last..body.start]);
        out.push_str("<![CDATA[");
        out.push_str(&xml[body.clone()]);
        out.push_str("]]>");
        last = body.end;
    }
    out.push_str(&xml[last..]);
    debug!("Wrapped inline markup in CDATA");
    Cow::Owned(out)
}

impl From<RssItem> for RawFeedItem {
    fn from(it: RssItem) -> Self {
        Self {
            title: non_empty(it.title),
            link: non_empty(it.link),
            summary: non_empty(it.description),
            published: it.pub_date.as_deref().and_then(parse_timestamp),
            updated: it.dc_date.as_deref().and_then(parse_timestamp),
        }
    }
}

impl From<AtomEntry> for RawFeedItem {
    fn from(e: AtomEntry) -> Self {
        let link = e
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| e.links.first())
            .map(|l| l.href.clone());
        Self {
            title: non_empty(e.title.map(|t| t.value)),
            link: non_empty(link),
            summary: non_empty(e.summary.map(|t| t.value))
                .or_else(|| non_empty(e.content.map(|t| t.value))),
            published: e.published.as_deref().and_then(parse_timestamp),
            updated: e.updated.as_deref().and_then(parse_timestamp),
        }
    }
}

fn parse_err(dialect: &str, e: DeError) -> PipelineError {
    PipelineError::Feed(format!("malformed {dialect} document: {e}"))
}

/// Parse an RSS or Atom document into raw items, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<RawFeedItem>, PipelineError> {
    let root = root_element(xml)
        .ok_or_else(|| PipelineError::Feed("document has no root element".to_string()))?;

    let protected = protect_markup(xml);
    let xml: &str = &protected;

    let items: Vec<RawFeedItem> = match root.as_str() {
        "rss" => {
            let rss: Rss = from_str(xml).map_err(|e| parse_err("RSS", e))?;
            rss.channel.items.into_iter().map(RawFeedItem::from).collect()
        }
        "RDF" => {
            let rdf: Rdf = from_str(xml).map_err(|e| parse_err("RDF", e))?;
            rdf.items.into_iter().map(RawFeedItem::from).collect()
        }
        "feed" => {
            let feed: AtomFeed = from_str(xml).map_err(|e| parse_err("Atom", e))?;
            feed.entries.into_iter().map(RawFeedItem::from).collect()
        }
        other => {
            return Err(PipelineError::Feed(format!(
                "unsupported root element <{other}>"
            )));
        }
    };

    debug!(dialect = %root, count = items.len(), "Parsed feed");
    Ok(items)
}
