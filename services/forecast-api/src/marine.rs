//! Marine bulletin: Environment Canada Atom feed reduced to titled sections.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use forecast_common::{Clock, ErrorDocument};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storage::DocumentCache;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::metrics;
use crate::upstream::{UpstreamClient, ACCEPT_FEED};

pub const FETCH_FAILED: &str = "Failed to fetch marine forecast feed";
pub const PARSE_FAILED: &str = "Failed to parse marine forecast feed";

const FEED_SNIPPET_CHARS: usize = 2000;

/// Section an entry is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MarineCategory {
    Warnings,
    Extended,
    Winds,
    Weather,
}

impl MarineCategory {
    pub fn key(&self) -> &'static str {
        match self {
            MarineCategory::Warnings => "warnings",
            MarineCategory::Extended => "extended",
            MarineCategory::Winds => "winds",
            MarineCategory::Weather => "weather",
        }
    }
}

/// Case-insensitive title match; the first rule that matches wins.
pub fn classify(title: &str) -> Option<MarineCategory> {
    let title = title.to_lowercase();
    if title.contains("warning") || title.contains("watch") {
        Some(MarineCategory::Warnings)
    } else if title.contains("extended") {
        Some(MarineCategory::Extended)
    } else if title.contains("wind") {
        Some(MarineCategory::Winds)
    } else if title.contains("weather") || title.contains("visibility") {
        Some(MarineCategory::Weather)
    } else {
        None
    }
}

static ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#?[A-Za-z0-9]+;").expect("valid regex"));
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p>\s*<p[^>]*>").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));
static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static FOOTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?si)\bStay connected\b.*").expect("valid regex"));

/// Decode HTML entities one at a time. Unknown entities are left as written.
fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let raw = &caps[0];
        match quick_xml::escape::unescape(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => raw.to_string(),
        }
    })
}

/// Convert an HTML summary into plain multi-line text.
pub fn clean_summary(html: &str) -> String {
    let text = decode_entities(html);
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = PARAGRAPH_BREAK.replace_all(&text, "\n\n");
    let text = TAG.replace_all(&text, "");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = EXTRA_NEWLINES.replace_all(&text, "\n\n");

    let text = text.split('\n').map(str::trim).collect::<Vec<_>>().join("\n");
    let text = FOOTER.replace(&text, "");

    text.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("XML error at position {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("document has no <feed> element")]
    NotAFeed,

    #[error("document ended inside <{0}>")]
    Truncated(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub updated: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomFeed {
    pub title: String,
    pub updated: String,
    pub entries: Vec<FeedEntry>,
}

#[derive(Clone, Copy)]
enum Field {
    FeedTitle,
    FeedUpdated,
    EntryTitle,
    EntryUpdated,
    EntrySummary,
}

impl AtomFeed {
    fn field_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::FeedTitle => Some(&mut self.title),
            Field::FeedUpdated => Some(&mut self.updated),
            Field::EntryTitle => self.entries.last_mut().map(|e| &mut e.title),
            Field::EntryUpdated => self.entries.last_mut().map(|e| &mut e.updated),
            Field::EntrySummary => self.entries.last_mut().map(|e| &mut e.summary),
        }
    }
}

/// Which text field the current element path feeds, if any.
fn field_for(path: &[Vec<u8>]) -> Option<Field> {
    let names: Vec<&[u8]> = path.iter().map(Vec::as_slice).collect();
    match names.as_slice() {
        [b"feed", b"title"] => Some(Field::FeedTitle),
        [b"feed", b"updated"] => Some(Field::FeedUpdated),
        [b"feed", b"entry", b"title"] => Some(Field::EntryTitle),
        [b"feed", b"entry", b"updated"] => Some(Field::EntryUpdated),
        [b"feed", b"entry", b"summary"] => Some(Field::EntrySummary),
        _ => None,
    }
}

/// Parse an Atom document. Element names are matched without namespace prefix.
pub fn parse_feed(xml: &str) -> Result<AtomFeed, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut feed = AtomFeed::default();
    let mut seen_feed = false;
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut buf = Vec::new();

    let xml_error = |reader: &Reader<&[u8]>, e: quick_xml::Error| FeedError::Xml {
        position: reader.buffer_position(),
        message: e.to_string(),
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if path.is_empty() && name == b"feed" {
                    seen_feed = true;
                }
                if seen_feed && path.len() == 1 && name == b"entry" {
                    feed.entries.push(FeedEntry::default());
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name();
                if path.is_empty() && name.as_ref() == b"feed" {
                    seen_feed = true;
                } else if seen_feed && path.len() == 1 && name.as_ref() == b"entry" {
                    feed.entries.push(FeedEntry::default());
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(field) = field_for(&path) {
                    let text = t.unescape().map_err(|e| xml_error(&reader, e))?;
                    if let Some(target) = feed.field_mut(field) {
                        target.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(field) = field_for(&path) {
                    if let Some(target) = feed.field_mut(field) {
                        target.push_str(&String::from_utf8_lossy(&c));
                    }
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = path.last() {
        return Err(FeedError::Truncated(String::from_utf8_lossy(open).into_owned()));
    }
    if !seen_feed {
        return Err(FeedError::NotAFeed);
    }

    Ok(feed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarineSection {
    pub title: String,
    pub updated: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarineDocument {
    pub title: String,
    pub updated: String,
    pub sections: BTreeMap<String, MarineSection>,
    pub generated_at: DateTime<Utc>,
}

impl MarineDocument {
    /// File each classified entry under its section. A later entry of the
    /// same category replaces an earlier one.
    pub fn from_feed(feed: &AtomFeed, generated_at: DateTime<Utc>) -> Self {
        let mut sections = BTreeMap::new();
        for entry in &feed.entries {
            if let Some(category) = classify(&entry.title) {
                sections.insert(
                    category.key().to_string(),
                    MarineSection {
                        title: entry.title.clone(),
                        updated: entry.updated.clone(),
                        content: clean_summary(&entry.summary),
                    },
                );
            }
        }

        Self {
            title: feed.title.clone(),
            updated: feed.updated.clone(),
            sections,
            generated_at,
        }
    }
}

pub struct MarineService {
    client: UpstreamClient,
    feed_url: Url,
    cache: DocumentCache,
    clock: Arc<dyn Clock>,
}

impl MarineService {
    pub fn new(
        client: UpstreamClient,
        feed_url: &str,
        cache: DocumentCache,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let feed_url = Url::parse(feed_url)
            .with_context(|| format!("Invalid marine feed URL: {}", feed_url))?;
        Ok(Self {
            client,
            feed_url,
            cache,
            clock,
        })
    }

    /// Serialized bulletin. Always a 200 body: fresh cache, new fetch,
    /// stale cache, or an error document, in that order of preference.
    pub async fn get(&self, debug: bool) -> Result<Bytes, ApiError> {
        if !debug {
            if let Some(entry) = self.cache.read_fresh().await {
                metrics::record_cache_hit("marine");
                return Ok(entry.document);
            }
            metrics::record_cache_miss("marine");
        }

        self.fetch(debug).await
    }

    /// Refetch and rewrite the cache regardless of freshness.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Bytes, ApiError> {
        self.fetch(false).await
    }

    async fn fetch(&self, debug: bool) -> Result<Bytes, ApiError> {
        let raw = match self.client.get_text(self.feed_url.clone(), ACCEPT_FEED).await {
            Ok(raw) => raw,
            Err(failure) => {
                warn!(url = %self.feed_url, reason = failure.reason(), error = %failure, "Marine feed fetch failed");
                return self.fallback(FETCH_FAILED).await;
            }
        };

        let feed = match parse_feed(&raw) {
            Ok(feed) => feed,
            Err(e) => {
                warn!(url = %self.feed_url, error = %e, bytes = raw.len(), "Marine feed parse failed");
                return self.fallback(PARSE_FAILED).await;
            }
        };

        let document = MarineDocument::from_feed(&feed, self.clock.now());

        if debug {
            let mut value = serde_json::to_value(&document)?;
            value["debug"] = json!({
                "feed_length": raw.len(),
                "feed_snippet": raw.chars().take(FEED_SNIPPET_CHARS).collect::<String>(),
                "entry_titles": feed.entries.iter().map(|e| e.title.as_str()).collect::<Vec<_>>(),
            });
            return Ok(Bytes::from(serde_json::to_vec_pretty(&value)?));
        }

        let body = Bytes::from(serde_json::to_vec_pretty(&document)?);
        if let Err(e) = self.cache.write(body.clone()).await {
            warn!(key = self.cache.key(), error = %e, "Failed to write marine cache");
        }
        info!(sections = document.sections.len(), entries = feed.entries.len(), "Marine bulletin refreshed");

        Ok(body)
    }

    /// Any stored entry, stale or not; otherwise the error document.
    async fn fallback(&self, message: &str) -> Result<Bytes, ApiError> {
        if let Some(entry) = self.cache.read().await {
            metrics::record_marine_stale_served();
            info!(created_at = %entry.created_at, "Serving stale marine bulletin");
            return Ok(entry.document);
        }
        Ok(Bytes::from(serde_json::to_vec(&ErrorDocument::new(message))?))
    }
}
