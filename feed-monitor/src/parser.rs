use crate::types::{Entry, MonitorError, Result};
use feed_rs::parser;
use tracing::{debug, info};

/// Turns raw RSS / Atom / JSON Feed documents into entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `content`, keeping the document's entry order (feeds list
    /// their newest items first).
    pub fn parse_feed(&self, content: &[u8]) -> Result<Vec<Entry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        // No generated ids: a guid-less item keeps an empty id and is
        // identified by its title.
        let feed = parser::Builder::new()
            .id_generator(|_links, _title, _uri| String::new())
            .build()
            .parse(content)
            .map_err(|e| MonitorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let entries: Vec<Entry> = feed.entries.into_iter().map(Self::convert_entry).collect();

        info!("Parsed feed with {} entries", entries.len());
        Ok(entries)
    }

    fn convert_entry(entry: feed_rs::model::Entry) -> Entry {
        let title = entry.title.map(|t| t.content).unwrap_or_default();

        // Primary link only
        let link = entry
            .links
            .into_iter()
            .next()
            .map(|l| l.href)
            .unwrap_or_default();

        let content = entry
            .content
            .and_then(|c| c.body)
            .unwrap_or_default();

        let description = entry.summary.map(|s| s.content).unwrap_or_default();

        let authors = entry
            .authors
            .into_iter()
            .map(|a| a.name)
            .filter(|name| !name.is_empty())
            .collect();

        Entry {
            id: entry.id,
            title,
            link,
            published: entry.published,
            updated: entry.updated,
            content,
            description,
            authors,
        }
    }
}
