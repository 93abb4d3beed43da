use crate::types::{Entry, MonitorError, Result};
use regex::Regex;
use std::borrow::Cow;
use tracing::trace;

/// The part of an entry a filter clause looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryField {
    Title,
    Link,
    Published,
    Updated,
    Content,
    /// First author only.
    Author,
    Description,
    /// Anything else. Always reads as "".
    Unknown(String),
}

impl EntryField {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "title" => EntryField::Title,
            "link" => EntryField::Link,
            "published" => EntryField::Published,
            "updated" => EntryField::Updated,
            "content" => EntryField::Content,
            "author" => EntryField::Author,
            "description" => EntryField::Description,
            _ => EntryField::Unknown(name.to_string()),
        }
    }

    /// Text of this field on `entry`. Absent values read as "".
    pub fn extract<'a>(&self, entry: &'a Entry) -> Cow<'a, str> {
        match self {
            EntryField::Title => Cow::Borrowed(&entry.title),
            EntryField::Link => Cow::Borrowed(&entry.link),
            EntryField::Published => entry
                .published
                .map(|t| Cow::Owned(t.to_rfc3339()))
                .unwrap_or(Cow::Borrowed("")),
            EntryField::Updated => entry
                .updated
                .map(|t| Cow::Owned(t.to_rfc3339()))
                .unwrap_or(Cow::Borrowed("")),
            EntryField::Content => Cow::Borrowed(&entry.content),
            EntryField::Author => Cow::Borrowed(entry.first_author()),
            EntryField::Description => Cow::Borrowed(&entry.description),
            EntryField::Unknown(_) => Cow::Borrowed(""),
        }
    }
}

/// A field plus the compiled pattern searched for in it.
#[derive(Debug, Clone)]
pub struct FilterClause {
    pub field: EntryField,
    pub pattern: Regex,
}

impl FilterClause {
    pub fn new(element: &str, matches: &str) -> Result<Self> {
        let pattern = Regex::new(matches).map_err(|e| {
            MonitorError::Config(format!("invalid filter pattern {:?}: {}", matches, e))
        })?;
        Ok(Self {
            field: EntryField::parse(element),
            pattern,
        })
    }

    /// Unanchored search: the pattern may match anywhere in the field.
    pub fn is_match(&self, entry: &Entry) -> bool {
        self.pattern.is_match(&self.field.extract(entry))
    }
}

/// An include/exclude pair. A missing clause imposes nothing.
#[derive(Debug, Clone, Default)]
pub struct FilterRule {
    pub include: Option<FilterClause>,
    pub exclude: Option<FilterClause>,
}

impl FilterRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, clause: FilterClause) -> Self {
        self.include = Some(clause);
        self
    }

    pub fn exclude(mut self, clause: FilterClause) -> Self {
        self.exclude = Some(clause);
        self
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(entry) {
                trace!("Entry {:?} missed include {}", entry.title, include.pattern);
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(entry) {
                trace!("Entry {:?} hit exclude {}", entry.title, exclude.pattern);
                return false;
            }
        }
        true
    }
}

/// True when `entry` satisfies every rule. An empty rule list passes everything.
pub fn passes_all(entry: &Entry, rules: &[FilterRule]) -> bool {
    rules.iter().all(|rule| rule.matches(entry))
}
