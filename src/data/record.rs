//! Event Record Module
//! Fixed, typed schema for one social media post observation.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Columns every source must provide, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 6] = ["date", "platform", "views", "likes", "comments", "shares"];

/// One raw post observation as read from the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub date: NaiveDateTime,
    pub platform: String,
    pub views: f64,
    pub likes: f64,
    pub comments: f64,
    pub shares: f64,
}

/// Immutable, ordered collection of event records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<EventRecord>,
}

impl Table {
    pub fn new(rows: Vec<EventRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EventRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<EventRecord> for Table {
    fn from_iter<I: IntoIterator<Item = EventRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
