//! One-shot seed feed used to populate the default graph

use serde::{Deserialize, Serialize};

use crate::error::KgResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedCourse {
    pub course_id: i64,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedTopic {
    pub url_slug: String,
    pub display_name: String,
    pub course_id: i64,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedEdge {
    pub parent_slug: String,
    pub child_slug: String,
}

/// Three ordered row sequences, as produced by the scraper.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeedData {
    pub courses: Vec<SeedCourse>,
    pub topics: Vec<SeedTopic>,
    pub edges: Vec<SeedEdge>,
}

/// Anything that can hand over seed rows. Read at most once, at bootstrap.
pub trait SeedSource: Send + Sync {
    fn load(&self) -> KgResult<SeedData>;

    /// Short label for logs.
    fn describe(&self) -> String {
        "seed data".to_string()
    }
}

impl SeedSource for SeedData {
    fn load(&self) -> KgResult<SeedData> {
        Ok(self.clone())
    }
}
