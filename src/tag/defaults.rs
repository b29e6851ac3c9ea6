//! Default tag set installed on a fresh store.

use serde::Serialize;

use super::model::{NewTag, Tag, TagPriority, TagType};
use crate::types::Color;

/// (name, hex, color name, type, priority, description)
const DEFAULT_TAGS: &[(&str, &str, &str, TagType, TagPriority, &str)] = &[
    (
        "Important",
        "#EF4444",
        "red",
        TagType::System,
        TagPriority::High,
        "Items that need attention",
    ),
    (
        "Favorite",
        "#F59E0B",
        "amber",
        TagType::System,
        TagPriority::Normal,
        "Frequently used items",
    ),
    (
        "Archive",
        "#6B7280",
        "gray",
        TagType::System,
        TagPriority::Low,
        "Items kept for reference",
    ),
    (
        "Work",
        "#3B82F6",
        "blue",
        TagType::User,
        TagPriority::Normal,
        "Work related items",
    ),
    (
        "Personal",
        "#10B981",
        "green",
        TagType::User,
        TagPriority::Normal,
        "Personal items",
    ),
    (
        "Review",
        "#8B5CF6",
        "violet",
        TagType::User,
        TagPriority::High,
        "Items waiting for review",
    ),
];

/// Creation requests for the default tag set.
pub fn default_tags() -> Vec<NewTag> {
    DEFAULT_TAGS
        .iter()
        .map(|&(name, hex, color_name, tag_type, priority, description)| {
            NewTag::new(name, Color::named(hex, color_name))
                .with_type(tag_type)
                .with_priority(priority)
                .with_description(description)
        })
        .collect()
}

/// A default tag that was not created, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTag {
    pub name: String,
    pub reason: String,
}

/// Outcome of seeding the default tags.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    pub created: Vec<Tag>,
    pub skipped: Vec<SkippedTag>,
}

impl SeedReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
