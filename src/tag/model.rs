//! Tag entity for Folio.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{MAX_TAG_DESCRIPTION_LENGTH, MAX_TAG_NAME_LENGTH};
use crate::types::{new_id, Color};
use crate::validation::{self, FieldError, Validator};
use crate::{FolioError, Result};

/// Origin of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    /// Shipped with the store; never removable.
    System,
    /// Created by a user.
    #[default]
    User,
    /// Created by an automatic classifier.
    Automatic,
}

impl TagType {
    /// Convert tag type to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::System => "system",
            TagType::User => "user",
            TagType::Automatic => "automatic",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TagType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(TagType::System),
            "user" => Ok(TagType::User),
            "automatic" => Ok(TagType::Automatic),
            _ => Err(format!("unknown tag type: {s}")),
        }
    }
}

/// Display priority of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl TagPriority {
    /// Convert priority to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagPriority::Low => "low",
            TagPriority::Normal => "normal",
            TagPriority::High => "high",
            TagPriority::Critical => "critical",
        }
    }
}

impl fmt::Display for TagPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TagPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TagPriority::Low),
            "normal" => Ok(TagPriority::Normal),
            "high" => Ok(TagPriority::High),
            "critical" => Ok(TagPriority::Critical),
            _ => Err(format!("unknown tag priority: {s}")),
        }
    }
}

/// Whether a tag is in use or soft-deleted. Stored as `is_active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    #[default]
    Active,
    Inactive,
}

impl TagStatus {
    pub(crate) fn from_active(is_active: bool) -> Self {
        if is_active {
            TagStatus::Active
        } else {
            TagStatus::Inactive
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        *self == TagStatus::Active
    }
}

/// A classification tag that can be assigned to files and folders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) color: Color,
    pub(crate) tag_type: TagType,
    pub(crate) priority: TagPriority,
    pub(crate) status: TagStatus,
    pub(crate) usage_count: i64,
    pub(crate) last_used_at: Option<DateTime<Utc>>,
    pub(crate) parent_id: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Tag {
    /// Build a new tag from a creation request.
    pub fn create(new: NewTag) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: new.name.trim().to_string(),
            description: validation::normalize_optional(new.description),
            color: new.color,
            tag_type: new.tag_type,
            priority: new.priority,
            status: TagStatus::Active,
            usage_count: 0,
            last_used_at: None,
            parent_id: new.parent_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    pub fn tag_type(&self) -> TagType {
        self.tag_type
    }

    pub fn priority(&self) -> TagPriority {
        self.priority
    }

    pub fn status(&self) -> TagStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_system(&self) -> bool {
        self.tag_type == TagType::System
    }

    pub fn usage_count(&self) -> i64 {
        self.usage_count
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into().trim().to_string();
        self.touch();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = validation::normalize_optional(description);
        self.touch();
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.touch();
    }

    /// Change the tag type. System tags stay system tags.
    pub fn set_tag_type(&mut self, tag_type: TagType) -> Result<()> {
        if self.is_system() && tag_type != TagType::System {
            return Err(FolioError::InvalidState(format!(
                "system tag '{}' cannot change type",
                self.name
            )));
        }
        self.tag_type = tag_type;
        self.touch();
        Ok(())
    }

    pub fn set_priority(&mut self, priority: TagPriority) {
        self.priority = priority;
        self.touch();
    }

    /// Place the tag under `parent` (or make it a root tag).
    pub fn set_parent(&mut self, parent: Option<&Tag>) -> Result<()> {
        if let Some(p) = parent {
            if p.id == self.id {
                return Err(FolioError::invalid(FieldError::new(
                    "parent_id",
                    "a tag cannot be its own parent",
                    validation::INVALID_REFERENCE,
                )));
            }
        }
        self.parent_id = parent.map(|p| p.id.clone());
        self.touch();
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.status = TagStatus::Inactive;
        self.touch();
    }

    pub fn activate(&mut self) {
        self.status = TagStatus::Active;
        self.touch();
    }

    /// Count one more assignment made at `at`.
    pub fn record_use(&mut self, at: DateTime<Utc>) {
        self.usage_count += 1;
        self.last_used_at = Some(at);
    }

    /// Count one assignment fewer, never going below zero.
    pub fn release_use(&mut self) {
        self.usage_count = (self.usage_count - 1).max(0);
    }

    /// Apply the non-hierarchical part of a patch through the mutators.
    ///
    /// `parent_id` needs the parent's current state and goes through
    /// [`Tag::set_parent`].
    pub fn apply(&mut self, update: &TagUpdate) -> Result<()> {
        if let Some(tag_type) = update.tag_type {
            self.set_tag_type(tag_type)?;
        }
        if let Some(ref name) = update.name {
            self.set_name(name.clone());
        }
        if let Some(ref description) = update.description {
            self.set_description(description.clone());
        }
        if let Some(ref color) = update.color {
            self.set_color(color.clone());
        }
        if let Some(priority) = update.priority {
            self.set_priority(priority);
        }
        Ok(())
    }

    /// Check every field rule, returning all violations.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut v = Validator::new();
        v.text("name", &self.name, 1, MAX_TAG_NAME_LENGTH)
            .optional_text(
                "description",
                self.description.as_deref(),
                MAX_TAG_DESCRIPTION_LENGTH,
            )
            .check(self.color.validate("color"))
            .range("usage_count", self.usage_count, 0, i64::MAX);

        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            v.push(FieldError::new(
                "parent_id",
                "a tag cannot be its own parent",
                validation::INVALID_REFERENCE,
            ));
        }
        v.finish()
    }
}

/// Data for creating a new tag.
#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub description: Option<String>,
    pub color: Color,
    pub tag_type: TagType,
    pub priority: TagPriority,
    pub parent_id: Option<String>,
}

impl NewTag {
    /// Create a new user tag; the color is required.
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            description: None,
            color,
            tag_type: TagType::User,
            priority: TagPriority::Normal,
            parent_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_type(mut self, tag_type: TagType) -> Self {
        self.tag_type = tag_type;
        self
    }

    pub fn with_priority(mut self, priority: TagPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Patch for updating a tag.
#[derive(Debug, Clone, Default)]
pub struct TagUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<Color>,
    pub tag_type: Option<TagType>,
    pub priority: Option<TagPriority>,
    /// New parent tag (`Some(None)` makes it a root tag).
    pub parent_id: Option<Option<String>>,
}

impl TagUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: Option<impl Into<String>>) -> Self {
        self.description = Some(description.map(|s| s.into()));
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn tag_type(mut self, tag_type: TagType) -> Self {
        self.tag_type = Some(tag_type);
        self
    }

    pub fn priority(mut self, priority: TagPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn parent_id(mut self, parent_id: Option<impl Into<String>>) -> Self {
        self.parent_id = Some(parent_id.map(|s| s.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.tag_type.is_none()
            && self.priority.is_none()
            && self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag::create(NewTag::new(name, Color::new("#ff0000")))
    }

    #[test]
    fn test_create_defaults() {
        let tag = tag("  Work ");
        assert_eq!(tag.name(), "Work");
        assert_eq!(tag.tag_type(), TagType::User);
        assert_eq!(tag.priority(), TagPriority::Normal);
        assert!(tag.is_active());
        assert_eq!(tag.usage_count(), 0);
        assert!(tag.last_used_at().is_none());
        assert!(tag.validate().is_empty());
    }

    #[test]
    fn test_name_bounds() {
        let mut t = tag("x");
        t.set_name("a".repeat(MAX_TAG_NAME_LENGTH));
        assert!(t.validate().is_empty());

        t.set_name("a".repeat(MAX_TAG_NAME_LENGTH + 1));
        assert_eq!(t.validate()[0].code, validation::TOO_LONG);

        t.set_name("   ");
        assert_eq!(t.validate()[0].code, validation::REQUIRED);
    }

    #[test]
    fn test_description_and_color_rules() {
        let mut t = tag("Work");
        t.set_description(Some("d".repeat(MAX_TAG_DESCRIPTION_LENGTH + 1)));
        t.set_color(Color::new("blue"));
        let errors = t.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.field == "description"));
        assert!(errors.iter().any(|e| e.field == "color"));
    }

    #[test]
    fn test_parent_self_reference_fails() {
        let mut t = tag("Work");
        let copy = t.clone();
        assert!(matches!(
            t.set_parent(Some(&copy)),
            Err(FolioError::ValidationFailed(_))
        ));

        let parent = tag("Projects");
        t.set_parent(Some(&parent)).unwrap();
        assert_eq!(t.parent_id(), Some(parent.id()));
        t.set_parent(None).unwrap();
        assert!(t.parent_id().is_none());
    }

    #[test]
    fn test_usage_never_negative() {
        let mut t = tag("Work");
        let now = Utc::now();
        t.record_use(now);
        assert_eq!(t.usage_count(), 1);
        assert_eq!(t.last_used_at(), Some(now));
        t.release_use();
        t.release_use();
        assert_eq!(t.usage_count(), 0);
    }

    #[test]
    fn test_deactivate_activate() {
        let mut t = tag("Work");
        t.deactivate();
        assert_eq!(t.status(), TagStatus::Inactive);
        t.activate();
        assert!(t.is_active());
    }

    #[test]
    fn test_apply_update() {
        let mut t = tag("Work");
        let update = TagUpdate::new()
            .name("Job")
            .priority(TagPriority::High)
            .description(Some("paid work"));
        t.apply(&update).unwrap();
        assert_eq!(t.name(), "Job");
        assert_eq!(t.priority(), TagPriority::High);
        assert_eq!(t.description(), Some("paid work"));
        assert!(TagUpdate::new().is_empty());
    }

    #[test]
    fn test_system_tag_keeps_type() {
        let mut t = tag("Important");
        t.set_tag_type(TagType::System).unwrap();
        assert!(matches!(
            t.apply(&TagUpdate::new().tag_type(TagType::User).name("Other")),
            Err(FolioError::InvalidState(_))
        ));
        assert!(t.is_system());
        assert_eq!(t.name(), "Important");
        t.set_tag_type(TagType::System).unwrap();
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("system".parse::<TagType>().unwrap(), TagType::System);
        assert_eq!("Critical".parse::<TagPriority>().unwrap(), TagPriority::Critical);
        assert!(TagPriority::Critical > TagPriority::Low);
        assert!("urgent".parse::<TagPriority>().is_err());
    }
}
