//! Folder entity for Folio.
//!
//! A folder owns its derived `path` and `level`. Mutators that touch the name
//! or the parent recompute both from the parent the caller passes in, so the
//! caller must always hand over the parent's current state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{MAX_DESCRIPTION_LENGTH, MAX_FOLDER_NAME_LENGTH, MAX_ICON_LENGTH};
use crate::query::SortDirection;
use crate::types::{new_id, Color, Visibility};
use crate::validation::{self, FieldError, Validator};
use crate::{FolioError, Result};

/// Path separator between ancestor names.
pub const PATH_SEPARATOR: char = '/';

/// Compute the path of an entity named `name` under a parent path.
pub fn compute_path(parent_path: Option<&str>, name: &str) -> String {
    match parent_path {
        Some(parent) => format!("{parent}{PATH_SEPARATOR}{name}"),
        None => name.to_string(),
    }
}

/// Level of a folder placed under `parent` (0 at the root).
pub fn compute_level(parent: Option<&Folder>) -> i64 {
    parent.map(|p| p.level + 1).unwrap_or(0)
}

/// Lifecycle state of a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderStatus {
    #[default]
    Active,
    Archived,
    Deleted,
}

impl FolderStatus {
    /// Convert status to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FolderStatus::Active => "active",
            FolderStatus::Archived => "archived",
            FolderStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for FolderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FolderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(FolderStatus::Active),
            "archived" => Ok(FolderStatus::Archived),
            "deleted" => Ok(FolderStatus::Deleted),
            _ => Err(format!("unknown folder status: {s}")),
        }
    }
}

/// Kind of folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    #[default]
    Regular,
    System,
    Shared,
    Favorite,
}

impl FolderType {
    /// Convert folder type to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FolderType::Regular => "regular",
            FolderType::System => "system",
            FolderType::Shared => "shared",
            FolderType::Favorite => "favorite",
        }
    }
}

impl fmt::Display for FolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FolderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" => Ok(FolderType::Regular),
            "system" => Ok(FolderType::System),
            "shared" => Ok(FolderType::Shared),
            "favorite" => Ok(FolderType::Favorite),
            _ => Err(format!("unknown folder type: {s}")),
        }
    }
}

/// Field a folder listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    CreatedAt,
    UpdatedAt,
    Size,
    Type,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Size => "size",
            SortField::Type => "type",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(SortField::Name),
            "created_at" => Some(SortField::CreatedAt),
            "updated_at" => Some(SortField::UpdatedAt),
            "size" => Some(SortField::Size),
            "type" => Some(SortField::Type),
            _ => None,
        }
    }
}

/// How a folder's content is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
    Details,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Grid => "grid",
            ViewMode::Details => "details",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(ViewMode::List),
            "grid" => Some(ViewMode::Grid),
            "details" => Some(ViewMode::Details),
            _ => None,
        }
    }
}

/// Per-folder display preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ViewSettings {
    pub sort_by: SortField,
    pub sort_direction: SortDirection,
    pub view_mode: ViewMode,
    pub show_hidden: bool,
}

/// A folder in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Folder {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) parent_id: Option<String>,
    pub(crate) path: String,
    pub(crate) level: i64,
    pub(crate) status: FolderStatus,
    pub(crate) folder_type: FolderType,
    pub(crate) visibility: Visibility,
    pub(crate) color: Option<Color>,
    pub(crate) icon: Option<String>,
    pub(crate) tag_ids: Vec<String>,
    pub(crate) view_settings: ViewSettings,
    pub(crate) is_favorite: bool,
    pub(crate) is_protected: bool,
    pub(crate) is_system_folder: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) last_accessed_at: Option<DateTime<Utc>>,
    pub(crate) archived_at: Option<DateTime<Utc>>,
}

impl Folder {
    /// Build a new folder from a creation request.
    ///
    /// `parent` must be the current state of the folder named by
    /// `new.parent_id`; path and level are derived from it.
    pub fn create(new: NewFolder, parent: Option<&Folder>) -> Result<Self> {
        let parent_matches = match (&new.parent_id, parent) {
            (None, None) => true,
            (Some(id), Some(p)) => *id == p.id,
            _ => false,
        };
        if !parent_matches {
            return Err(FolioError::invalid(FieldError::new(
                "parent_id",
                "parent folder does not match the requested parent_id",
                validation::INVALID_REFERENCE,
            )));
        }

        let now = Utc::now();
        let name = new.name.trim().to_string();
        let is_system_folder = new.is_system_folder || new.folder_type == FolderType::System;

        Ok(Self {
            id: new_id(),
            path: compute_path(parent.map(|p| p.path.as_str()), &name),
            level: compute_level(parent),
            name,
            description: validation::normalize_optional(new.description),
            parent_id: new.parent_id,
            status: FolderStatus::Active,
            folder_type: new.folder_type,
            visibility: new.visibility,
            color: new.color,
            icon: validation::normalize_optional(new.icon),
            tag_ids: dedup(new.tag_ids),
            view_settings: new.view_settings,
            is_favorite: new.is_favorite || new.folder_type == FolderType::Favorite,
            is_protected: new.is_protected || is_system_folder,
            is_system_folder,
            created_at: now,
            updated_at: now,
            last_accessed_at: None,
            archived_at: None,
        })
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

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn level(&self) -> i64 {
        self.level
    }

    pub fn status(&self) -> FolderStatus {
        self.status
    }

    pub fn folder_type(&self) -> FolderType {
        self.folder_type
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn color(&self) -> Option<&Color> {
        self.color.as_ref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn tag_ids(&self) -> &[String] {
        &self.tag_ids
    }

    pub fn view_settings(&self) -> &ViewSettings {
        &self.view_settings
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    pub fn is_protected(&self) -> bool {
        self.is_protected
    }

    pub fn is_system_folder(&self) -> bool {
        self.is_system_folder
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_accessed_at(&self) -> Option<DateTime<Utc>> {
        self.last_accessed_at
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Deletion is refused for protected and system folders.
    pub fn is_deletable(&self) -> bool {
        !(self.is_protected || self.is_system_folder)
    }

    /// Path of the parent, derived from this folder's own path.
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once(PATH_SEPARATOR).map(|(parent, _)| parent)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Rename the folder, keeping it under the same parent.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into().trim().to_string();
        let parent_path = self.parent_path().map(str::to_string);
        self.path = compute_path(parent_path.as_deref(), &name);
        self.name = name;
        self.touch();
    }

    /// Re-parent the folder under `parent` (or to the root).
    pub fn move_to(&mut self, parent: Option<&Folder>) -> Result<()> {
        if let Some(p) = parent {
            if p.id == self.id {
                return Err(FolioError::invalid(FieldError::new(
                    "parent_id",
                    "a folder cannot be its own parent",
                    validation::INVALID_REFERENCE,
                )));
            }
        }

        self.parent_id = parent.map(|p| p.id.clone());
        self.level = compute_level(parent);
        self.path = compute_path(parent.map(|p| p.path.as_str()), &self.name);
        self.touch();
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = validation::normalize_optional(description);
        self.touch();
    }

    pub fn set_color(&mut self, color: Option<Color>) {
        self.color = color;
        self.touch();
    }

    pub fn set_icon(&mut self, icon: Option<String>) {
        self.icon = validation::normalize_optional(icon);
        self.touch();
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        self.touch();
    }

    pub fn set_folder_type(&mut self, folder_type: FolderType) {
        self.folder_type = folder_type;
        if folder_type == FolderType::System {
            self.is_system_folder = true;
            self.is_protected = true;
        }
        self.touch();
    }

    pub fn set_view_settings(&mut self, view_settings: ViewSettings) {
        self.view_settings = view_settings;
        self.touch();
    }

    pub fn set_favorite(&mut self, is_favorite: bool) {
        self.is_favorite = is_favorite;
        self.touch();
    }

    /// Set the protection flag; a system folder cannot be unprotected.
    pub fn set_protected(&mut self, is_protected: bool) -> Result<()> {
        if !is_protected && self.is_system_folder {
            return Err(FolioError::InvalidState(format!(
                "system folder '{}' cannot be unprotected",
                self.name
            )));
        }
        self.is_protected = is_protected;
        self.touch();
        Ok(())
    }

    pub fn archive(&mut self) {
        self.status = FolderStatus::Archived;
        self.archived_at = Some(Utc::now());
        self.touch();
    }

    pub fn restore(&mut self) {
        self.status = FolderStatus::Active;
        self.archived_at = None;
        self.touch();
    }

    pub fn mark_deleted(&mut self) {
        self.status = FolderStatus::Deleted;
        self.touch();
    }

    pub fn touch_accessed(&mut self) {
        self.last_accessed_at = Some(Utc::now());
    }

    /// Add a tag id to the in-memory set. Returns false if it was present.
    pub fn add_tag(&mut self, tag_id: impl Into<String>) -> bool {
        let tag_id = tag_id.into();
        if self.tag_ids.contains(&tag_id) {
            return false;
        }
        self.tag_ids.push(tag_id);
        self.touch();
        true
    }

    pub fn remove_tag(&mut self, tag_id: &str) -> bool {
        let before = self.tag_ids.len();
        self.tag_ids.retain(|t| t != tag_id);
        let removed = self.tag_ids.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub(crate) fn set_tag_ids(&mut self, tag_ids: Vec<String>) {
        self.tag_ids = dedup(tag_ids);
    }

    /// Apply the non-structural part of a patch through the mutators.
    ///
    /// `parent_id` is not handled here: a move needs the parent's current
    /// state and goes through [`Folder::move_to`].
    pub fn apply(&mut self, update: &FolderUpdate) -> Result<()> {
        if update.status == Some(FolderStatus::Deleted) {
            return Err(FolioError::InvalidState(format!(
                "folder '{}' cannot be deleted by a patch",
                self.name
            )));
        }
        if let Some(ref name) = update.name {
            self.set_name(name.clone());
        }
        if let Some(ref description) = update.description {
            self.set_description(description.clone());
        }
        if let Some(folder_type) = update.folder_type {
            self.set_folder_type(folder_type);
        }
        if let Some(visibility) = update.visibility {
            self.set_visibility(visibility);
        }
        if let Some(ref color) = update.color {
            self.set_color(color.clone());
        }
        if let Some(ref icon) = update.icon {
            self.set_icon(icon.clone());
        }
        if let Some(view_settings) = update.view_settings {
            self.set_view_settings(view_settings);
        }
        if let Some(is_favorite) = update.is_favorite {
            self.set_favorite(is_favorite);
        }
        if let Some(is_protected) = update.is_protected {
            self.set_protected(is_protected)?;
        }
        match update.status {
            Some(FolderStatus::Active) => self.restore(),
            Some(FolderStatus::Archived) => self.archive(),
            Some(FolderStatus::Deleted) | None => {}
        }
        Ok(())
    }

    /// Check every field rule, returning all violations.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut v = Validator::new();
        v.text("name", &self.name, 1, MAX_FOLDER_NAME_LENGTH)
            .check(validation::path_segment("name", &self.name))
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LENGTH)
            .optional_text("icon", self.icon.as_deref(), MAX_ICON_LENGTH)
            .range("level", self.level, 0, i64::MAX);

        if let Some(ref color) = self.color {
            v.check(color.validate("color"));
        }
        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            v.push(FieldError::new(
                "parent_id",
                "a folder cannot be its own parent",
                validation::INVALID_REFERENCE,
            ));
        }
        if self.parent_id.is_none() && self.level != 0 {
            v.push(FieldError::new(
                "level",
                "a root folder must have level 0",
                validation::OUT_OF_RANGE,
            ));
        }
        v.finish()
    }
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Data for creating a new folder.
#[derive(Debug, Clone, Default)]
pub struct NewFolder {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub folder_type: FolderType,
    pub visibility: Visibility,
    pub color: Option<Color>,
    pub icon: Option<String>,
    pub tag_ids: Vec<String>,
    pub view_settings: ViewSettings,
    pub is_favorite: bool,
    pub is_protected: bool,
    pub is_system_folder: bool,
}

impl NewFolder {
    /// Create a new NewFolder with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_type(mut self, folder_type: FolderType) -> Self {
        self.folder_type = folder_type;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the initial tag assignments.
    pub fn with_tags(mut self, tag_ids: Vec<String>) -> Self {
        self.tag_ids = tag_ids;
        self
    }

    pub fn with_view_settings(mut self, view_settings: ViewSettings) -> Self {
        self.view_settings = view_settings;
        self
    }

    pub fn favorite(mut self) -> Self {
        self.is_favorite = true;
        self
    }

    pub fn protected(mut self) -> Self {
        self.is_protected = true;
        self
    }

    /// Mark as a system folder (implies protected).
    pub fn system(mut self) -> Self {
        self.is_system_folder = true;
        self.is_protected = true;
        self
    }
}

/// Patch for updating a folder.
#[derive(Debug, Clone, Default)]
pub struct FolderUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    /// New parent folder (`Some(None)` moves to the root).
    pub parent_id: Option<Option<String>>,
    pub folder_type: Option<FolderType>,
    pub visibility: Option<Visibility>,
    pub color: Option<Option<Color>>,
    pub icon: Option<Option<String>>,
    pub view_settings: Option<ViewSettings>,
    pub is_favorite: Option<bool>,
    pub is_protected: Option<bool>,
    pub status: Option<FolderStatus>,
}

impl FolderUpdate {
    /// Create a new FolderUpdate.
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

    pub fn parent_id(mut self, parent_id: Option<impl Into<String>>) -> Self {
        self.parent_id = Some(parent_id.map(|s| s.into()));
        self
    }

    pub fn folder_type(mut self, folder_type: FolderType) -> Self {
        self.folder_type = Some(folder_type);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn color(mut self, color: Option<Color>) -> Self {
        self.color = Some(color);
        self
    }

    pub fn icon(mut self, icon: Option<impl Into<String>>) -> Self {
        self.icon = Some(icon.map(|s| s.into()));
        self
    }

    pub fn view_settings(mut self, view_settings: ViewSettings) -> Self {
        self.view_settings = Some(view_settings);
        self
    }

    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = Some(is_favorite);
        self
    }

    pub fn protected(mut self, is_protected: bool) -> Self {
        self.is_protected = Some(is_protected);
        self
    }

    pub fn status(mut self, status: FolderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.parent_id.is_none()
            && self.folder_type.is_none()
            && self.visibility.is_none()
            && self.color.is_none()
            && self.icon.is_none()
            && self.view_settings.is_none()
            && self.is_favorite.is_none()
            && self.is_protected.is_none()
            && self.status.is_none()
    }

    /// True when the patch changes name or parent, i.e. the stored path.
    pub fn is_structural(&self) -> bool {
        self.name.is_some() || self.parent_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(name: &str) -> Folder {
        Folder::create(NewFolder::new(name), None).unwrap()
    }

    fn child(name: &str, parent: &Folder) -> Folder {
        Folder::create(NewFolder::new(name).with_parent(parent.id()), Some(parent)).unwrap()
    }

    #[test]
    fn test_create_root_folder() {
        let folder = root("  Docs ");
        assert_eq!(folder.name(), "Docs");
        assert_eq!(folder.path(), "Docs");
        assert_eq!(folder.level(), 0);
        assert_eq!(folder.status(), FolderStatus::Active);
        assert!(folder.is_root());
        assert!(folder.validate().is_empty());
    }

    #[test]
    fn test_create_nested_folder() {
        let docs = root("Docs");
        let reports = child("Reports", &docs);
        let q1 = child("Q1", &reports);

        assert_eq!(reports.path(), "Docs/Reports");
        assert_eq!(reports.level(), 1);
        assert_eq!(q1.path(), "Docs/Reports/Q1");
        assert_eq!(q1.level(), 2);
        assert_eq!(q1.parent_path(), Some("Docs/Reports"));
    }

    #[test]
    fn test_create_with_mismatched_parent_fails() {
        let docs = root("Docs");
        let result = Folder::create(NewFolder::new("x").with_parent("other"), Some(&docs));
        assert!(matches!(result, Err(FolioError::ValidationFailed(_))));

        let result = Folder::create(NewFolder::new("x").with_parent("other"), None);
        assert!(matches!(result, Err(FolioError::ValidationFailed(_))));
    }

    #[test]
    fn test_system_type_implies_protection() {
        let folder = Folder::create(NewFolder::new("Trash").with_type(FolderType::System), None)
            .unwrap();
        assert!(folder.is_system_folder());
        assert!(folder.is_protected());
        assert!(!folder.is_deletable());
    }

    #[test]
    fn test_rename_recomputes_path() {
        let docs = root("Docs");
        let mut reports = child("Reports", &docs);
        let before = reports.updated_at();

        reports.set_name("Archive");
        assert_eq!(reports.path(), "Docs/Archive");
        assert_eq!(reports.level(), 1);
        assert!(reports.updated_at() >= before);
    }

    #[test]
    fn test_move_to_recomputes_path_and_level() {
        let docs = root("Docs");
        let media = root("Media");
        let mut reports = child("Reports", &docs);

        reports.move_to(Some(&media)).unwrap();
        assert_eq!(reports.parent_id(), Some(media.id()));
        assert_eq!(reports.path(), "Media/Reports");

        reports.move_to(None).unwrap();
        assert_eq!(reports.path(), "Reports");
        assert_eq!(reports.level(), 0);
        assert!(reports.is_root());
    }

    #[test]
    fn test_move_to_self_fails() {
        let mut docs = root("Docs");
        let copy = docs.clone();
        let result = docs.move_to(Some(&copy));
        match result {
            Err(FolioError::ValidationFailed(errors)) => {
                assert!(errors.has("parent_id", validation::INVALID_REFERENCE))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(docs.is_root());
    }

    #[test]
    fn test_unprotect_system_folder_fails() {
        let mut folder = root("System").clone();
        folder.set_folder_type(FolderType::System);
        assert!(matches!(
            folder.set_protected(false),
            Err(FolioError::InvalidState(_))
        ));

        let mut regular = root("Plain");
        regular.set_protected(true).unwrap();
        regular.set_protected(false).unwrap();
        assert!(!regular.is_protected());
    }

    #[test]
    fn test_validate_reports_all_errors() {
        let mut folder = root("Docs");
        folder.name = "a/b".to_string();
        folder.description = Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1));
        folder.color = Some(Color::new("red"));

        let errors = folder.validate();
        let codes: Vec<&str> = errors.iter().map(|e| e.code.as_str()).collect();
        assert!(codes.contains(&validation::INVALID_CHARACTERS));
        assert!(codes.contains(&validation::TOO_LONG));
        assert!(codes.contains(&validation::INVALID_FORMAT));
    }

    #[test]
    fn test_validate_blank_name() {
        let mut folder = root("Docs");
        folder.set_name("   ");
        let errors = folder.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, validation::REQUIRED);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = root("Docs");
        let mut copy = original.clone();
        copy.set_name("Other");
        copy.add_tag("t1");
        assert_eq!(original.name(), "Docs");
        assert!(original.tag_ids().is_empty());
    }

    #[test]
    fn test_tag_set_is_deduplicated() {
        let folder = Folder::create(
            NewFolder::new("Docs").with_tags(vec!["a".into(), "b".into(), "a".into()]),
            None,
        )
        .unwrap();
        assert_eq!(folder.tag_ids(), &["a".to_string(), "b".to_string()]);

        let mut folder = folder;
        assert!(!folder.add_tag("a"));
        assert!(folder.remove_tag("a"));
        assert!(!folder.remove_tag("a"));
    }

    #[test]
    fn test_archive_restore_delete() {
        let mut folder = root("Docs");
        folder.archive();
        assert_eq!(folder.status(), FolderStatus::Archived);
        assert!(folder.archived_at().is_some());
        folder.restore();
        assert_eq!(folder.status(), FolderStatus::Active);
        assert!(folder.archived_at().is_none());
        folder.mark_deleted();
        assert_eq!(folder.status(), FolderStatus::Deleted);
    }

    #[test]
    fn test_apply_update() {
        let mut folder = root("Docs");
        let update = FolderUpdate::new()
            .name("Papers")
            .description(Some("old scans"))
            .visibility(Visibility::Public)
            .favorite(true);
        folder.apply(&update).unwrap();

        assert_eq!(folder.name(), "Papers");
        assert_eq!(folder.path(), "Papers");
        assert_eq!(folder.description(), Some("old scans"));
        assert_eq!(folder.visibility(), Visibility::Public);
        assert!(folder.is_favorite());
        assert!(update.is_structural());
        assert!(FolderUpdate::new().is_empty());
    }

    #[test]
    fn test_apply_refuses_delete_status() {
        let mut folder = root("Docs");
        let result = folder.apply(&FolderUpdate::new().status(FolderStatus::Deleted));
        assert!(matches!(result, Err(FolioError::InvalidState(_))));
        assert_eq!(folder.status(), FolderStatus::Active);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("archived".parse::<FolderStatus>().unwrap(), FolderStatus::Archived);
        assert_eq!("SHARED".parse::<FolderType>().unwrap(), FolderType::Shared);
        assert!("bogus".parse::<FolderType>().is_err());
        assert_eq!(SortField::parse("updated_at"), Some(SortField::UpdatedAt));
        assert_eq!(ViewMode::parse("grid"), Some(ViewMode::Grid));
    }
}
