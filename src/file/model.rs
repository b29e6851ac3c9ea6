//! File entity for Folio.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DEFAULT_MAX_FILE_SIZE, MAX_DESCRIPTION_LENGTH, MAX_FILENAME_LENGTH, MAX_URL_LENGTH};
use crate::folder::{compute_path, Folder, PATH_SEPARATOR};
use crate::types::{new_id, Color, Visibility};
use crate::validation::{self, FieldError, Validator};
use crate::{FolioError, Result};

/// Lifecycle state of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    #[default]
    Active,
    Archived,
    Deleted,
    /// Content is still being ingested.
    Processing,
}

impl FileStatus {
    /// Convert status to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Active => "active",
            FileStatus::Archived => "archived",
            FileStatus::Deleted => "deleted",
            FileStatus::Processing => "processing",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(FileStatus::Active),
            "archived" => Ok(FileStatus::Archived),
            "deleted" => Ok(FileStatus::Deleted),
            "processing" => Ok(FileStatus::Processing),
            _ => Err(format!("unknown file status: {s}")),
        }
    }
}

/// Broad content category, derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    #[default]
    Other,
}

const EXTENSION_TABLE: &[(FileCategory, &[&str])] = &[
    (
        FileCategory::Image,
        &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "tiff", "ico", "heic"],
    ),
    (
        FileCategory::Video,
        &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v"],
    ),
    (
        FileCategory::Audio,
        &["mp3", "wav", "flac", "aac", "ogg", "m4a", "wma"],
    ),
    (
        FileCategory::Document,
        &[
            "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "md", "rtf", "odt", "csv",
        ],
    ),
    (
        FileCategory::Archive,
        &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"],
    ),
];

impl FileCategory {
    /// Look up the category of a lowercase extension without the dot.
    pub fn from_extension(extension: &str) -> Self {
        EXTENSION_TABLE
            .iter()
            .find(|(_, extensions)| extensions.contains(&extension))
            .map(|(category, _)| *category)
            .unwrap_or(FileCategory::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Document => "document",
            FileCategory::Archive => "archive",
            FileCategory::Other => "other",
        }
    }
}

impl FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(FileCategory::Image),
            "video" => Ok(FileCategory::Video),
            "audio" => Ok(FileCategory::Audio),
            "document" => Ok(FileCategory::Document),
            "archive" => Ok(FileCategory::Archive),
            "other" => Ok(FileCategory::Other),
            _ => Err(format!("unknown file category: {s}")),
        }
    }
}

/// Lowercase extension of a file name, without the dot.
///
/// Hidden files such as `.bashrc` and names ending in a dot have none.
pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
}

/// Dimensions and running time of a video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

/// Running time and encoding of an audio track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AudioMetadata {
    pub duration_secs: f64,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
}

/// Content metadata of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileMetadata {
    /// Size in bytes.
    pub size: u64,
    pub mime_type: Option<String>,
    pub checksum: Option<String>,
    pub image: Option<ImageMetadata>,
    pub video: Option<VideoMetadata>,
    pub audio: Option<AudioMetadata>,
}

impl FileMetadata {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_image(mut self, width: u32, height: u32) -> Self {
        self.image = Some(ImageMetadata { width, height });
        self
    }

    pub fn with_video(mut self, width: u32, height: u32, duration_secs: f64) -> Self {
        self.video = Some(VideoMetadata {
            width,
            height,
            duration_secs,
        });
        self
    }

    pub fn with_audio(mut self, audio: AudioMetadata) -> Self {
        self.audio = Some(audio);
        self
    }

    fn validate(&self, max_size: u64, v: &mut Validator) {
        if self.size > max_size {
            v.push(FieldError::new(
                "metadata.size",
                format!("file size must be at most {max_size} bytes"),
                validation::OUT_OF_RANGE,
            ));
        }
        if let Some(ref mime_type) = self.mime_type {
            if !mime_type.contains('/') {
                v.push(FieldError::new(
                    "metadata.mime_type",
                    "mime type must look like type/subtype",
                    validation::INVALID_FORMAT,
                ));
            }
        }
        if let Some(image) = self.image {
            if image.width == 0 || image.height == 0 {
                v.push(FieldError::new(
                    "metadata.image",
                    "image dimensions must be positive",
                    validation::OUT_OF_RANGE,
                ));
            }
        }
        if let Some(video) = self.video {
            if video.width == 0 || video.height == 0 || !(video.duration_secs >= 0.0) {
                v.push(FieldError::new(
                    "metadata.video",
                    "video dimensions must be positive and duration non-negative",
                    validation::OUT_OF_RANGE,
                ));
            }
        }
        if let Some(audio) = self.audio {
            if !(audio.duration_secs >= 0.0) {
                v.push(FieldError::new(
                    "metadata.audio",
                    "audio duration must be non-negative",
                    validation::OUT_OF_RANGE,
                ));
            }
        }
    }
}

/// A file stored in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    pub(crate) id: String,
    pub(crate) name: String,
    /// Name the file was first created with.
    pub(crate) original_name: String,
    pub(crate) extension: String,
    pub(crate) category: FileCategory,
    pub(crate) description: Option<String>,
    pub(crate) folder_id: Option<String>,
    pub(crate) path: String,
    pub(crate) status: FileStatus,
    pub(crate) visibility: Visibility,
    pub(crate) metadata: FileMetadata,
    pub(crate) color: Option<Color>,
    pub(crate) tag_ids: Vec<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) last_accessed_at: Option<DateTime<Utc>>,
    pub(crate) archived_at: Option<DateTime<Utc>>,
    /// Locator of the content in external storage.
    pub(crate) storage_url: Option<String>,
    pub(crate) thumbnail_url: Option<String>,
}

impl File {
    /// Build a new file from a creation request.
    ///
    /// `folder` must be the current state of the folder named by
    /// `new.folder_id`; the path is derived from it.
    pub fn create(new: NewFile, folder: Option<&Folder>) -> Result<Self> {
        let folder_matches = match (&new.folder_id, folder) {
            (None, None) => true,
            (Some(id), Some(f)) => id == f.id(),
            _ => false,
        };
        if !folder_matches {
            return Err(FolioError::invalid(FieldError::new(
                "folder_id",
                "folder does not match the requested folder_id",
                validation::INVALID_REFERENCE,
            )));
        }

        let now = Utc::now();
        let name = new.name.trim().to_string();
        let extension = extension_of(&name);
        let mut tag_ids: Vec<String> = Vec::with_capacity(new.tag_ids.len());
        for id in new.tag_ids {
            if !tag_ids.contains(&id) {
                tag_ids.push(id);
            }
        }

        Ok(Self {
            id: new_id(),
            original_name: validation::normalize_optional(new.original_name)
                .unwrap_or_else(|| name.clone()),
            category: FileCategory::from_extension(&extension),
            extension,
            path: compute_path(folder.map(|f| f.path()), &name),
            name,
            description: validation::normalize_optional(new.description),
            folder_id: new.folder_id,
            status: new.status,
            visibility: new.visibility,
            metadata: new.metadata,
            color: new.color,
            tag_ids,
            created_at: now,
            updated_at: now,
            last_accessed_at: None,
            archived_at: None,
            storage_url: validation::normalize_optional(new.storage_url),
            thumbnail_url: validation::normalize_optional(new.thumbnail_url),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn category(&self) -> FileCategory {
        self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    pub fn color(&self) -> Option<&Color> {
        self.color.as_ref()
    }

    pub fn tag_ids(&self) -> &[String] {
        &self.tag_ids
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

    pub fn storage_url(&self) -> Option<&str> {
        self.storage_url.as_deref()
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail_url.as_deref()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Path of the containing folder, derived from this file's own path.
    fn folder_path(&self) -> Option<&str> {
        self.folder_id.as_ref()?;
        self.path.rsplit_once(PATH_SEPARATOR).map(|(parent, _)| parent)
    }

    /// Rename the file; extension and category follow the new name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into().trim().to_string();
        let folder_path = self.folder_path().map(str::to_string);
        self.path = compute_path(folder_path.as_deref(), &name);
        self.extension = extension_of(&name);
        self.category = FileCategory::from_extension(&self.extension);
        self.name = name;
        self.touch();
    }

    /// Move the file into `folder` (or out of any folder).
    pub fn move_to(&mut self, folder: Option<&Folder>) {
        self.folder_id = folder.map(|f| f.id().to_string());
        self.path = compute_path(folder.map(|f| f.path()), &self.name);
        self.touch();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = validation::normalize_optional(description);
        self.touch();
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        self.touch();
    }

    pub fn set_color(&mut self, color: Option<Color>) {
        self.color = color;
        self.touch();
    }

    pub fn set_metadata(&mut self, metadata: FileMetadata) {
        self.metadata = metadata;
        self.touch();
    }

    pub fn set_storage_url(&mut self, storage_url: Option<String>) {
        self.storage_url = validation::normalize_optional(storage_url);
        self.touch();
    }

    pub fn set_thumbnail_url(&mut self, thumbnail_url: Option<String>) {
        self.thumbnail_url = validation::normalize_optional(thumbnail_url);
        self.touch();
    }

    pub fn archive(&mut self) {
        self.status = FileStatus::Archived;
        self.archived_at = Some(Utc::now());
        self.touch();
    }

    pub fn restore(&mut self) {
        self.status = FileStatus::Active;
        self.archived_at = None;
        self.touch();
    }

    pub fn mark_processing(&mut self) {
        self.status = FileStatus::Processing;
        self.touch();
    }

    pub fn mark_deleted(&mut self) {
        self.status = FileStatus::Deleted;
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
        self.tag_ids = tag_ids;
    }

    /// Apply everything but `folder_id`, which needs the target folder and
    /// goes through [`File::move_to`].
    pub fn apply(&mut self, update: &FileUpdate) {
        if let Some(ref name) = update.name {
            self.set_name(name.clone());
        }
        if let Some(ref description) = update.description {
            self.set_description(description.clone());
        }
        if let Some(visibility) = update.visibility {
            self.set_visibility(visibility);
        }
        if let Some(ref color) = update.color {
            self.set_color(color.clone());
        }
        if let Some(ref metadata) = update.metadata {
            self.set_metadata(metadata.clone());
        }
        if let Some(ref storage_url) = update.storage_url {
            self.set_storage_url(storage_url.clone());
        }
        if let Some(ref thumbnail_url) = update.thumbnail_url {
            self.set_thumbnail_url(thumbnail_url.clone());
        }
        match update.status {
            Some(FileStatus::Active) => self.restore(),
            Some(FileStatus::Archived) => self.archive(),
            Some(FileStatus::Deleted) => self.mark_deleted(),
            Some(FileStatus::Processing) => self.mark_processing(),
            None => {}
        }
    }

    /// Check every field rule against the default size limit.
    pub fn validate(&self) -> Vec<FieldError> {
        self.validate_with_limit(DEFAULT_MAX_FILE_SIZE)
    }

    /// Check every field rule, with `max_size` bytes as the size limit.
    pub fn validate_with_limit(&self, max_size: u64) -> Vec<FieldError> {
        let mut v = Validator::new();
        v.text("name", &self.name, 1, MAX_FILENAME_LENGTH)
            .check(validation::path_segment("name", &self.name))
            .text("original_name", &self.original_name, 1, MAX_FILENAME_LENGTH)
            .optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LENGTH)
            .optional_text("storage_url", self.storage_url.as_deref(), MAX_URL_LENGTH)
            .optional_text("thumbnail_url", self.thumbnail_url.as_deref(), MAX_URL_LENGTH);

        if let Some(ref color) = self.color {
            v.check(color.validate("color"));
        }
        self.metadata.validate(max_size, &mut v);
        v.finish()
    }
}

/// Data for creating a new file.
#[derive(Debug, Clone, Default)]
pub struct NewFile {
    pub name: String,
    /// Defaults to `name`.
    pub original_name: Option<String>,
    pub description: Option<String>,
    pub folder_id: Option<String>,
    pub status: FileStatus,
    pub visibility: Visibility,
    pub metadata: FileMetadata,
    pub color: Option<Color>,
    pub tag_ids: Vec<String>,
    pub storage_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl NewFile {
    /// Create a new NewFile with the given name and size in bytes.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            metadata: FileMetadata::new(size),
            ..Default::default()
        }
    }

    /// Set the containing folder.
    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_original_name(mut self, original_name: impl Into<String>) -> Self {
        self.original_name = Some(original_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_metadata(mut self, metadata: FileMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<String>) -> Self {
        self.tag_ids = tag_ids;
        self
    }

    pub fn with_storage_url(mut self, storage_url: impl Into<String>) -> Self {
        self.storage_url = Some(storage_url.into());
        self
    }

    pub fn with_thumbnail_url(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }

    /// Create the file in the `Processing` state.
    pub fn processing(mut self) -> Self {
        self.status = FileStatus::Processing;
        self
    }
}

/// Patch for updating a file.
#[derive(Debug, Clone, Default)]
pub struct FileUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    /// New folder (`Some(None)` takes the file out of any folder).
    pub folder_id: Option<Option<String>>,
    pub visibility: Option<Visibility>,
    pub color: Option<Option<Color>>,
    pub metadata: Option<FileMetadata>,
    pub status: Option<FileStatus>,
    pub storage_url: Option<Option<String>>,
    pub thumbnail_url: Option<Option<String>>,
}

impl FileUpdate {
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

    pub fn folder_id(mut self, folder_id: Option<impl Into<String>>) -> Self {
        self.folder_id = Some(folder_id.map(|s| s.into()));
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

    pub fn metadata(mut self, metadata: FileMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn status(mut self, status: FileStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn storage_url(mut self, storage_url: Option<impl Into<String>>) -> Self {
        self.storage_url = Some(storage_url.map(|s| s.into()));
        self
    }

    pub fn thumbnail_url(mut self, thumbnail_url: Option<impl Into<String>>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.map(|s| s.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.folder_id.is_none()
            && self.visibility.is_none()
            && self.color.is_none()
            && self.metadata.is_none()
            && self.status.is_none()
            && self.storage_url.is_none()
            && self.thumbnail_url.is_none()
    }

    /// True when the patch changes name or folder, i.e. the stored path.
    pub fn is_structural(&self) -> bool {
        self.name.is_some() || self.folder_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folder::NewFolder;

    fn folder(name: &str) -> Folder {
        Folder::create(NewFolder::new(name), None).unwrap()
    }

    #[test]
    fn test_extension_and_category() {
        assert_eq!(extension_of("a.PDF"), "pdf");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".bashrc"), "");
        assert_eq!(extension_of("odd."), "");

        assert_eq!(FileCategory::from_extension("jpeg"), FileCategory::Image);
        assert_eq!(FileCategory::from_extension("mkv"), FileCategory::Video);
        assert_eq!(FileCategory::from_extension("flac"), FileCategory::Audio);
        assert_eq!(FileCategory::from_extension("pdf"), FileCategory::Document);
        assert_eq!(FileCategory::from_extension("7z"), FileCategory::Archive);
        assert_eq!(FileCategory::from_extension("exe"), FileCategory::Other);
        assert_eq!(FileCategory::from_extension(""), FileCategory::Other);
    }

    #[test]
    fn test_create_in_folder() {
        let docs = folder("Docs");
        let file = File::create(NewFile::new(" a.pdf ", 1024).in_folder(docs.id()), Some(&docs))
            .unwrap();

        assert_eq!(file.name(), "a.pdf");
        assert_eq!(file.original_name(), "a.pdf");
        assert_eq!(file.extension(), "pdf");
        assert_eq!(file.category(), FileCategory::Document);
        assert_eq!(file.path(), "Docs/a.pdf");
        assert_eq!(file.size(), 1024);
        assert_eq!(file.status(), FileStatus::Active);
        assert!(file.validate().is_empty());
    }

    #[test]
    fn test_create_with_mismatched_folder_fails() {
        let docs = folder("Docs");
        assert!(matches!(
            File::create(NewFile::new("a.pdf", 1).in_folder("other"), Some(&docs)),
            Err(FolioError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_rename_updates_derived_fields() {
        let docs = folder("Docs");
        let mut file =
            File::create(NewFile::new("a.pdf", 1).in_folder(docs.id()), Some(&docs)).unwrap();

        file.set_name("photo.PNG");
        assert_eq!(file.path(), "Docs/photo.PNG");
        assert_eq!(file.extension(), "png");
        assert_eq!(file.category(), FileCategory::Image);
        assert_eq!(file.original_name(), "a.pdf");
    }

    #[test]
    fn test_move_to() {
        let docs = folder("Docs");
        let media = folder("Media");
        let mut file =
            File::create(NewFile::new("a.pdf", 1).in_folder(docs.id()), Some(&docs)).unwrap();

        file.move_to(Some(&media));
        assert_eq!(file.folder_id(), Some(media.id()));
        assert_eq!(file.path(), "Media/a.pdf");

        file.move_to(None);
        assert_eq!(file.path(), "a.pdf");
        file.set_name("b.pdf");
        assert_eq!(file.path(), "b.pdf");
    }

    #[test]
    fn test_size_limit() {
        let file = File::create(NewFile::new("big.iso", 2048), None).unwrap();
        assert!(file.validate_with_limit(4096).is_empty());

        let errors = file.validate_with_limit(1024);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "metadata.size");
        assert_eq!(errors[0].code, validation::OUT_OF_RANGE);
    }

    #[test]
    fn test_metadata_groups_are_checked() {
        let metadata = FileMetadata::new(10)
            .with_mime_type("image")
            .with_image(0, 10)
            .with_audio(AudioMetadata {
                duration_secs: -1.0,
                bitrate: None,
                sample_rate: Some(44_100),
            });
        let file = File::create(NewFile::new("x.png", 10).with_metadata(metadata), None).unwrap();

        let fields: Vec<String> = file.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["metadata.mime_type", "metadata.image", "metadata.audio"]
        );
    }

    #[test]
    fn test_name_rules() {
        let mut file = File::create(NewFile::new("a.pdf", 1), None).unwrap();
        file.set_name("dir/a.pdf");
        assert_eq!(file.validate()[0].code, validation::INVALID_CHARACTERS);
        file.set_name("x".repeat(MAX_FILENAME_LENGTH + 1));
        assert_eq!(file.validate()[0].code, validation::TOO_LONG);
    }

    #[test]
    fn test_status_transitions() {
        let mut file = File::create(NewFile::new("a.pdf", 1).processing(), None).unwrap();
        assert_eq!(file.status(), FileStatus::Processing);
        file.archive();
        assert!(file.archived_at().is_some());
        file.restore();
        assert_eq!(file.status(), FileStatus::Active);
        assert!(file.archived_at().is_none());
        file.mark_deleted();
        assert_eq!(file.status(), FileStatus::Deleted);
    }

    #[test]
    fn test_apply_update() {
        let mut file = File::create(NewFile::new("a.pdf", 1), None).unwrap();
        let update = FileUpdate::new()
            .description(Some("scan"))
            .storage_url(Some("s3://bucket/a.pdf"))
            .status(FileStatus::Archived);
        file.apply(&update);

        assert_eq!(file.description(), Some("scan"));
        assert_eq!(file.storage_url(), Some("s3://bucket/a.pdf"));
        assert_eq!(file.status(), FileStatus::Archived);
        assert!(!update.is_structural());
        assert!(FileUpdate::new().is_empty());
    }
}
