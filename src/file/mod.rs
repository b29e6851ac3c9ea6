//! Files for Folio.
//!
//! This module provides:
//! - The file entity with derived extension, category and path
//! - Content metadata (size, mime type, media dimensions and durations)
//! - Soft-deleting persistence with filtered reads
//! - A service enforcing folder existence, name uniqueness and size limits

mod model;
mod repository;
mod service;

pub use model::{
    extension_of, AudioMetadata, File, FileCategory, FileMetadata, FileStatus, FileUpdate,
    ImageMetadata, NewFile, VideoMetadata,
};
pub use repository::{FileFilter, FileRepository};
pub use service::FileService;

/// Maximum length for file names (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum length for file descriptions (in characters).
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Maximum length for storage and thumbnail URLs.
pub const MAX_URL_LENGTH: usize = 2048;

/// Default maximum file size (100 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
