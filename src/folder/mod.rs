//! Folder hierarchy for Folio.
//!
//! This module provides:
//! - The folder entity with derived path and level
//! - Cycle prevention and path cascading for moves and renames
//! - Soft-deleting persistence with filtered reads
//! - A service enforcing sibling uniqueness and deletion guards

mod hierarchy;
mod model;
mod repository;
mod service;

pub use hierarchy::Hierarchy;
pub use model::{
    compute_level, compute_path, Folder, FolderStatus, FolderType, FolderUpdate, NewFolder, SortField,
    ViewMode, ViewSettings, PATH_SEPARATOR,
};
pub use repository::{FolderFilter, FolderRepository};
pub use service::FolderService;

/// Maximum length for folder names (in characters).
pub const MAX_FOLDER_NAME_LENGTH: usize = 255;

/// Maximum length for folder descriptions (in characters).
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Maximum length for icon identifiers.
pub const MAX_ICON_LENGTH: usize = 64;

/// Default maximum nesting depth (number of levels).
pub const DEFAULT_MAX_DEPTH: i64 = 32;
