//! Folio - hierarchical folder, file and tag store
//!
//! Folders form a forest with cached paths, files live in folders, and tags
//! are attached to both with maintained usage counters. Everything persists
//! to SQLite with soft deletion.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod folder;
pub mod logging;
pub mod query;
pub mod tag;
pub mod types;
pub mod validation;

pub use config::Config;
pub use db::Database;
pub use error::{FolioError, Result, ValidationErrors};
pub use file::{File, FileCategory, FileMetadata, FileService, FileStatus, FileUpdate, NewFile};
pub use folder::{Folder, FolderService, FolderStatus, FolderType, FolderUpdate, Hierarchy, NewFolder};
pub use query::{Page, PageRequest, SortDirection};
pub use tag::{NewTag, Tag, TagService, TagSubject, TagType, TagUpdate};
pub use types::{Color, Visibility};
pub use validation::FieldError;
