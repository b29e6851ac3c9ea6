//! Tags for Folio.
//!
//! This module provides:
//! - The tag entity with type, priority and optional parent tag
//! - Assignment of tags to files and folders with usage counting
//! - Tag trees, assignment statistics and popularity ranking
//! - Default tag seeding

mod assignment;
mod defaults;
mod model;
mod repository;
mod service;

pub use assignment::{
    PopularTag, SubjectKind, TagAssignmentStats, TagAssignments, TagSubject, TagTreeNode,
};
pub use defaults::{default_tags, SeedReport, SkippedTag};
pub use model::{NewTag, Tag, TagPriority, TagStatus, TagType, TagUpdate};
pub use repository::{BulkCreate, CreateFailure, TagFilter, TagRepository};
pub use service::TagService;

pub(crate) use assignment::{insert_pairs, load_tag_map, replace_pairs};

/// Maximum length for tag names (in characters).
pub const MAX_TAG_NAME_LENGTH: usize = 50;

/// Maximum length for tag descriptions (in characters).
pub const MAX_TAG_DESCRIPTION_LENGTH: usize = 200;

/// Default depth bound for tag trees.
pub const DEFAULT_TREE_DEPTH: usize = 32;
