//! Shared helpers for integration tests.

#![allow(dead_code)]

use folio::{
    Color, Database, File, FileService, Folder, FolderService, NewFile, NewFolder, NewTag, Tag,
    TagService,
};

/// Fresh in-memory store with migrations applied.
pub async fn setup_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

/// Create a folder under `parent` (or at the root).
pub async fn folder(db: &Database, name: &str, parent: Option<&Folder>) -> Folder {
    let mut new = NewFolder::new(name);
    if let Some(parent) = parent {
        new = new.with_parent(parent.id());
    }
    FolderService::new(db).create(new).await.unwrap()
}

/// Create a file of `size` bytes in `folder` (or outside any folder).
pub async fn file(db: &Database, name: &str, size: u64, folder: Option<&Folder>) -> File {
    let mut new = NewFile::new(name, size);
    if let Some(folder) = folder {
        new = new.in_folder(folder.id());
    }
    FileService::new(db).create(new).await.unwrap()
}

/// Create a user tag with a fixed color.
pub async fn tag(db: &Database, name: &str) -> Tag {
    TagService::new(db)
        .create(NewTag::new(name, Color::new("#3B82F6")))
        .await
        .unwrap()
}

/// Stored usage counter of a tag, read straight from the table.
pub async fn usage_count(db: &Database, tag_id: &str) -> i64 {
    sqlx::query_scalar("SELECT usage_count FROM tags WHERE id = ?")
        .bind(tag_id)
        .fetch_one(db.pool())
        .await
        .unwrap()
}

/// Number of relation rows referencing a tag.
pub async fn relation_count(db: &Database, tag_id: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM file_tags WHERE tag_id = ?)
              + (SELECT COUNT(*) FROM folder_tags WHERE tag_id = ?)",
    )
    .bind(tag_id)
    .bind(tag_id)
    .fetch_one(db.pool())
    .await
    .unwrap()
}
