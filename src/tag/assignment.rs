//! Tag assignment and usage counting.
//!
//! `usage_count` on a tag always equals the number of `file_tags` plus
//! `folder_tags` rows that reference it. Every relation insert or delete
//! adjusts the counter in the same transaction.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, info, warn};

use super::model::Tag;
use super::repository::{TagRow, TAG_COLUMNS};
use crate::db::DbPool;
use crate::error::persistence;
use crate::{FolioError, Result};

/// Kind of entity a tag can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    File,
    Folder,
}

impl SubjectKind {
    /// Relation table holding the assignments.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            SubjectKind::File => "file_tags",
            SubjectKind::Folder => "folder_tags",
        }
    }

    /// Subject id column of the relation table.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            SubjectKind::File => "file_id",
            SubjectKind::Folder => "folder_id",
        }
    }

    /// Entity name used in errors.
    pub fn entity(&self) -> &'static str {
        match self {
            SubjectKind::File => "file",
            SubjectKind::Folder => "folder",
        }
    }
}

/// An entity that carries tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TagSubject {
    File(String),
    Folder(String),
}

impl TagSubject {
    pub fn file(id: impl Into<String>) -> Self {
        TagSubject::File(id.into())
    }

    pub fn folder(id: impl Into<String>) -> Self {
        TagSubject::Folder(id.into())
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            TagSubject::File(_) => SubjectKind::File,
            TagSubject::Folder(_) => SubjectKind::Folder,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            TagSubject::File(id) | TagSubject::Folder(id) => id,
        }
    }
}

/// A node in the tag forest.
#[derive(Debug, Clone, Serialize)]
pub struct TagTreeNode {
    pub tag: Tag,
    /// The tag's own usage plus the total usage of all its descendants.
    pub total_usage: i64,
    pub children: Vec<TagTreeNode>,
}

/// Assignment statistics for a single tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagAssignmentStats {
    pub tag_id: String,
    pub file_count: i64,
    pub folder_count: i64,
    pub total_usage: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub is_most_used_in_files: bool,
    pub is_most_used_in_folders: bool,
}

/// A tag with its share of the usage among the returned popular tags.
#[derive(Debug, Clone, Serialize)]
pub struct PopularTag {
    pub tag: Tag,
    pub usage_percentage: f64,
}

/// Drop duplicates while keeping first-seen order.
fn unique(ids: &[String]) -> Vec<&String> {
    let mut seen: HashSet<&String> = HashSet::new();
    ids.iter().filter(|id| seen.insert(*id)).collect()
}

/// Insert relation rows for `tag_ids`, skipping pairs that already exist.
///
/// Each inserted pair increments the tag's `usage_count` and stamps
/// `last_used_at`. Returns the ids that were actually added.
pub(crate) async fn insert_pairs(
    conn: &mut SqliteConnection,
    subject: &TagSubject,
    tag_ids: &[String],
) -> Result<Vec<String>> {
    let kind = subject.kind();
    let insert = format!(
        "INSERT OR IGNORE INTO {} ({}, tag_id, created_at) VALUES (?, ?, ?)",
        kind.table(),
        kind.column()
    );
    let now = Utc::now();
    let mut added = Vec::new();

    for tag_id in unique(tag_ids) {
        let result = sqlx::query(&insert)
            .bind(subject.id())
            .bind(tag_id)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(persistence("assign tag"))?;
        if result.rows_affected() == 0 {
            continue;
        }

        sqlx::query("UPDATE tags SET usage_count = usage_count + 1, last_used_at = ? WHERE id = ?")
            .bind(now)
            .bind(tag_id)
            .execute(&mut *conn)
            .await
            .map_err(persistence("increment tag usage"))?;
        added.push(tag_id.clone());
    }

    Ok(added)
}

/// Delete relation rows for `tag_ids`, decrementing usage floored at zero.
///
/// Returns the ids that were actually removed.
pub(crate) async fn delete_pairs(
    conn: &mut SqliteConnection,
    subject: &TagSubject,
    tag_ids: &[String],
) -> Result<Vec<String>> {
    let kind = subject.kind();
    let delete = format!(
        "DELETE FROM {} WHERE {} = ? AND tag_id = ?",
        kind.table(),
        kind.column()
    );
    let mut removed = Vec::new();

    for tag_id in unique(tag_ids) {
        let result = sqlx::query(&delete)
            .bind(subject.id())
            .bind(tag_id)
            .execute(&mut *conn)
            .await
            .map_err(persistence("unassign tag"))?;
        if result.rows_affected() == 0 {
            continue;
        }

        sqlx::query("UPDATE tags SET usage_count = MAX(usage_count - 1, 0) WHERE id = ?")
            .bind(tag_id)
            .execute(&mut *conn)
            .await
            .map_err(persistence("decrement tag usage"))?;
        removed.push(tag_id.clone());
    }

    Ok(removed)
}

/// Tag ids currently assigned to a subject, in assignment order.
pub(crate) async fn assigned_ids(
    conn: &mut SqliteConnection,
    subject: &TagSubject,
) -> Result<Vec<String>> {
    let kind = subject.kind();
    let sql = format!(
        "SELECT tag_id FROM {} WHERE {} = ? ORDER BY created_at, tag_id",
        kind.table(),
        kind.column()
    );
    sqlx::query_scalar(&sql)
        .bind(subject.id())
        .fetch_all(&mut *conn)
        .await
        .map_err(persistence("read tag assignments"))
}

/// Make the assignment set of a subject equal to `tag_ids`.
///
/// Only the difference is written. Unlike a plain delete-then-insert of the
/// whole set, pairs present in both sets keep their `created_at` and
/// `last_used_at`, and their tags' counters are not touched. Returns
/// `(added, removed)`.
pub(crate) async fn replace_pairs(
    conn: &mut SqliteConnection,
    subject: &TagSubject,
    tag_ids: &[String],
) -> Result<(Vec<String>, Vec<String>)> {
    let current = assigned_ids(conn, subject).await?;
    let wanted: HashSet<&str> = tag_ids.iter().map(String::as_str).collect();

    let stale: Vec<String> = current
        .iter()
        .filter(|id| !wanted.contains(id.as_str()))
        .cloned()
        .collect();
    let removed = delete_pairs(conn, subject, &stale).await?;
    let added = insert_pairs(conn, subject, tag_ids).await?;
    Ok((added, removed))
}

/// Active tag ids assigned to each of `subject_ids`.
///
/// Subjects without assignments are absent from the map.
pub(crate) async fn load_tag_map(
    pool: &DbPool,
    kind: SubjectKind,
    subject_ids: &[String],
) -> Result<HashMap<String, Vec<String>>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    if subject_ids.is_empty() {
        return Ok(map);
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT r.{col}, r.tag_id FROM {table} r JOIN tags t ON t.id = r.tag_id
         WHERE t.is_active = 1 AND r.{col} IN (",
        col = kind.column(),
        table = kind.table()
    ));
    let mut separated = query.separated(", ");
    for id in subject_ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(") ORDER BY r.created_at, r.tag_id");

    let rows: Vec<(String, String)> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(persistence("load tag assignments"))?;

    for (subject_id, tag_id) in rows {
        map.entry(subject_id).or_default().push(tag_id);
    }
    Ok(map)
}

/// Assignment operations across files and folders.
pub struct TagAssignments<'a> {
    pool: &'a DbPool,
}

impl<'a> TagAssignments<'a> {
    /// Create a new TagAssignments with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Assign tags to a subject. Returns the ids that were newly added.
    pub async fn assign(&self, subject: &TagSubject, tag_ids: &[String]) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await.map_err(persistence("begin assign"))?;
        let added = insert_pairs(&mut tx, subject, tag_ids).await?;
        tx.commit().await.map_err(persistence("commit assign"))?;

        debug!(subject = ?subject, added = added.len(), "Assigned tags");
        Ok(added)
    }

    /// Remove tags from a subject. Returns the ids that were removed.
    pub async fn unassign(&self, subject: &TagSubject, tag_ids: &[String]) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await.map_err(persistence("begin unassign"))?;
        let removed = delete_pairs(&mut tx, subject, tag_ids).await?;
        tx.commit().await.map_err(persistence("commit unassign"))?;

        debug!(subject = ?subject, removed = removed.len(), "Unassigned tags");
        Ok(removed)
    }

    /// Replace the whole assignment set of a subject.
    ///
    /// Returns the resulting set of tag ids.
    pub async fn replace(&self, subject: &TagSubject, tag_ids: &[String]) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await.map_err(persistence("begin replace"))?;
        let (added, removed) = replace_pairs(&mut tx, subject, tag_ids).await?;
        let current = assigned_ids(&mut tx, subject).await?;
        tx.commit().await.map_err(persistence("commit replace"))?;

        debug!(
            subject = ?subject,
            added = added.len(),
            removed = removed.len(),
            "Replaced tag assignments"
        );
        Ok(current)
    }

    /// Active tags assigned to a subject, ordered by name.
    pub async fn tags_of(&self, subject: &TagSubject) -> Result<Vec<Tag>> {
        let kind = subject.kind();
        let sql = format!(
            "SELECT {TAG_COLUMNS} FROM tags
             WHERE is_active = 1 AND id IN (SELECT tag_id FROM {} WHERE {} = ?)
             ORDER BY name",
            kind.table(),
            kind.column()
        );
        let rows: Vec<TagRow> = sqlx::query_as(&sql)
            .bind(subject.id())
            .fetch_all(self.pool)
            .await
            .map_err(persistence("read subject tags"))?;
        Ok(rows.into_iter().map(TagRow::into_tag).collect())
    }

    /// Every live subject carrying a tag: files first, then folders.
    pub async fn subjects_of(&self, tag_id: &str) -> Result<Vec<TagSubject>> {
        let files: Vec<String> = sqlx::query_scalar(
            "SELECT r.file_id FROM file_tags r JOIN files f ON f.id = r.file_id
             WHERE r.tag_id = ? AND f.status <> 'deleted' ORDER BY r.created_at, r.file_id",
        )
        .bind(tag_id)
        .fetch_all(self.pool)
        .await
        .map_err(persistence("read tagged files"))?;

        let folders: Vec<String> = sqlx::query_scalar(
            "SELECT r.folder_id FROM folder_tags r JOIN folders f ON f.id = r.folder_id
             WHERE r.tag_id = ? AND f.status <> 'deleted' ORDER BY r.created_at, r.folder_id",
        )
        .bind(tag_id)
        .fetch_all(self.pool)
        .await
        .map_err(persistence("read tagged folders"))?;

        Ok(files
            .into_iter()
            .map(TagSubject::File)
            .chain(folders.into_iter().map(TagSubject::Folder))
            .collect())
    }

    /// Deactivate active non-system tags that nothing references.
    ///
    /// Returns the ids of the deactivated tags.
    pub async fn cleanup_unused_tags(&self) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await.map_err(persistence("begin cleanup"))?;

        let unused: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM tags
             WHERE is_active = 1 AND tag_type <> 'system'
               AND NOT EXISTS (SELECT 1 FROM file_tags WHERE tag_id = tags.id)
               AND NOT EXISTS (SELECT 1 FROM folder_tags WHERE tag_id = tags.id)
             ORDER BY name",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(persistence("find unused tags"))?;

        let now = Utc::now();
        for id in &unused {
            sqlx::query("UPDATE tags SET is_active = 0, updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(persistence("deactivate unused tag"))?;
        }

        tx.commit().await.map_err(persistence("commit cleanup"))?;

        if !unused.is_empty() {
            info!(count = unused.len(), "Deactivated unused tags");
        }
        Ok(unused)
    }

    /// Recompute every `usage_count` from the relation tables.
    ///
    /// Returns the number of tags whose counter was wrong.
    pub async fn recount_usage(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE tags SET usage_count = (
                 (SELECT COUNT(*) FROM file_tags WHERE tag_id = tags.id)
                 + (SELECT COUNT(*) FROM folder_tags WHERE tag_id = tags.id)
             )
             WHERE usage_count <> (
                 (SELECT COUNT(*) FROM file_tags WHERE tag_id = tags.id)
                 + (SELECT COUNT(*) FROM folder_tags WHERE tag_id = tags.id)
             )",
        )
        .execute(self.pool)
        .await
        .map_err(persistence("recount tag usage"))?;

        let corrected = result.rows_affected();
        if corrected > 0 {
            warn!(corrected, "Corrected drifted tag usage counters");
        }
        Ok(corrected)
    }

    /// Forest of active tags starting at root tags, ordered by name.
    ///
    /// Descent stops at `max_depth` levels.
    pub async fn tag_tree(&self, max_depth: usize) -> Result<Vec<TagTreeNode>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE is_active = 1 ORDER BY name");
        let rows: Vec<TagRow> = sqlx::query_as(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(persistence("read tag tree"))?;

        let active: HashSet<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut roots = Vec::new();
        let mut children: HashMap<String, Vec<Tag>> = HashMap::new();
        for tag in rows.into_iter().map(TagRow::into_tag) {
            // A tag under a deactivated parent is shown as a root.
            match tag.parent_id.clone() {
                Some(parent_id) if active.contains(&parent_id) => {
                    children.entry(parent_id).or_default().push(tag)
                }
                _ => roots.push(tag),
            }
        }

        let mut truncated = false;
        let forest = roots
            .into_iter()
            .map(|tag| build_node(tag, &mut children, 1, max_depth, &mut truncated))
            .collect();

        if truncated {
            warn!(max_depth, "Tag tree truncated at maximum depth");
        }
        Ok(forest)
    }

    /// Assignment statistics for an active tag.
    pub async fn assignment_stats(&self, tag_id: &str) -> Result<TagAssignmentStats> {
        let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM tags WHERE id = ?")
            .bind(tag_id)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("read tag"))?;
        if active != Some(true) {
            return Err(FolioError::not_found("tag", tag_id));
        }

        let mut file_count = 0;
        let mut folder_count = 0;
        let mut last_used_at: Option<DateTime<Utc>> = None;
        let mut most_used = [false, false];

        for (i, kind) in [SubjectKind::File, SubjectKind::Folder].into_iter().enumerate() {
            let table = kind.table();

            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {table} WHERE tag_id = ?"
            ))
            .bind(tag_id)
            .fetch_one(self.pool)
            .await
            .map_err(persistence("count assignments"))?;

            let max_count: i64 = sqlx::query_scalar(&format!(
                "SELECT COALESCE(MAX(c), 0) FROM (SELECT COUNT(*) AS c FROM {table} GROUP BY tag_id)"
            ))
            .fetch_one(self.pool)
            .await
            .map_err(persistence("count assignments"))?;

            let latest: Option<DateTime<Utc>> = sqlx::query_scalar(&format!(
                "SELECT created_at FROM {table} WHERE tag_id = ? ORDER BY created_at DESC LIMIT 1"
            ))
            .bind(tag_id)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("read last assignment"))?;

            last_used_at = last_used_at.max(latest);
            most_used[i] = count > 0 && count >= max_count;
            match kind {
                SubjectKind::File => file_count = count,
                SubjectKind::Folder => folder_count = count,
            }
        }

        Ok(TagAssignmentStats {
            tag_id: tag_id.to_string(),
            file_count,
            folder_count,
            total_usage: file_count + folder_count,
            last_used_at,
            is_most_used_in_files: most_used[0],
            is_most_used_in_folders: most_used[1],
        })
    }

    /// The `limit` most used active tags.
    pub async fn popular_tags(&self, limit: u32) -> Result<Vec<PopularTag>> {
        let sql = format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE is_active = 1
             ORDER BY usage_count DESC, name ASC LIMIT ?"
        );
        let rows: Vec<TagRow> = sqlx::query_as(&sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool)
            .await
            .map_err(persistence("read popular tags"))?;

        let tags: Vec<Tag> = rows.into_iter().map(TagRow::into_tag).collect();
        let total: i64 = tags.iter().map(|t| t.usage_count).sum();

        Ok(tags
            .into_iter()
            .map(|tag| {
                let usage_percentage = if total > 0 {
                    tag.usage_count as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                PopularTag {
                    tag,
                    usage_percentage,
                }
            })
            .collect())
    }
}

fn build_node(
    tag: Tag,
    children: &mut HashMap<String, Vec<Tag>>,
    depth: usize,
    max_depth: usize,
    truncated: &mut bool,
) -> TagTreeNode {
    let direct = children.remove(&tag.id).unwrap_or_default();
    let nodes: Vec<TagTreeNode> = if depth >= max_depth {
        if !direct.is_empty() {
            *truncated = true;
        }
        Vec::new()
    } else {
        direct
            .into_iter()
            .map(|child| build_node(child, children, depth + 1, max_depth, truncated))
            .collect()
    };

    let total_usage = tag.usage_count + nodes.iter().map(|n| n.total_usage).sum::<i64>();
    TagTreeNode {
        tag,
        total_usage,
        children: nodes,
    }
}
