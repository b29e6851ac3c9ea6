//! Tag repository for Folio.
//!
//! Reads only see active tags; `delete` deactivates.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, info};

use super::model::{Tag, TagPriority, TagStatus, TagType, TagUpdate};
use crate::db::DbPool;
use crate::error::{persistence, persistence_or_duplicate};
use crate::query::{Page, PageRequest};
use crate::types::Color;
use crate::{FolioError, Result};

/// Column list matching [`TagRow`].
pub(crate) const TAG_COLUMNS: &str = "id, created_at, updated_at, name, description, tag_type, \
     priority, is_active, color_hex, color_name, usage_count, last_used_at, parent_id";

/// Upper bound on parent walks; only a corrupt store can reach it.
const MAX_WALK_STEPS: usize = 10_000;

/// Filter for tag list queries.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub tag_type: Option<TagType>,
    pub priority: Option<TagPriority>,
    /// `Some(None)` selects root tags.
    pub parent_id: Option<Option<String>>,
    pub min_usage: Option<i64>,
    /// Order by usage (descending) instead of name.
    pub by_usage: bool,
}

impl TagFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag_type(mut self, tag_type: TagType) -> Self {
        self.tag_type = Some(tag_type);
        self
    }

    pub fn priority(mut self, priority: TagPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn parent(mut self, parent_id: Option<impl Into<String>>) -> Self {
        self.parent_id = Some(parent_id.map(|s| s.into()));
        self
    }

    pub fn min_usage(mut self, min_usage: i64) -> Self {
        self.min_usage = Some(min_usage);
        self
    }

    pub fn by_usage(mut self) -> Self {
        self.by_usage = true;
        self
    }

    fn push_conditions<'q>(&'q self, query: &mut QueryBuilder<'q, Sqlite>) {
        if let Some(tag_type) = self.tag_type {
            query.push(" AND tag_type = ").push_bind(tag_type.as_str());
        }
        if let Some(priority) = self.priority {
            query.push(" AND priority = ").push_bind(priority.as_str());
        }
        match &self.parent_id {
            Some(Some(parent_id)) => {
                query.push(" AND parent_id = ").push_bind(parent_id.as_str());
            }
            Some(None) => {
                query.push(" AND parent_id IS NULL");
            }
            None => {}
        }
        if let Some(min_usage) = self.min_usage {
            query.push(" AND usage_count >= ").push_bind(min_usage);
        }
    }

    fn push_order(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        if self.by_usage {
            query.push(" ORDER BY usage_count DESC, name ASC");
        } else {
            query.push(" ORDER BY name ASC");
        }
    }
}

/// A tag that could not be created by a best-effort bulk insert.
#[derive(Debug)]
pub struct CreateFailure {
    pub name: String,
    pub error: FolioError,
}

/// Outcome of a best-effort bulk insert.
#[derive(Debug, Default)]
pub struct BulkCreate {
    pub created: Vec<Tag>,
    pub failed: Vec<CreateFailure>,
}

/// Repository for tag persistence.
pub struct TagRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> TagRepository<'a> {
    /// Create a new TagRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get an active tag by ID.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Tag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ? AND is_active = 1");
        let row: Option<TagRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("find tag"))?;
        Ok(row.map(TagRow::into_tag))
    }

    /// Get a tag by ID whether it is active or not.
    pub async fn find_any_by_id(&self, id: &str) -> Result<Option<Tag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?");
        let row: Option<TagRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("find tag"))?;
        Ok(row.map(TagRow::into_tag))
    }

    /// Get an active tag by exact name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE name = ? AND is_active = 1");
        let row: Option<TagRow> = sqlx::query_as(&sql)
            .bind(name.trim())
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("find tag by name"))?;
        Ok(row.map(TagRow::into_tag))
    }

    /// Get the active tags among `ids`, ordered by name.
    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE is_active = 1 AND id IN ("
        ));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(") ORDER BY name ASC");

        let rows: Vec<TagRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("find tags by id"))?;
        Ok(rows.into_iter().map(TagRow::into_tag).collect())
    }

    /// List active tags matching a filter.
    pub async fn find_all(&self, filter: &TagFilter) -> Result<Vec<Tag>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {TAG_COLUMNS} FROM tags WHERE is_active = 1"));
        filter.push_conditions(&mut query);
        filter.push_order(&mut query);

        let rows: Vec<TagRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("list tags"))?;
        Ok(rows.into_iter().map(TagRow::into_tag).collect())
    }

    /// List one page of active tags matching a filter.
    pub async fn find_page(&self, filter: &TagFilter, page: PageRequest) -> Result<Page<Tag>> {
        let total = self.count(filter).await?;

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {TAG_COLUMNS} FROM tags WHERE is_active = 1"));
        filter.push_conditions(&mut query);
        filter.push_order(&mut query);
        query.push(" LIMIT ").push_bind(page.limit());
        query.push(" OFFSET ").push_bind(page.offset());

        let rows: Vec<TagRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("list tags"))?;
        let items = rows.into_iter().map(TagRow::into_tag).collect();
        Ok(Page::new(items, page, total as u64))
    }

    /// Count active tags matching a filter.
    pub async fn count(&self, filter: &TagFilter) -> Result<i64> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM tags WHERE is_active = 1");
        filter.push_conditions(&mut query);

        query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await
            .map_err(persistence("count tags"))
    }

    /// Check whether an active tag exists.
    pub async fn exists(&self, id: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE id = ? AND is_active = 1)")
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(persistence("check tag"))
    }

    /// Case-insensitive substring search over name and description.
    pub async fn search(&self, text: &str, filter: &TagFilter) -> Result<Vec<Tag>> {
        let needle = text.trim().to_lowercase();
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {TAG_COLUMNS} FROM tags WHERE is_active = 1"));
        query
            .push(" AND (instr(lower(name), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(lower(COALESCE(description, '')), ")
            .push_bind(needle)
            .push(") > 0)");
        filter.push_conditions(&mut query);
        filter.push_order(&mut query);

        let rows: Vec<TagRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("search tags"))?;
        Ok(rows.into_iter().map(TagRow::into_tag).collect())
    }

    pub async fn find_by_type(&self, tag_type: TagType) -> Result<Vec<Tag>> {
        self.find_all(&TagFilter::new().tag_type(tag_type)).await
    }

    /// Active tags used at least `min_usage` times, most used first.
    pub async fn find_by_usage(&self, min_usage: i64) -> Result<Vec<Tag>> {
        self.find_all(&TagFilter::new().min_usage(min_usage).by_usage())
            .await
    }

    pub async fn find_children(&self, parent_id: &str) -> Result<Vec<Tag>> {
        self.find_all(&TagFilter::new().parent(Some(parent_id))).await
    }

    pub async fn find_roots(&self) -> Result<Vec<Tag>> {
        self.find_all(&TagFilter::new().parent(None::<String>)).await
    }

    /// Insert a validated tag and return it as stored.
    pub async fn create(&self, tag: &Tag) -> Result<Tag> {
        FolioError::check(tag.validate())?;

        let mut conn = self.pool.acquire().await.map_err(persistence("acquire"))?;
        insert(&mut conn, tag).await?;
        drop(conn);

        info!(tag_id = %tag.id, name = %tag.name, "Created tag");
        self.find_any_by_id(&tag.id)
            .await?
            .ok_or_else(|| FolioError::not_found("tag", &tag.id))
    }

    /// Insert all tags or none of them.
    pub async fn create_many(&self, tags: &[Tag]) -> Result<Vec<Tag>> {
        for tag in tags {
            FolioError::check(tag.validate())?;
        }

        let mut tx = self.pool.begin().await.map_err(persistence("begin create tags"))?;
        for tag in tags {
            insert(&mut tx, tag).await?;
        }
        tx.commit().await.map_err(persistence("commit create tags"))?;

        info!(count = tags.len(), "Created tags");
        let ids: Vec<String> = tags.iter().map(|t| t.id.clone()).collect();
        self.find_by_ids(&ids).await
    }

    /// Insert each tag independently, collecting the failures.
    pub async fn create_each(&self, tags: &[Tag]) -> Result<BulkCreate> {
        let mut outcome = BulkCreate::default();
        for tag in tags {
            match self.create(tag).await {
                Ok(created) => outcome.created.push(created),
                Err(error) => outcome.failed.push(CreateFailure {
                    name: tag.name.clone(),
                    error,
                }),
            }
        }
        Ok(outcome)
    }

    /// Apply a patch to an active tag.
    ///
    /// A parent change is checked for existence and acyclicity.
    pub async fn update(&self, id: &str, update: &TagUpdate) -> Result<Tag> {
        let mut tag = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("tag", id))?;

        tag.apply(update)?;
        if let Some(ref parent_id) = update.parent_id {
            let parent = match parent_id {
                Some(pid) => Some(
                    self.find_by_id(pid)
                        .await?
                        .ok_or_else(|| FolioError::not_found("tag", pid))?,
                ),
                None => None,
            };
            tag.set_parent(parent.as_ref())?;
            self.ensure_can_reparent(id, parent_id.as_deref()).await?;
        }
        FolioError::check(tag.validate())?;

        let result = sqlx::query(
            "UPDATE tags SET updated_at = ?, name = ?, description = ?, tag_type = ?,
                 priority = ?, color_hex = ?, color_name = ?, parent_id = ?
             WHERE id = ? AND is_active = 1",
        )
        .bind(tag.updated_at)
        .bind(&tag.name)
        .bind(&tag.description)
        .bind(tag.tag_type.as_str())
        .bind(tag.priority.as_str())
        .bind(&tag.color.hex)
        .bind(&tag.color.name)
        .bind(&tag.parent_id)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(persistence_or_duplicate("update tag", &tag.name))?;

        if result.rows_affected() == 0 {
            return Err(FolioError::not_found("tag", id));
        }

        debug!(tag_id = %id, "Updated tag");
        self.find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("tag", id))
    }

    /// Fail with `CycleDetected` if `tag_id` would become its own ancestor.
    pub async fn ensure_can_reparent(&self, tag_id: &str, new_parent_id: Option<&str>) -> Result<()> {
        let Some(start) = new_parent_id else {
            return Ok(());
        };

        let mut current = start.to_string();
        for _ in 0..MAX_WALK_STEPS {
            if current == tag_id {
                return Err(FolioError::CycleDetected(format!(
                    "tag {tag_id} cannot be placed under itself or one of its descendants"
                )));
            }
            let parent: Option<Option<String>> =
                sqlx::query_scalar("SELECT parent_id FROM tags WHERE id = ?")
                    .bind(&current)
                    .fetch_optional(self.pool)
                    .await
                    .map_err(persistence("read tag parent"))?;
            match parent {
                Some(Some(parent)) => current = parent,
                Some(None) | None => return Ok(()),
            }
        }

        Err(FolioError::CycleDetected(format!(
            "ancestor chain of tag {start} does not terminate"
        )))
    }

    /// Deactivate a tag. Returns false if it was not active.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE tags SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
                .bind(Utc::now())
                .bind(id)
                .execute(self.pool)
                .await
                .map_err(persistence("deactivate tag"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Reactivate a deactivated tag. Returns false if it was not inactive.
    pub async fn reactivate(&self, id: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE tags SET is_active = 1, updated_at = ? WHERE id = ? AND is_active = 0")
                .bind(Utc::now())
                .bind(id)
                .execute(self.pool)
                .await
                .map_err(persistence_or_duplicate("reactivate tag", id))?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert(conn: &mut SqliteConnection, tag: &Tag) -> Result<()> {
    sqlx::query(
        "INSERT INTO tags (id, created_at, updated_at, name, description, tag_type, priority,
             is_active, color_hex, color_name, usage_count, last_used_at, parent_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&tag.id)
    .bind(tag.created_at)
    .bind(tag.updated_at)
    .bind(&tag.name)
    .bind(&tag.description)
    .bind(tag.tag_type.as_str())
    .bind(tag.priority.as_str())
    .bind(tag.status.is_active())
    .bind(&tag.color.hex)
    .bind(&tag.color.name)
    .bind(tag.usage_count)
    .bind(tag.last_used_at)
    .bind(&tag.parent_id)
    .execute(&mut *conn)
    .await
    .map_err(persistence_or_duplicate("insert tag", &tag.name))?;
    Ok(())
}

/// Internal struct for mapping database rows to Tag.
#[derive(sqlx::FromRow)]
pub(crate) struct TagRow {
    pub(crate) id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    name: String,
    description: Option<String>,
    tag_type: String,
    priority: String,
    is_active: bool,
    color_hex: String,
    color_name: Option<String>,
    usage_count: i64,
    last_used_at: Option<DateTime<Utc>>,
    parent_id: Option<String>,
}

impl TagRow {
    pub(crate) fn into_tag(self) -> Tag {
        Tag {
            id: self.id,
            name: self.name,
            description: self.description,
            color: Color {
                hex: self.color_hex,
                name: self.color_name,
            },
            tag_type: self.tag_type.parse().unwrap_or(TagType::User),
            priority: self.priority.parse().unwrap_or(TagPriority::Normal),
            status: TagStatus::from_active(self.is_active),
            usage_count: self.usage_count,
            last_used_at: self.last_used_at,
            parent_id: self.parent_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
