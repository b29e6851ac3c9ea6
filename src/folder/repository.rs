//! Folder repository for Folio.
//!
//! Reads never return deleted folders. Writes that change a folder's name or
//! parent rewrite the stored paths of the whole subtree in the same
//! transaction.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use super::hierarchy::{cascade_paths, Hierarchy};
use super::model::{Folder, FolderStatus, FolderType, FolderUpdate, SortField, ViewMode, ViewSettings};
use crate::db::DbPool;
use crate::error::{persistence, persistence_or_duplicate};
use crate::query::{Page, PageRequest, SortDirection};
use crate::tag::{insert_pairs, load_tag_map, replace_pairs, SubjectKind, TagSubject};
use crate::types::{Color, Visibility};
use crate::{FolioError, Result};

/// Column list matching [`FolderRow`].
const FOLDER_COLUMNS: &str = "id, created_at, updated_at, name, description, parent_id, path, \
     level, status, folder_type, visibility, color_hex, color_name, icon, \
     view_settings_sort_by, view_settings_sort_order, view_settings_view_mode, \
     view_settings_show_hidden, last_accessed_at, archived_at, is_favorite, is_protected, \
     is_system_folder";

/// Filter and ordering for folder list queries.
#[derive(Debug, Clone, Default)]
pub struct FolderFilter {
    /// `Some(None)` selects root folders.
    pub parent_id: Option<Option<String>>,
    pub status: Option<FolderStatus>,
    pub folder_type: Option<FolderType>,
    pub visibility: Option<Visibility>,
    pub favorites_only: bool,
    /// Only folders carrying these tags.
    pub tag_ids: Vec<String>,
    /// Require every tag in `tag_ids` instead of any of them.
    pub match_all_tags: bool,
    pub sort_by: SortField,
    pub direction: SortDirection,
}

impl FolderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(mut self, parent_id: Option<impl Into<String>>) -> Self {
        self.parent_id = Some(parent_id.map(|s| s.into()));
        self
    }

    pub fn status(mut self, status: FolderStatus) -> Self {
        self.status = Some(status);
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

    pub fn favorites(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    pub fn tags(mut self, tag_ids: Vec<String>, match_all: bool) -> Self {
        self.tag_ids = tag_ids;
        self.match_all_tags = match_all;
        self
    }

    pub fn sort(mut self, sort_by: SortField, direction: SortDirection) -> Self {
        self.sort_by = sort_by;
        self.direction = direction;
        self
    }

    fn push_conditions<'q>(&'q self, query: &mut QueryBuilder<'q, Sqlite>) {
        match &self.parent_id {
            Some(Some(parent_id)) => {
                query.push(" AND parent_id = ").push_bind(parent_id.as_str());
            }
            Some(None) => {
                query.push(" AND parent_id IS NULL");
            }
            None => {}
        }
        if let Some(status) = self.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(folder_type) = self.folder_type {
            query.push(" AND folder_type = ").push_bind(folder_type.as_str());
        }
        if let Some(visibility) = self.visibility {
            query.push(" AND visibility = ").push_bind(visibility.as_str());
        }
        if self.favorites_only {
            query.push(" AND is_favorite = 1");
        }
        if !self.tag_ids.is_empty() {
            let mut wanted: Vec<&str> = self.tag_ids.iter().map(String::as_str).collect();
            wanted.sort_unstable();
            wanted.dedup();

            if self.match_all_tags {
                query.push(
                    " AND (SELECT COUNT(DISTINCT tag_id) FROM folder_tags
                       WHERE folder_id = folders.id AND tag_id IN (",
                );
            } else {
                query.push(
                    " AND EXISTS (SELECT 1 FROM folder_tags
                       WHERE folder_id = folders.id AND tag_id IN (",
                );
            }
            let mut separated = query.separated(", ");
            for tag_id in &wanted {
                separated.push_bind(*tag_id);
            }
            if self.match_all_tags {
                query.push(")) = ").push_bind(wanted.len() as i64);
            } else {
                query.push("))");
            }
        }
    }

    fn push_order(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        let column = match self.sort_by {
            SortField::Name | SortField::Size => "name",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Type => "folder_type",
        };
        query.push(format!(
            " ORDER BY {column} {dir}, name ASC, id ASC",
            dir = self.direction.as_sql()
        ));
    }
}

/// Repository for folder persistence.
pub struct FolderRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Attach the active tag ids to loaded rows.
    async fn hydrate(&self, rows: Vec<FolderRow>) -> Result<Vec<Folder>> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut tags = load_tag_map(self.pool, SubjectKind::Folder, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let tag_ids = tags.remove(&row.id).unwrap_or_default();
                let mut folder = row.into_folder();
                folder.set_tag_ids(tag_ids);
                folder
            })
            .collect())
    }

    async fn hydrate_one(&self, row: Option<FolderRow>) -> Result<Option<Folder>> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Get a live folder by ID.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ? AND status <> 'deleted'");
        let row: Option<FolderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("find folder"))?;
        self.hydrate_one(row).await
    }

    /// Get a live folder by its full path.
    pub async fn find_by_path(&self, path: &str) -> Result<Option<Folder>> {
        let sql =
            format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE path = ? AND status <> 'deleted'");
        let row: Option<FolderRow> = sqlx::query_as(&sql)
            .bind(path)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("find folder by path"))?;
        self.hydrate_one(row).await
    }

    /// Get the live folder named `name` directly under `parent_id`.
    pub async fn find_by_name_in_parent(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<Folder>> {
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE name = ? AND parent_id IS ? AND status <> 'deleted'"
        );
        let row: Option<FolderRow> = sqlx::query_as(&sql)
            .bind(name.trim())
            .bind(parent_id)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("find folder by name"))?;
        self.hydrate_one(row).await
    }

    /// List live folders matching a filter.
    pub async fn find_all(&self, filter: &FolderFilter) -> Result<Vec<Folder>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE status <> 'deleted'"
        ));
        filter.push_conditions(&mut query);
        filter.push_order(&mut query);

        let rows: Vec<FolderRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("list folders"))?;
        self.hydrate(rows).await
    }

    /// List one page of live folders matching a filter.
    pub async fn find_page(&self, filter: &FolderFilter, page: PageRequest) -> Result<Page<Folder>> {
        let total = self.count(filter).await?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE status <> 'deleted'"
        ));
        filter.push_conditions(&mut query);
        filter.push_order(&mut query);
        query.push(" LIMIT ").push_bind(page.limit());
        query.push(" OFFSET ").push_bind(page.offset());

        let rows: Vec<FolderRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("list folders"))?;
        let items = self.hydrate(rows).await?;
        Ok(Page::new(items, page, total as u64))
    }

    /// Count live folders matching a filter.
    pub async fn count(&self, filter: &FolderFilter) -> Result<i64> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM folders WHERE status <> 'deleted'");
        filter.push_conditions(&mut query);

        query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await
            .map_err(persistence("count folders"))
    }

    /// Check whether a live folder exists.
    pub async fn exists(&self, id: &str) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM folders WHERE id = ? AND status <> 'deleted')",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await
        .map_err(persistence("check folder"))
    }

    /// Case-insensitive substring search over name and description.
    pub async fn search(&self, text: &str, filter: &FolderFilter) -> Result<Vec<Folder>> {
        let needle = text.trim().to_lowercase();
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE status <> 'deleted'"
        ));
        query
            .push(" AND (instr(lower(name), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(lower(COALESCE(description, '')), ")
            .push_bind(needle)
            .push(") > 0)");
        filter.push_conditions(&mut query);
        filter.push_order(&mut query);

        let rows: Vec<FolderRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("search folders"))?;
        self.hydrate(rows).await
    }

    /// Live direct children of a folder, or the live roots for `None`.
    pub async fn find_by_parent(&self, parent_id: Option<&str>) -> Result<Vec<Folder>> {
        self.find_all(&FolderFilter::new().parent(parent_id)).await
    }

    /// Live folders carrying any (or all) of the given tags.
    pub async fn find_by_tags(&self, tag_ids: &[String], match_all: bool) -> Result<Vec<Folder>> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(&FolderFilter::new().tags(tag_ids.to_vec(), match_all))
            .await
    }

    pub async fn find_favorites(&self) -> Result<Vec<Folder>> {
        self.find_all(&FolderFilter::new().favorites()).await
    }

    /// Number of live direct subfolders plus live files in a folder.
    pub async fn count_children(&self, id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM folders WHERE parent_id = ? AND status <> 'deleted')
                  + (SELECT COUNT(*) FROM files WHERE folder_id = ? AND status <> 'deleted')",
        )
        .bind(id)
        .bind(id)
        .fetch_one(self.pool)
        .await
        .map_err(persistence("count folder children"))
    }

    /// Insert a validated folder with its initial tag assignments.
    pub async fn create(&self, folder: &Folder) -> Result<Folder> {
        FolioError::check(folder.validate())?;

        let mut tx = self.pool.begin().await.map_err(persistence("begin create folder"))?;
        sqlx::query(
            "INSERT INTO folders (id, created_at, updated_at, name, description, parent_id, path,
                 level, status, folder_type, visibility, color_hex, color_name, icon,
                 view_settings_sort_by, view_settings_sort_order, view_settings_view_mode,
                 view_settings_show_hidden, last_accessed_at, archived_at, is_favorite,
                 is_protected, is_system_folder)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&folder.id)
        .bind(folder.created_at)
        .bind(folder.updated_at)
        .bind(&folder.name)
        .bind(&folder.description)
        .bind(&folder.parent_id)
        .bind(&folder.path)
        .bind(folder.level)
        .bind(folder.status.as_str())
        .bind(folder.folder_type.as_str())
        .bind(folder.visibility.as_str())
        .bind(folder.color.as_ref().map(|c| c.hex.as_str()))
        .bind(folder.color.as_ref().and_then(|c| c.name.as_deref()))
        .bind(&folder.icon)
        .bind(folder.view_settings.sort_by.as_str())
        .bind(folder.view_settings.sort_direction.as_str())
        .bind(folder.view_settings.view_mode.as_str())
        .bind(folder.view_settings.show_hidden)
        .bind(folder.last_accessed_at)
        .bind(folder.archived_at)
        .bind(folder.is_favorite)
        .bind(folder.is_protected)
        .bind(folder.is_system_folder)
        .execute(&mut *tx)
        .await
        .map_err(persistence_or_duplicate("insert folder", &folder.path))?;

        insert_pairs(&mut tx, &TagSubject::folder(&folder.id), &folder.tag_ids).await?;
        tx.commit().await.map_err(persistence("commit create folder"))?;

        info!(folder_id = %folder.id, path = %folder.path, "Created folder");
        self.find_by_id(&folder.id)
            .await?
            .ok_or_else(|| FolioError::not_found("folder", &folder.id))
    }

    /// Apply a patch to a live folder.
    ///
    /// A parent change is checked for existence and cycles; renames and
    /// moves cascade the new path to every descendant folder and file.
    pub async fn update(&self, id: &str, update: &FolderUpdate) -> Result<Folder> {
        let mut folder = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("folder", id))?;

        folder.apply(update)?;
        if let Some(ref parent_id) = update.parent_id {
            let parent = match parent_id {
                Some(pid) => Some(
                    self.find_by_id(pid)
                        .await?
                        .ok_or_else(|| FolioError::not_found("folder", pid))?,
                ),
                None => None,
            };
            folder.move_to(parent.as_ref())?;
            Hierarchy::new(self.pool)
                .ensure_can_move(id, parent_id.as_deref())
                .await?;
        }
        FolioError::check(folder.validate())?;

        let mut tx = self.pool.begin().await.map_err(persistence("begin update folder"))?;
        let result = sqlx::query(
            "UPDATE folders SET updated_at = ?, name = ?, description = ?, parent_id = ?,
                 path = ?, level = ?, status = ?, folder_type = ?, visibility = ?,
                 color_hex = ?, color_name = ?, icon = ?, view_settings_sort_by = ?,
                 view_settings_sort_order = ?, view_settings_view_mode = ?,
                 view_settings_show_hidden = ?, last_accessed_at = ?, archived_at = ?,
                 is_favorite = ?, is_protected = ?, is_system_folder = ?
             WHERE id = ? AND status <> 'deleted'",
        )
        .bind(folder.updated_at)
        .bind(&folder.name)
        .bind(&folder.description)
        .bind(&folder.parent_id)
        .bind(&folder.path)
        .bind(folder.level)
        .bind(folder.status.as_str())
        .bind(folder.folder_type.as_str())
        .bind(folder.visibility.as_str())
        .bind(folder.color.as_ref().map(|c| c.hex.as_str()))
        .bind(folder.color.as_ref().and_then(|c| c.name.as_deref()))
        .bind(&folder.icon)
        .bind(folder.view_settings.sort_by.as_str())
        .bind(folder.view_settings.sort_direction.as_str())
        .bind(folder.view_settings.view_mode.as_str())
        .bind(folder.view_settings.show_hidden)
        .bind(folder.last_accessed_at)
        .bind(folder.archived_at)
        .bind(folder.is_favorite)
        .bind(folder.is_protected)
        .bind(folder.is_system_folder)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(persistence_or_duplicate("update folder", &folder.path))?;

        if result.rows_affected() == 0 {
            return Err(FolioError::not_found("folder", id));
        }
        if update.is_structural() {
            cascade_paths(&mut tx, &folder).await?;
        }
        tx.commit().await.map_err(persistence("commit update folder"))?;

        debug!(folder_id = %id, path = %folder.path, "Updated folder");
        self.find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("folder", id))
    }

    /// Replace the tag set of a live folder.
    pub async fn update_tags(&self, id: &str, tag_ids: &[String]) -> Result<Folder> {
        if !self.exists(id).await? {
            return Err(FolioError::not_found("folder", id));
        }

        let mut tx = self.pool.begin().await.map_err(persistence("begin update tags"))?;
        replace_pairs(&mut tx, &TagSubject::folder(id), tag_ids).await?;
        sqlx::query("UPDATE folders SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(persistence("touch folder"))?;
        tx.commit().await.map_err(persistence("commit update tags"))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("folder", id))
    }

    /// Record that a folder was opened.
    pub async fn record_access(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE folders SET last_accessed_at = ? WHERE id = ? AND status <> 'deleted'")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(persistence("record folder access"))?;
        Ok(())
    }

    /// Soft-delete a folder. Returns false if it was not live.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE folders SET status = 'deleted', updated_at = ?
             WHERE id = ? AND status <> 'deleted'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(persistence("delete folder"))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Internal struct for mapping database rows to Folder.
#[derive(sqlx::FromRow)]
struct FolderRow {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    name: String,
    description: Option<String>,
    parent_id: Option<String>,
    path: String,
    level: i64,
    status: String,
    folder_type: String,
    visibility: String,
    color_hex: Option<String>,
    color_name: Option<String>,
    icon: Option<String>,
    view_settings_sort_by: String,
    view_settings_sort_order: String,
    view_settings_view_mode: String,
    view_settings_show_hidden: bool,
    last_accessed_at: Option<DateTime<Utc>>,
    archived_at: Option<DateTime<Utc>>,
    is_favorite: bool,
    is_protected: bool,
    is_system_folder: bool,
}

impl FolderRow {
    fn into_folder(self) -> Folder {
        Folder {
            id: self.id,
            name: self.name,
            description: self.description,
            parent_id: self.parent_id,
            path: self.path,
            level: self.level,
            status: self.status.parse().unwrap_or(FolderStatus::Active),
            folder_type: self.folder_type.parse().unwrap_or(FolderType::Regular),
            visibility: self.visibility.parse().unwrap_or(Visibility::Private),
            color: Color::from_columns(self.color_hex, self.color_name),
            icon: self.icon,
            tag_ids: Vec::new(),
            view_settings: ViewSettings {
                sort_by: SortField::parse(&self.view_settings_sort_by).unwrap_or_default(),
                sort_direction: SortDirection::parse(&self.view_settings_sort_order)
                    .unwrap_or_default(),
                view_mode: ViewMode::parse(&self.view_settings_view_mode).unwrap_or_default(),
                show_hidden: self.view_settings_show_hidden,
            },
            is_favorite: self.is_favorite,
            is_protected: self.is_protected,
            is_system_folder: self.is_system_folder,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_accessed_at: self.last_accessed_at,
            archived_at: self.archived_at,
        }
    }
}
