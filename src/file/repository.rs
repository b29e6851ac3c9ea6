//! File repository for Folio.
//!
//! Reads never return deleted files. Metadata is stored flattened into
//! `metadata_*` columns; a media group (image, video, audio) is rebuilt only
//! when all of its required columns are present.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use super::model::{
    AudioMetadata, File, FileCategory, FileMetadata, FileStatus, FileUpdate, ImageMetadata,
    VideoMetadata,
};
use super::DEFAULT_MAX_FILE_SIZE;
use crate::db::DbPool;
use crate::error::{persistence, persistence_or_duplicate};
use crate::folder::{FolderRepository, SortField};
use crate::query::{Page, PageRequest, SortDirection};
use crate::tag::{insert_pairs, load_tag_map, replace_pairs, SubjectKind, TagSubject};
use crate::types::{Color, Visibility};
use crate::{FolioError, Result};

/// Column list matching [`FileRow`].
const FILE_COLUMNS: &str = "id, created_at, updated_at, name, original_name, extension, \
     category, description, folder_id, path, status, visibility, metadata_size, \
     metadata_mime_type, metadata_checksum, metadata_image_width, metadata_image_height, \
     metadata_video_width, metadata_video_height, metadata_video_duration, \
     metadata_audio_duration, metadata_audio_bitrate, metadata_audio_sample_rate, color_hex, \
     color_name, last_accessed_at, archived_at, storage_url, thumbnail_url";

/// Filter and ordering for file list queries.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// `Some(None)` selects files outside any folder.
    pub folder_id: Option<Option<String>>,
    pub status: Option<FileStatus>,
    pub category: Option<FileCategory>,
    /// Lowercase extension without the dot.
    pub extension: Option<String>,
    pub visibility: Option<Visibility>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub tag_ids: Vec<String>,
    pub match_all_tags: bool,
    pub sort_by: SortField,
    pub direction: SortDirection,
}

impl FileFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folder(mut self, folder_id: Option<impl Into<String>>) -> Self {
        self.folder_id = Some(folder_id.map(|s| s.into()));
        self
    }

    pub fn status(mut self, status: FileStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(mut self, category: FileCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.extension = Some(extension.trim_start_matches('.').to_lowercase());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Restrict to sizes within `min..=max` bytes.
    pub fn size_between(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
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
        match &self.folder_id {
            Some(Some(folder_id)) => {
                query.push(" AND folder_id = ").push_bind(folder_id.as_str());
            }
            Some(None) => {
                query.push(" AND folder_id IS NULL");
            }
            None => {}
        }
        if let Some(status) = self.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(category) = self.category {
            query.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(ref extension) = self.extension {
            query.push(" AND extension = ").push_bind(extension.as_str());
        }
        if let Some(visibility) = self.visibility {
            query.push(" AND visibility = ").push_bind(visibility.as_str());
        }
        if let Some(min) = self.min_size {
            query.push(" AND metadata_size >= ").push_bind(clamp_size(min));
        }
        if let Some(max) = self.max_size {
            query.push(" AND metadata_size <= ").push_bind(clamp_size(max));
        }
        if !self.tag_ids.is_empty() {
            let mut wanted: Vec<&str> = self.tag_ids.iter().map(String::as_str).collect();
            wanted.sort_unstable();
            wanted.dedup();

            if self.match_all_tags {
                query.push(
                    " AND (SELECT COUNT(DISTINCT tag_id) FROM file_tags
                       WHERE file_id = files.id AND tag_id IN (",
                );
            } else {
                query.push(
                    " AND EXISTS (SELECT 1 FROM file_tags
                       WHERE file_id = files.id AND tag_id IN (",
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
            SortField::Name => "name",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Size => "metadata_size",
            SortField::Type => "extension",
        };
        query.push(format!(
            " ORDER BY {column} {dir}, name ASC, id ASC",
            dir = self.direction.as_sql()
        ));
    }
}

/// SQLite integers are signed; sizes above `i64::MAX` cannot be stored anyway.
fn clamp_size(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

/// Repository for file persistence.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
    max_file_size: u64,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the size limit applied when validating writes.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    async fn hydrate(&self, rows: Vec<FileRow>) -> Result<Vec<File>> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut tags = load_tag_map(self.pool, SubjectKind::File, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let tag_ids = tags.remove(&row.id).unwrap_or_default();
                let mut file = row.into_file();
                file.set_tag_ids(tag_ids);
                file
            })
            .collect())
    }

    async fn hydrate_one(&self, row: Option<FileRow>) -> Result<Option<File>> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Get a live file by ID.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<File>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ? AND status <> 'deleted'");
        let row: Option<FileRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("find file"))?;
        self.hydrate_one(row).await
    }

    /// Get a live file by its full path.
    pub async fn find_by_path(&self, path: &str) -> Result<Option<File>> {
        let sql =
            format!("SELECT {FILE_COLUMNS} FROM files WHERE path = ? AND status <> 'deleted'");
        let row: Option<FileRow> = sqlx::query_as(&sql)
            .bind(path)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("find file by path"))?;
        self.hydrate_one(row).await
    }

    /// Get the live file named `name` directly in `folder_id`.
    pub async fn find_by_name_in_folder(
        &self,
        name: &str,
        folder_id: Option<&str>,
    ) -> Result<Option<File>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE name = ? AND folder_id IS ? AND status <> 'deleted'"
        );
        let row: Option<FileRow> = sqlx::query_as(&sql)
            .bind(name.trim())
            .bind(folder_id)
            .fetch_optional(self.pool)
            .await
            .map_err(persistence("find file by name"))?;
        self.hydrate_one(row).await
    }

    /// Check whether a live file exists.
    pub async fn exists(&self, id: &str) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM files WHERE id = ? AND status <> 'deleted')",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await
        .map_err(persistence("check file"))
    }

    /// List live files matching a filter.
    pub async fn find_all(&self, filter: &FileFilter) -> Result<Vec<File>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE status <> 'deleted'"
        ));
        filter.push_conditions(&mut query);
        filter.push_order(&mut query);

        let rows: Vec<FileRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("list files"))?;
        self.hydrate(rows).await
    }

    /// List one page of live files matching a filter.
    pub async fn find_page(&self, filter: &FileFilter, page: PageRequest) -> Result<Page<File>> {
        let total = self.count(filter).await?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE status <> 'deleted'"
        ));
        filter.push_conditions(&mut query);
        filter.push_order(&mut query);
        query.push(" LIMIT ").push_bind(page.limit());
        query.push(" OFFSET ").push_bind(page.offset());

        let rows: Vec<FileRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("list files"))?;
        let items = self.hydrate(rows).await?;
        Ok(Page::new(items, page, total as u64))
    }

    /// Count live files matching a filter.
    pub async fn count(&self, filter: &FileFilter) -> Result<i64> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM files WHERE status <> 'deleted'");
        filter.push_conditions(&mut query);

        query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await
            .map_err(persistence("count files"))
    }

    /// Sum of the sizes of live files matching a filter.
    pub async fn total_size(&self, filter: &FileFilter) -> Result<u64> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COALESCE(SUM(metadata_size), 0) FROM files WHERE status <> 'deleted'",
        );
        filter.push_conditions(&mut query);

        let total: i64 = query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await
            .map_err(persistence("sum file sizes"))?;
        Ok(total.max(0) as u64)
    }

    /// Case-insensitive substring search over name, original name and description.
    pub async fn search(&self, text: &str, filter: &FileFilter) -> Result<Vec<File>> {
        let needle = text.trim().to_lowercase();
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE status <> 'deleted'"
        ));
        query
            .push(" AND (instr(lower(name), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(lower(original_name), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(lower(COALESCE(description, '')), ")
            .push_bind(needle)
            .push(") > 0)");
        filter.push_conditions(&mut query);
        filter.push_order(&mut query);

        let rows: Vec<FileRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(persistence("search files"))?;
        self.hydrate(rows).await
    }

    /// Live files directly in a folder, or outside any folder for `None`.
    pub async fn find_by_folder(&self, folder_id: Option<&str>) -> Result<Vec<File>> {
        self.find_all(&FileFilter::new().folder(folder_id)).await
    }

    pub async fn find_by_extension(&self, extension: &str) -> Result<Vec<File>> {
        self.find_all(&FileFilter::new().extension(extension)).await
    }

    pub async fn find_by_category(&self, category: FileCategory) -> Result<Vec<File>> {
        self.find_all(&FileFilter::new().category(category)).await
    }

    /// Live files carrying any (or all) of the given tags.
    pub async fn find_by_tags(&self, tag_ids: &[String], match_all: bool) -> Result<Vec<File>> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(&FileFilter::new().tags(tag_ids.to_vec(), match_all))
            .await
    }

    /// Insert a validated file with its initial tag assignments.
    pub async fn create(&self, file: &File) -> Result<File> {
        FolioError::check(file.validate_with_limit(self.max_file_size))?;

        let mut tx = self.pool.begin().await.map_err(persistence("begin create file"))?;
        let columns = MetadataColumns::from(&file.metadata);
        sqlx::query(
            "INSERT INTO files (id, created_at, updated_at, name, original_name, extension,
                 category, description, folder_id, path, status, visibility, metadata_size,
                 metadata_mime_type, metadata_checksum, metadata_image_width,
                 metadata_image_height, metadata_video_width, metadata_video_height,
                 metadata_video_duration, metadata_audio_duration, metadata_audio_bitrate,
                 metadata_audio_sample_rate, color_hex, color_name, last_accessed_at,
                 archived_at, storage_url, thumbnail_url)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                 ?, ?, ?, ?)",
        )
        .bind(&file.id)
        .bind(file.created_at)
        .bind(file.updated_at)
        .bind(&file.name)
        .bind(&file.original_name)
        .bind(&file.extension)
        .bind(file.category.as_str())
        .bind(&file.description)
        .bind(&file.folder_id)
        .bind(&file.path)
        .bind(file.status.as_str())
        .bind(file.visibility.as_str())
        .bind(columns.size)
        .bind(&file.metadata.mime_type)
        .bind(&file.metadata.checksum)
        .bind(columns.image_width)
        .bind(columns.image_height)
        .bind(columns.video_width)
        .bind(columns.video_height)
        .bind(columns.video_duration)
        .bind(columns.audio_duration)
        .bind(columns.audio_bitrate)
        .bind(columns.audio_sample_rate)
        .bind(file.color.as_ref().map(|c| c.hex.as_str()))
        .bind(file.color.as_ref().and_then(|c| c.name.as_deref()))
        .bind(file.last_accessed_at)
        .bind(file.archived_at)
        .bind(&file.storage_url)
        .bind(&file.thumbnail_url)
        .execute(&mut *tx)
        .await
        .map_err(persistence_or_duplicate("insert file", &file.path))?;

        insert_pairs(&mut tx, &TagSubject::file(&file.id), &file.tag_ids).await?;
        tx.commit().await.map_err(persistence("commit create file"))?;

        info!(file_id = %file.id, path = %file.path, size = file.metadata.size, "Created file");
        self.find_by_id(&file.id)
            .await?
            .ok_or_else(|| FolioError::not_found("file", &file.id))
    }

    /// Apply a patch to a live file.
    ///
    /// A folder change must name a live folder; the path is recomputed from it.
    pub async fn update(&self, id: &str, update: &FileUpdate) -> Result<File> {
        let mut file = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("file", id))?;

        file.apply(update);
        if let Some(ref folder_id) = update.folder_id {
            let folder = match folder_id {
                Some(fid) => Some(
                    FolderRepository::new(self.pool)
                        .find_by_id(fid)
                        .await?
                        .ok_or_else(|| FolioError::not_found("folder", fid))?,
                ),
                None => None,
            };
            file.move_to(folder.as_ref());
        }
        FolioError::check(file.validate_with_limit(self.max_file_size))?;

        let columns = MetadataColumns::from(&file.metadata);
        let result = sqlx::query(
            "UPDATE files SET updated_at = ?, name = ?, extension = ?, category = ?,
                 description = ?, folder_id = ?, path = ?, status = ?, visibility = ?,
                 metadata_size = ?, metadata_mime_type = ?, metadata_checksum = ?,
                 metadata_image_width = ?, metadata_image_height = ?, metadata_video_width = ?,
                 metadata_video_height = ?, metadata_video_duration = ?,
                 metadata_audio_duration = ?, metadata_audio_bitrate = ?,
                 metadata_audio_sample_rate = ?, color_hex = ?, color_name = ?,
                 last_accessed_at = ?, archived_at = ?, storage_url = ?, thumbnail_url = ?
             WHERE id = ? AND status <> 'deleted'",
        )
        .bind(file.updated_at)
        .bind(&file.name)
        .bind(&file.extension)
        .bind(file.category.as_str())
        .bind(&file.description)
        .bind(&file.folder_id)
        .bind(&file.path)
        .bind(file.status.as_str())
        .bind(file.visibility.as_str())
        .bind(columns.size)
        .bind(&file.metadata.mime_type)
        .bind(&file.metadata.checksum)
        .bind(columns.image_width)
        .bind(columns.image_height)
        .bind(columns.video_width)
        .bind(columns.video_height)
        .bind(columns.video_duration)
        .bind(columns.audio_duration)
        .bind(columns.audio_bitrate)
        .bind(columns.audio_sample_rate)
        .bind(file.color.as_ref().map(|c| c.hex.as_str()))
        .bind(file.color.as_ref().and_then(|c| c.name.as_deref()))
        .bind(file.last_accessed_at)
        .bind(file.archived_at)
        .bind(&file.storage_url)
        .bind(&file.thumbnail_url)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(persistence_or_duplicate("update file", &file.path))?;

        if result.rows_affected() == 0 {
            return Err(FolioError::not_found("file", id));
        }

        debug!(file_id = %id, path = %file.path, "Updated file");
        self.find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("file", id))
    }

    /// Replace the tag set of a live file.
    pub async fn update_tags(&self, id: &str, tag_ids: &[String]) -> Result<File> {
        if !self.exists(id).await? {
            return Err(FolioError::not_found("file", id));
        }

        let mut tx = self.pool.begin().await.map_err(persistence("begin update tags"))?;
        replace_pairs(&mut tx, &TagSubject::file(id), tag_ids).await?;
        sqlx::query("UPDATE files SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(persistence("touch file"))?;
        tx.commit().await.map_err(persistence("commit update tags"))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("file", id))
    }

    /// Record that a file was opened.
    pub async fn record_access(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE files SET last_accessed_at = ? WHERE id = ? AND status <> 'deleted'")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(persistence("record file access"))?;
        Ok(())
    }

    /// Soft-delete a file. Returns false if it was not live.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET status = 'deleted', updated_at = ?
             WHERE id = ? AND status <> 'deleted'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(persistence("delete file"))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Metadata flattened to column values.
struct MetadataColumns {
    size: i64,
    image_width: Option<i64>,
    image_height: Option<i64>,
    video_width: Option<i64>,
    video_height: Option<i64>,
    video_duration: Option<f64>,
    audio_duration: Option<f64>,
    audio_bitrate: Option<i64>,
    audio_sample_rate: Option<i64>,
}

impl From<&FileMetadata> for MetadataColumns {
    fn from(metadata: &FileMetadata) -> Self {
        Self {
            size: clamp_size(metadata.size),
            image_width: metadata.image.map(|i| i64::from(i.width)),
            image_height: metadata.image.map(|i| i64::from(i.height)),
            video_width: metadata.video.map(|v| i64::from(v.width)),
            video_height: metadata.video.map(|v| i64::from(v.height)),
            video_duration: metadata.video.map(|v| v.duration_secs),
            audio_duration: metadata.audio.map(|a| a.duration_secs),
            audio_bitrate: metadata.audio.and_then(|a| a.bitrate).map(i64::from),
            audio_sample_rate: metadata.audio.and_then(|a| a.sample_rate).map(i64::from),
        }
    }
}

fn dimension(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

/// Internal struct for mapping database rows to File.
#[derive(sqlx::FromRow)]
struct FileRow {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    name: String,
    original_name: String,
    extension: String,
    category: String,
    description: Option<String>,
    folder_id: Option<String>,
    path: String,
    status: String,
    visibility: String,
    metadata_size: i64,
    metadata_mime_type: Option<String>,
    metadata_checksum: Option<String>,
    metadata_image_width: Option<i64>,
    metadata_image_height: Option<i64>,
    metadata_video_width: Option<i64>,
    metadata_video_height: Option<i64>,
    metadata_video_duration: Option<f64>,
    metadata_audio_duration: Option<f64>,
    metadata_audio_bitrate: Option<i64>,
    metadata_audio_sample_rate: Option<i64>,
    color_hex: Option<String>,
    color_name: Option<String>,
    last_accessed_at: Option<DateTime<Utc>>,
    archived_at: Option<DateTime<Utc>>,
    storage_url: Option<String>,
    thumbnail_url: Option<String>,
}

impl FileRow {
    fn metadata(&self) -> FileMetadata {
        let image = match (
            dimension(self.metadata_image_width),
            dimension(self.metadata_image_height),
        ) {
            (Some(width), Some(height)) => Some(ImageMetadata { width, height }),
            _ => None,
        };
        let video = match (
            dimension(self.metadata_video_width),
            dimension(self.metadata_video_height),
            self.metadata_video_duration,
        ) {
            (Some(width), Some(height), Some(duration_secs)) => Some(VideoMetadata {
                width,
                height,
                duration_secs,
            }),
            _ => None,
        };
        let audio = self.metadata_audio_duration.map(|duration_secs| AudioMetadata {
            duration_secs,
            bitrate: dimension(self.metadata_audio_bitrate),
            sample_rate: dimension(self.metadata_audio_sample_rate),
        });

        FileMetadata {
            size: self.metadata_size.max(0) as u64,
            mime_type: self.metadata_mime_type.clone(),
            checksum: self.metadata_checksum.clone(),
            image,
            video,
            audio,
        }
    }

    fn into_file(self) -> File {
        let metadata = self.metadata();
        File {
            id: self.id,
            name: self.name,
            original_name: self.original_name,
            extension: self.extension,
            category: self.category.parse().unwrap_or(FileCategory::Other),
            description: self.description,
            folder_id: self.folder_id,
            path: self.path,
            status: self.status.parse().unwrap_or(FileStatus::Active),
            visibility: self.visibility.parse().unwrap_or(Visibility::Private),
            metadata,
            color: Color::from_columns(self.color_hex, self.color_name),
            tag_ids: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_accessed_at: self.last_accessed_at,
            archived_at: self.archived_at,
            storage_url: self.storage_url,
            thumbnail_url: self.thumbnail_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::NewFile;
    use crate::folder::{Folder, NewFolder};
    use crate::tag::{NewTag, Tag, TagRepository};
    use crate::validation;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn folder(db: &Database, name: &str) -> Folder {
        let folder = Folder::create(NewFolder::new(name), None).unwrap();
        FolderRepository::new(db.pool()).create(&folder).await.unwrap()
    }

    async fn create(db: &Database, new: NewFile, folder: Option<&Folder>) -> File {
        let file = File::create(new, folder).unwrap();
        FileRepository::new(db.pool()).create(&file).await.unwrap()
    }

    async fn tag(db: &Database, name: &str) -> Tag {
        TagRepository::new(db.pool())
            .create(&Tag::create(NewTag::new(name, Color::new("#123456"))))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_round_trip() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let docs = folder(&db, "Docs").await;

        let metadata = FileMetadata::new(2048)
            .with_mime_type("video/mp4")
            .with_checksum("abc123")
            .with_video(1920, 1080, 12.5)
            .with_audio(AudioMetadata {
                duration_secs: 12.5,
                bitrate: Some(128_000),
                sample_rate: None,
            });
        let file = File::create(
            NewFile::new("clip.mp4", 2048)
                .in_folder(docs.id())
                .with_metadata(metadata)
                .with_color(Color::named("#abcdef", "sky"))
                .with_storage_url("s3://bucket/clip.mp4"),
            Some(&docs),
        )
        .unwrap();
        let created = repo.create(&file).await.unwrap();

        assert_eq!(created, file);
        assert_eq!(created.path(), "Docs/clip.mp4");
        assert_eq!(created.category(), FileCategory::Video);
        assert!(created.metadata().image.is_none());
        assert_eq!(
            repo.find_by_path("Docs/clip.mp4").await.unwrap().unwrap().id(),
            file.id()
        );
        assert!(repo.exists(file.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_size_limit_is_enforced() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool()).with_max_file_size(1000);

        let file = File::create(NewFile::new("big.bin", 1001), None).unwrap();
        match repo.create(&file).await {
            Err(FolioError::ValidationFailed(errors)) => {
                assert!(errors.has("metadata.size", validation::OUT_OF_RANGE))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_path_and_soft_delete() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let first = create(&db, NewFile::new("a.pdf", 1), None).await;

        let dup = File::create(NewFile::new("a.pdf", 1), None).unwrap();
        assert!(matches!(
            repo.create(&dup).await,
            Err(FolioError::DuplicateName(_))
        ));

        assert!(repo.delete(first.id()).await.unwrap());
        assert!(!repo.delete(first.id()).await.unwrap());
        assert!(repo.find_by_id(first.id()).await.unwrap().is_none());
        repo.create(&dup).await.unwrap();
    }

    #[tokio::test]
    async fn test_move_recomputes_path() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let docs = folder(&db, "Docs").await;
        let media = folder(&db, "Media").await;
        let file = create(&db, NewFile::new("a.pdf", 1).in_folder(docs.id()), Some(&docs)).await;

        let moved = repo
            .update(file.id(), &FileUpdate::new().folder_id(Some(media.id())))
            .await
            .unwrap();
        assert_eq!(moved.path(), "Media/a.pdf");
        assert_eq!(moved.folder_id(), Some(media.id()));

        let renamed = repo
            .update(file.id(), &FileUpdate::new().name("b.txt"))
            .await
            .unwrap();
        assert_eq!(renamed.path(), "Media/b.txt");
        assert_eq!(renamed.extension(), "txt");

        assert!(matches!(
            repo.update(file.id(), &FileUpdate::new().folder_id(Some("missing"))).await,
            Err(FolioError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_filters_and_totals() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let docs = folder(&db, "Docs").await;
        create(&db, NewFile::new("a.pdf", 100).in_folder(docs.id()), Some(&docs)).await;
        create(&db, NewFile::new("b.PNG", 300).in_folder(docs.id()), Some(&docs)).await;
        create(
            &db,
            NewFile::new("notes.txt", 50).with_description("meeting PDF export"),
            None,
        )
        .await;

        assert_eq!(repo.find_by_folder(Some(docs.id())).await.unwrap().len(), 2);
        assert_eq!(repo.find_by_folder(None).await.unwrap().len(), 1);
        assert_eq!(repo.find_by_extension(".png").await.unwrap().len(), 1);
        assert_eq!(
            repo.find_by_category(FileCategory::Document).await.unwrap().len(),
            2
        );

        let found = repo.search("pdf", &FileFilter::new()).await.unwrap();
        let names: Vec<&str> = found.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a.pdf", "notes.txt"]);

        let by_size = repo
            .find_all(&FileFilter::new().sort(SortField::Size, SortDirection::Desc))
            .await
            .unwrap();
        assert_eq!(by_size[0].name(), "b.PNG");

        let filter = FileFilter::new().folder(Some(docs.id()));
        assert_eq!(repo.total_size(&filter).await.unwrap(), 400);
        assert_eq!(
            repo.count(&FileFilter::new().size_between(Some(60), Some(200)))
                .await
                .unwrap(),
            1
        );

        let page = repo
            .find_page(&FileFilter::new(), PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_items, 3);
    }

    #[tokio::test]
    async fn test_tags_are_hydrated_and_replaced() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let t1 = tag(&db, "t1").await;
        let t2 = tag(&db, "t2").await;
        let file = create(
            &db,
            NewFile::new("a.pdf", 1).with_tags(vec![t1.id.clone(), t2.id.clone()]),
            None,
        )
        .await;
        assert_eq!(file.tag_ids().len(), 2);
        assert_eq!(repo.find_by_tags(&[t2.id.clone()], true).await.unwrap().len(), 1);

        let updated = repo.update_tags(file.id(), &[t2.id.clone()]).await.unwrap();
        assert_eq!(updated.tag_ids(), &[t2.id.clone()]);
        assert!(repo.find_by_tags(&[t1.id.clone()], false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_access() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let file = create(&db, NewFile::new("a.pdf", 1), None).await;
        assert!(file.last_accessed_at().is_none());

        repo.record_access(file.id()).await.unwrap();
        let reloaded = repo.find_by_id(file.id()).await.unwrap().unwrap();
        assert!(reloaded.last_accessed_at().is_some());
    }
}
