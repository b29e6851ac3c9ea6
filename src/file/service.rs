//! File service for Folio.
//!
//! Checks that run before any write: the target folder is live, names are
//! unique within a folder, and the size stays within the configured limit.

use tracing::info;

use super::model::{File, FileStatus, FileUpdate, NewFile};
use super::repository::{FileFilter, FileRepository};
use super::DEFAULT_MAX_FILE_SIZE;
use crate::db::Database;
use crate::folder::{Folder, FolderRepository};
use crate::tag::TagRepository;
use crate::{FolioError, Result};

/// Service for file operations.
pub struct FileService<'a> {
    db: &'a Database,
    max_file_size: u64,
}

impl<'a> FileService<'a> {
    /// Create a new FileService with the given database reference.
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the maximum file size in bytes.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    fn repo(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool()).with_max_file_size(self.max_file_size)
    }

    async fn find_folder(&self, folder_id: Option<&str>) -> Result<Option<Folder>> {
        match folder_id {
            Some(fid) => Ok(Some(
                FolderRepository::new(self.db.pool())
                    .find_by_id(fid)
                    .await?
                    .ok_or_else(|| FolioError::not_found("folder", fid))?,
            )),
            None => Ok(None),
        }
    }

    /// Fail with `DuplicateName` if a live file other than `except` in the
    /// same folder is already called `name`.
    async fn ensure_unique_in_folder(
        &self,
        name: &str,
        folder_id: Option<&str>,
        except: Option<&str>,
    ) -> Result<()> {
        if let Some(existing) = self.repo().find_by_name_in_folder(name, folder_id).await? {
            if Some(existing.id()) != except {
                return Err(FolioError::DuplicateName(format!(
                    "a file named '{}' already exists here",
                    name.trim()
                )));
            }
        }
        Ok(())
    }

    async fn ensure_tags_exist(&self, tag_ids: &[String]) -> Result<()> {
        let found = TagRepository::new(self.db.pool()).find_by_ids(tag_ids).await?;
        match tag_ids.iter().find(|id| !found.iter().any(|t| t.id() == id.as_str())) {
            Some(missing) => Err(FolioError::not_found("tag", missing)),
            None => Ok(()),
        }
    }

    /// Get a live file.
    pub async fn get(&self, id: &str) -> Result<File> {
        self.repo()
            .find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("file", id))
    }

    /// Get a live file and record the access.
    pub async fn open(&self, id: &str) -> Result<File> {
        self.get(id).await?;
        self.repo().record_access(id).await?;
        self.get(id).await
    }

    /// Live files directly in a folder, or outside any folder for `None`.
    pub async fn list_in_folder(&self, folder_id: Option<&str>) -> Result<Vec<File>> {
        self.find_folder(folder_id).await?;
        self.repo().find_by_folder(folder_id).await
    }

    pub async fn list(&self, filter: &FileFilter) -> Result<Vec<File>> {
        self.repo().find_all(filter).await
    }

    pub async fn search(&self, text: &str) -> Result<Vec<File>> {
        self.repo().search(text, &FileFilter::new()).await
    }

    /// Create a file in a live folder (or outside any folder).
    pub async fn create(&self, new: NewFile) -> Result<File> {
        let folder = self.find_folder(new.folder_id.as_deref()).await?;
        let file = File::create(new, folder.as_ref())?;
        FolioError::check(file.validate_with_limit(self.max_file_size))?;

        self.ensure_unique_in_folder(file.name(), file.folder_id(), None)
            .await?;
        self.ensure_tags_exist(file.tag_ids()).await?;

        self.repo().create(&file).await
    }

    /// Rename a file; names stay unique within the folder.
    pub async fn rename(&self, id: &str, name: &str) -> Result<File> {
        let file = self.get(id).await?;
        self.ensure_unique_in_folder(name, file.folder_id(), Some(id))
            .await?;

        let renamed = self.repo().update(id, &FileUpdate::new().name(name)).await?;
        info!(file_id = %id, from = %file.path(), to = %renamed.path(), "Renamed file");
        Ok(renamed)
    }

    /// Move a file into another live folder, or out of any folder.
    pub async fn move_file(&self, id: &str, folder_id: Option<&str>) -> Result<File> {
        let file = self.get(id).await?;
        self.find_folder(folder_id).await?;
        self.ensure_unique_in_folder(file.name(), folder_id, Some(id))
            .await?;

        let moved = self
            .repo()
            .update(id, &FileUpdate::new().folder_id(folder_id))
            .await?;
        info!(file_id = %id, from = %file.path(), to = %moved.path(), "Moved file");
        Ok(moved)
    }

    /// Apply a non-structural patch. Use [`FileService::rename`] and
    /// [`FileService::move_file`] for name and folder changes, and
    /// [`FileService::delete`] to delete.
    pub async fn update(&self, id: &str, update: &FileUpdate) -> Result<File> {
        if update.is_structural() {
            return Err(FolioError::InvalidState(
                "name and folder changes go through rename and move_file".to_string(),
            ));
        }
        if update.status == Some(FileStatus::Deleted) {
            return Err(FolioError::InvalidState(
                "files are deleted through delete".to_string(),
            ));
        }
        self.get(id).await?;
        self.repo().update(id, update).await
    }

    /// Soft-delete a file.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let file = self.get(id).await?;
        self.repo().delete(id).await?;
        info!(file_id = %id, path = %file.path(), "Deleted file");
        Ok(())
    }

    pub async fn archive(&self, id: &str) -> Result<File> {
        self.get(id).await?;
        self.repo()
            .update(id, &FileUpdate::new().status(FileStatus::Archived))
            .await
    }

    pub async fn restore(&self, id: &str) -> Result<File> {
        self.get(id).await?;
        self.repo()
            .update(id, &FileUpdate::new().status(FileStatus::Active))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folder::{FolderService, NewFolder};
    use crate::validation;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_in_folder() {
        let db = setup_db().await;
        let docs = FolderService::new(&db)
            .create(NewFolder::new("Docs"))
            .await
            .unwrap();
        let service = FileService::new(&db);

        let file = service
            .create(NewFile::new("a.pdf", 10).in_folder(docs.id()))
            .await
            .unwrap();
        assert_eq!(file.path(), "Docs/a.pdf");
        assert_eq!(service.list_in_folder(Some(docs.id())).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_in_missing_or_deleted_folder_fails() {
        let db = setup_db().await;
        let folders = FolderService::new(&db);
        let service = FileService::new(&db);

        assert!(matches!(
            service.create(NewFile::new("a.pdf", 1).in_folder("nope")).await,
            Err(FolioError::NotFound { entity: "folder", .. })
        ));

        let gone = folders.create(NewFolder::new("Gone")).await.unwrap();
        folders.delete(gone.id(), false).await.unwrap();
        assert!(matches!(
            service.create(NewFile::new("a.pdf", 1).in_folder(gone.id())).await,
            Err(FolioError::NotFound { entity: "folder", .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_in_folder_fails() {
        let db = setup_db().await;
        let service = FileService::new(&db);

        service.create(NewFile::new("a.pdf", 1)).await.unwrap();
        assert!(matches!(
            service.create(NewFile::new(" a.pdf", 1)).await,
            Err(FolioError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_size_limit_from_service() {
        let db = setup_db().await;
        let service = FileService::new(&db).with_max_file_size(100);

        match service.create(NewFile::new("big.bin", 101)).await {
            Err(FolioError::ValidationFailed(errors)) => {
                assert!(errors.has("metadata.size", validation::OUT_OF_RANGE))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        service.create(NewFile::new("ok.bin", 100)).await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_and_move() {
        let db = setup_db().await;
        let folders = FolderService::new(&db);
        let a = folders.create(NewFolder::new("A")).await.unwrap();
        let b = folders.create(NewFolder::new("B")).await.unwrap();
        let service = FileService::new(&db);

        let one = service
            .create(NewFile::new("one.txt", 1).in_folder(a.id()))
            .await
            .unwrap();
        service
            .create(NewFile::new("two.txt", 1).in_folder(b.id()))
            .await
            .unwrap();

        let renamed = service.rename(one.id(), "two.txt").await.unwrap();
        assert_eq!(renamed.path(), "A/two.txt");

        assert!(matches!(
            service.move_file(one.id(), Some(b.id())).await,
            Err(FolioError::DuplicateName(_))
        ));
        let moved = service.move_file(one.id(), None).await.unwrap();
        assert_eq!(moved.path(), "two.txt");
        assert_eq!(moved.folder_id(), None);
    }

    #[tokio::test]
    async fn test_update_rejects_structural_patch() {
        let db = setup_db().await;
        let service = FileService::new(&db);
        let file = service.create(NewFile::new("a.pdf", 1)).await.unwrap();

        assert!(matches!(
            service.update(file.id(), &FileUpdate::new().name("b.pdf")).await,
            Err(FolioError::InvalidState(_))
        ));
        let updated = service
            .update(file.id(), &FileUpdate::new().description(Some("scan")))
            .await
            .unwrap();
        assert_eq!(updated.description(), Some("scan"));
    }

    #[tokio::test]
    async fn test_update_cannot_delete() {
        let db = setup_db().await;
        let service = FileService::new(&db);
        let file = service.create(NewFile::new("a.pdf", 1)).await.unwrap();

        assert!(matches!(
            service
                .update(file.id(), &FileUpdate::new().status(FileStatus::Deleted))
                .await,
            Err(FolioError::InvalidState(_))
        ));
        assert_eq!(service.get(file.id()).await.unwrap().status(), FileStatus::Active);
    }

    #[tokio::test]
    async fn test_archive_restore_delete() {
        let db = setup_db().await;
        let service = FileService::new(&db);
        let file = service.create(NewFile::new("a.pdf", 1)).await.unwrap();

        let archived = service.archive(file.id()).await.unwrap();
        assert_eq!(archived.status(), FileStatus::Archived);
        assert!(archived.archived_at().is_some());

        let restored = service.restore(file.id()).await.unwrap();
        assert_eq!(restored.status(), FileStatus::Active);

        service.delete(file.id()).await.unwrap();
        assert!(matches!(
            service.get(file.id()).await,
            Err(FolioError::NotFound { entity: "file", .. })
        ));
        assert!(service.search("a.pdf").await.unwrap().is_empty());
    }
}
