//! Folder service for Folio.
//!
//! Checks that run before any write: parent existence, sibling name
//! uniqueness, cycle prevention, the nesting limit and deletion guards.

use tracing::info;

use super::hierarchy::Hierarchy;
use super::model::{Folder, FolderStatus, FolderUpdate, NewFolder};
use super::repository::{FolderFilter, FolderRepository};
use super::DEFAULT_MAX_DEPTH;
use crate::db::Database;
use crate::tag::TagRepository;
use crate::{FolioError, Result};

/// Service for folder operations.
pub struct FolderService<'a> {
    db: &'a Database,
    max_depth: i64,
}

impl<'a> FolderService<'a> {
    /// Create a new FolderService with the given database reference.
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the maximum number of nesting levels.
    pub fn with_max_depth(mut self, max_depth: i64) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    fn repo(&self) -> FolderRepository<'_> {
        FolderRepository::new(self.db.pool())
    }

    fn hierarchy(&self) -> Hierarchy<'_> {
        Hierarchy::new(self.db.pool()).with_max_depth(self.max_depth)
    }

    async fn find_parent(&self, parent_id: Option<&str>) -> Result<Option<Folder>> {
        match parent_id {
            Some(pid) => Ok(Some(
                self.repo()
                    .find_by_id(pid)
                    .await?
                    .ok_or_else(|| FolioError::not_found("folder", pid))?,
            )),
            None => Ok(None),
        }
    }

    /// Fail with `DuplicateName` if a live sibling other than `except` is
    /// already called `name`.
    async fn ensure_unique_sibling(
        &self,
        name: &str,
        parent_id: Option<&str>,
        except: Option<&str>,
    ) -> Result<()> {
        if let Some(existing) = self.repo().find_by_name_in_parent(name, parent_id).await? {
            if Some(existing.id()) != except {
                return Err(FolioError::DuplicateName(format!(
                    "a folder named '{}' already exists here",
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

    /// Get a live folder.
    pub async fn get(&self, id: &str) -> Result<Folder> {
        self.repo()
            .find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("folder", id))
    }

    /// Get a live folder and record the access.
    pub async fn open(&self, id: &str) -> Result<Folder> {
        self.get(id).await?;
        self.repo().record_access(id).await?;
        self.get(id).await
    }

    /// Live subfolders of a folder, or the live roots for `None`.
    pub async fn children(&self, parent_id: Option<&str>) -> Result<Vec<Folder>> {
        if let Some(pid) = parent_id {
            self.get(pid).await?;
        }
        self.repo().find_by_parent(parent_id).await
    }

    /// The folder's ancestors followed by the folder itself.
    pub async fn breadcrumbs(&self, id: &str) -> Result<Vec<Folder>> {
        let folder = self.get(id).await?;
        let mut chain = self.hierarchy().ancestors(id).await?;
        chain.push(folder);
        Ok(chain)
    }

    pub async fn search(&self, text: &str) -> Result<Vec<Folder>> {
        self.repo().search(text, &FolderFilter::new()).await
    }

    pub async fn list(&self, filter: &FolderFilter) -> Result<Vec<Folder>> {
        self.repo().find_all(filter).await
    }

    /// Create a folder under a live parent (or at the root).
    pub async fn create(&self, new: NewFolder) -> Result<Folder> {
        let parent = self.find_parent(new.parent_id.as_deref()).await?;
        let folder = Folder::create(new, parent.as_ref())?;
        FolioError::check(folder.validate())?;

        self.ensure_unique_sibling(folder.name(), folder.parent_id(), None)
            .await?;
        self.hierarchy().ensure_depth(parent.as_ref(), 0)?;
        self.ensure_tags_exist(folder.tag_ids()).await?;

        self.repo().create(&folder).await
    }

    /// Rename a folder; siblings keep unique names.
    pub async fn rename(&self, id: &str, name: &str) -> Result<Folder> {
        let folder = self.get(id).await?;
        self.ensure_unique_sibling(name, folder.parent_id(), Some(id))
            .await?;

        let renamed = self.repo().update(id, &FolderUpdate::new().name(name)).await?;
        info!(folder_id = %id, from = %folder.path(), to = %renamed.path(), "Renamed folder");
        Ok(renamed)
    }

    /// Move a folder under another live folder, or to the root.
    pub async fn move_folder(&self, id: &str, new_parent_id: Option<&str>) -> Result<Folder> {
        let folder = self.get(id).await?;
        let hierarchy = self.hierarchy();

        hierarchy.ensure_can_move(id, new_parent_id).await?;
        let parent = self.find_parent(new_parent_id).await?;
        self.ensure_unique_sibling(folder.name(), new_parent_id, Some(id))
            .await?;
        let height = hierarchy.subtree_height(id).await?;
        hierarchy.ensure_depth(parent.as_ref(), height)?;

        let moved = self
            .repo()
            .update(id, &FolderUpdate::new().parent_id(new_parent_id))
            .await?;
        info!(folder_id = %id, from = %folder.path(), to = %moved.path(), "Moved folder");
        Ok(moved)
    }

    /// Apply a non-structural patch. Use [`FolderService::rename`] and
    /// [`FolderService::move_folder`] for name and parent changes, and
    /// [`FolderService::delete`] to delete.
    pub async fn update(&self, id: &str, update: &FolderUpdate) -> Result<Folder> {
        if update.is_structural() {
            return Err(FolioError::InvalidState(
                "name and parent changes go through rename and move_folder".to_string(),
            ));
        }
        if update.status == Some(FolderStatus::Deleted) {
            return Err(FolioError::InvalidState(
                "folders are deleted through delete".to_string(),
            ));
        }
        self.get(id).await?;
        self.repo().update(id, update).await
    }

    /// Soft-delete a folder.
    ///
    /// Protected and system folders are refused. A folder with live content
    /// is refused unless `force`. Only the folder's own row is marked; its
    /// content is left as it is.
    pub async fn delete(&self, id: &str, force: bool) -> Result<()> {
        let folder = self.get(id).await?;
        if !folder.is_deletable() {
            return Err(FolioError::ProtectedResourceViolation(format!(
                "folder '{}' is protected",
                folder.path()
            )));
        }

        if !force {
            let children = self.repo().count_children(id).await?;
            if children > 0 {
                return Err(FolioError::NonEmptyFolder {
                    id: id.to_string(),
                    children,
                });
            }
        }

        if !self.repo().delete(id).await? {
            return Err(FolioError::not_found("folder", id));
        }
        info!(folder_id = %id, path = %folder.path(), force, "Deleted folder");
        Ok(())
    }

    pub async fn archive(&self, id: &str) -> Result<Folder> {
        self.get(id).await?;
        self.repo()
            .update(id, &FolderUpdate::new().status(FolderStatus::Archived))
            .await
    }

    pub async fn restore(&self, id: &str) -> Result<Folder> {
        self.get(id).await?;
        self.repo()
            .update(id, &FolderUpdate::new().status(FolderStatus::Active))
            .await
    }

    /// Set or clear protection. System folders stay protected.
    pub async fn set_protected(&self, id: &str, is_protected: bool) -> Result<Folder> {
        self.get(id).await?;
        self.repo()
            .update(id, &FolderUpdate::new().protected(is_protected))
            .await
    }
}
