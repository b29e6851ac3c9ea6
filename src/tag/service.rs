//! Tag service for Folio.
//!
//! Enforces name uniqueness among active tags, protects system tags and
//! checks that subjects and tags exist before touching assignments.

use std::collections::HashSet;

use tracing::{info, warn};

use super::assignment::{
    PopularTag, SubjectKind, TagAssignmentStats, TagAssignments, TagSubject, TagTreeNode,
};
use super::defaults::{default_tags, SeedReport, SkippedTag};
use super::model::{NewTag, Tag, TagUpdate};
use super::repository::{TagFilter, TagRepository};
use super::DEFAULT_TREE_DEPTH;
use crate::db::Database;
use crate::file::FileRepository;
use crate::folder::FolderRepository;
use crate::{FolioError, Result};

/// Service for tag management and assignment.
pub struct TagService<'a> {
    db: &'a Database,
    max_tree_depth: usize,
}

impl<'a> TagService<'a> {
    /// Create a new TagService with the given database reference.
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            max_tree_depth: DEFAULT_TREE_DEPTH,
        }
    }

    /// Set the depth bound of [`TagService::tree`].
    pub fn with_max_tree_depth(mut self, max_tree_depth: usize) -> Self {
        self.max_tree_depth = max_tree_depth.max(1);
        self
    }

    fn repo(&self) -> TagRepository<'_> {
        TagRepository::new(self.db.pool())
    }

    fn assignments(&self) -> TagAssignments<'_> {
        TagAssignments::new(self.db.pool())
    }

    /// Fail with `DuplicateName` if another active tag uses `name`.
    async fn ensure_name_free(&self, name: &str, except: Option<&str>) -> Result<()> {
        if let Some(existing) = self.repo().find_by_name(name).await? {
            if Some(existing.id()) != except {
                return Err(FolioError::DuplicateName(format!(
                    "a tag named '{}' already exists",
                    name.trim()
                )));
            }
        }
        Ok(())
    }

    /// Get an active tag.
    pub async fn get(&self, id: &str) -> Result<Tag> {
        self.repo()
            .find_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("tag", id))
    }

    pub async fn list(&self, filter: &TagFilter) -> Result<Vec<Tag>> {
        self.repo().find_all(filter).await
    }

    pub async fn search(&self, text: &str) -> Result<Vec<Tag>> {
        self.repo().search(text, &TagFilter::new()).await
    }

    /// Create a tag with a unique name.
    pub async fn create(&self, new: NewTag) -> Result<Tag> {
        let tag = Tag::create(new);
        FolioError::check(tag.validate())?;
        self.ensure_name_free(tag.name(), None).await?;
        if let Some(parent_id) = tag.parent_id() {
            if !self.repo().exists(parent_id).await? {
                return Err(FolioError::not_found("tag", parent_id));
            }
        }

        self.repo().create(&tag).await
    }

    /// Rename a tag; the new name must not belong to another active tag.
    pub async fn rename(&self, id: &str, name: &str) -> Result<Tag> {
        self.get(id).await?;
        self.ensure_name_free(name, Some(id)).await?;
        let tag = self.repo().update(id, &TagUpdate::new().name(name)).await?;
        info!(tag_id = %id, name = %tag.name(), "Renamed tag");
        Ok(tag)
    }

    /// Apply a patch to a tag.
    pub async fn update(&self, id: &str, update: &TagUpdate) -> Result<Tag> {
        self.get(id).await?;
        if let Some(ref name) = update.name {
            self.ensure_name_free(name, Some(id)).await?;
        }
        self.repo().update(id, update).await
    }

    /// Move a tag under another tag, or make it a root tag.
    pub async fn set_parent(&self, id: &str, parent_id: Option<&str>) -> Result<Tag> {
        self.repo()
            .update(id, &TagUpdate::new().parent_id(parent_id))
            .await
    }

    /// Deactivate a tag. System tags cannot be removed.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let tag = self.get(id).await?;
        if tag.is_system() {
            return Err(FolioError::ProtectedResourceViolation(format!(
                "system tag '{}' cannot be deleted",
                tag.name()
            )));
        }

        self.repo().delete(id).await?;
        info!(tag_id = %id, name = %tag.name(), "Deactivated tag");
        Ok(())
    }

    /// Reactivate a deactivated tag if its name is still free.
    pub async fn reactivate(&self, id: &str) -> Result<Tag> {
        let tag = self
            .repo()
            .find_any_by_id(id)
            .await?
            .ok_or_else(|| FolioError::not_found("tag", id))?;
        if !tag.is_active() {
            self.ensure_name_free(tag.name(), Some(id)).await?;
            self.repo().reactivate(id).await?;
        }
        self.get(id).await
    }

    /// Create all tags or none of them.
    pub async fn create_many(&self, news: Vec<NewTag>) -> Result<Vec<Tag>> {
        let tags: Vec<Tag> = news.into_iter().map(Tag::create).collect();

        let mut seen = HashSet::new();
        for tag in &tags {
            FolioError::check(tag.validate())?;
            if !seen.insert(tag.name().to_string()) {
                return Err(FolioError::DuplicateName(format!(
                    "tag '{}' appears more than once",
                    tag.name()
                )));
            }
            self.ensure_name_free(tag.name(), None).await?;
        }

        self.repo().create_many(&tags).await
    }

    /// Install the default tags, skipping those that already exist.
    ///
    /// Failures do not stop the seeding; they are reported as skipped.
    pub async fn seed_defaults(&self) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        for new in default_tags() {
            let name = new.name.clone();
            if self.repo().find_by_name(&name).await?.is_some() {
                report.skipped.push(SkippedTag {
                    name,
                    reason: "already exists".to_string(),
                });
                continue;
            }

            match self.create(new).await {
                Ok(tag) => report.created.push(tag),
                Err(e) => {
                    warn!(name = %name, error = %e, "Failed to seed default tag");
                    report.skipped.push(SkippedTag {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            created = report.created.len(),
            skipped = report.skipped.len(),
            "Seeded default tags"
        );
        Ok(report)
    }

    async fn ensure_subject(&self, subject: &TagSubject) -> Result<()> {
        let exists = match subject.kind() {
            SubjectKind::File => FileRepository::new(self.db.pool()).exists(subject.id()).await?,
            SubjectKind::Folder => {
                FolderRepository::new(self.db.pool())
                    .exists(subject.id())
                    .await?
            }
        };
        if !exists {
            return Err(FolioError::not_found(subject.kind().entity(), subject.id()));
        }
        Ok(())
    }

    async fn ensure_tags(&self, tag_ids: &[String]) -> Result<()> {
        let found: HashSet<String> = self
            .repo()
            .find_by_ids(tag_ids)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        match tag_ids.iter().find(|id| !found.contains(*id)) {
            Some(missing) => Err(FolioError::not_found("tag", missing)),
            None => Ok(()),
        }
    }

    async fn assign(&self, subject: TagSubject, tag_ids: &[String]) -> Result<Vec<String>> {
        self.ensure_subject(&subject).await?;
        self.ensure_tags(tag_ids).await?;
        self.assignments().assign(&subject, tag_ids).await
    }

    async fn unassign(&self, subject: TagSubject, tag_ids: &[String]) -> Result<Vec<String>> {
        self.ensure_subject(&subject).await?;
        self.assignments().unassign(&subject, tag_ids).await
    }

    async fn replace(&self, subject: TagSubject, tag_ids: &[String]) -> Result<Vec<String>> {
        self.ensure_subject(&subject).await?;
        self.ensure_tags(tag_ids).await?;
        self.assignments().replace(&subject, tag_ids).await
    }

    /// Assign tags to a file. Returns the newly added tag ids.
    pub async fn assign_to_file(&self, file_id: &str, tag_ids: &[String]) -> Result<Vec<String>> {
        self.assign(TagSubject::file(file_id), tag_ids).await
    }

    /// Assign tags to a folder. Returns the newly added tag ids.
    pub async fn assign_to_folder(
        &self,
        folder_id: &str,
        tag_ids: &[String],
    ) -> Result<Vec<String>> {
        self.assign(TagSubject::folder(folder_id), tag_ids).await
    }

    pub async fn unassign_from_file(
        &self,
        file_id: &str,
        tag_ids: &[String],
    ) -> Result<Vec<String>> {
        self.unassign(TagSubject::file(file_id), tag_ids).await
    }

    pub async fn unassign_from_folder(
        &self,
        folder_id: &str,
        tag_ids: &[String],
    ) -> Result<Vec<String>> {
        self.unassign(TagSubject::folder(folder_id), tag_ids).await
    }

    /// Replace the tag set of a file.
    pub async fn set_file_tags(&self, file_id: &str, tag_ids: &[String]) -> Result<Vec<String>> {
        self.replace(TagSubject::file(file_id), tag_ids).await
    }

    /// Replace the tag set of a folder.
    pub async fn set_folder_tags(
        &self,
        folder_id: &str,
        tag_ids: &[String],
    ) -> Result<Vec<String>> {
        self.replace(TagSubject::folder(folder_id), tag_ids).await
    }

    pub async fn tags_of_file(&self, file_id: &str) -> Result<Vec<Tag>> {
        self.assignments().tags_of(&TagSubject::file(file_id)).await
    }

    pub async fn tags_of_folder(&self, folder_id: &str) -> Result<Vec<Tag>> {
        self.assignments().tags_of(&TagSubject::folder(folder_id)).await
    }

    /// Deactivate unused non-system tags.
    pub async fn cleanup_unused(&self) -> Result<Vec<String>> {
        self.assignments().cleanup_unused_tags().await
    }

    pub async fn recount_usage(&self) -> Result<u64> {
        self.assignments().recount_usage().await
    }

    /// The active tag forest, bounded by the configured depth.
    pub async fn tree(&self) -> Result<Vec<TagTreeNode>> {
        self.assignments().tag_tree(self.max_tree_depth).await
    }

    pub async fn stats(&self, tag_id: &str) -> Result<TagAssignmentStats> {
        self.assignments().assignment_stats(tag_id).await
    }

    pub async fn popular(&self, limit: u32) -> Result<Vec<PopularTag>> {
        self.assignments().popular_tags(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagType;
    use crate::types::Color;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn red(name: &str) -> NewTag {
        NewTag::new(name, Color::new("#ff0000"))
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let db = setup_db().await;
        let service = TagService::new(&db);

        service.create(red("Work")).await.unwrap();
        assert!(matches!(
            service.create(red(" Work ")).await,
            Err(FolioError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_create_with_missing_parent_fails() {
        let db = setup_db().await;
        let service = TagService::new(&db);
        assert!(matches!(
            service.create(red("Child").with_parent("nope")).await,
            Err(FolioError::NotFound { entity: "tag", .. })
        ));
    }

    #[tokio::test]
    async fn test_rename_scenario() {
        let db = setup_db().await;
        let service = TagService::new(&db);

        let work = service.create(red("Work")).await.unwrap();
        service.create(red("Life")).await.unwrap();

        assert!(matches!(
            service.rename(work.id(), "Life").await,
            Err(FolioError::DuplicateName(_))
        ));
        let renamed = service.rename(work.id(), "Job").await.unwrap();
        assert_eq!(renamed.name(), "Job");
        // Renaming to the current name is allowed.
        service.rename(work.id(), "Job").await.unwrap();
    }

    #[tokio::test]
    async fn test_system_tag_cannot_be_deleted() {
        let db = setup_db().await;
        let service = TagService::new(&db);

        let system = service
            .create(red("Inbox").with_type(TagType::System))
            .await
            .unwrap();
        assert!(matches!(
            service.delete(system.id()).await,
            Err(FolioError::ProtectedResourceViolation(_))
        ));
        assert!(service.get(system.id()).await.is_ok());

        let user = service.create(red("Scratch")).await.unwrap();
        service.delete(user.id()).await.unwrap();
        assert!(matches!(
            service.get(user.id()).await,
            Err(FolioError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reactivate_checks_name() {
        let db = setup_db().await;
        let service = TagService::new(&db);

        let old = service.create(red("Work")).await.unwrap();
        service.delete(old.id()).await.unwrap();
        let new = service.create(red("Work")).await.unwrap();

        assert!(matches!(
            service.reactivate(old.id()).await,
            Err(FolioError::DuplicateName(_))
        ));
        service.delete(new.id()).await.unwrap();
        assert!(service.reactivate(old.id()).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_create_many_rejects_batch_duplicates() {
        let db = setup_db().await;
        let service = TagService::new(&db);

        assert!(matches!(
            service.create_many(vec![red("a"), red("a")]).await,
            Err(FolioError::DuplicateName(_))
        ));
        assert!(service.list(&TagFilter::new()).await.unwrap().is_empty());

        let created = service.create_many(vec![red("a"), red("b")]).await.unwrap();
        assert_eq!(created.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_defaults_is_idempotent() {
        let db = setup_db().await;
        let service = TagService::new(&db);

        let first = service.seed_defaults().await.unwrap();
        assert_eq!(first.created.len(), default_tags().len());
        assert!(first.is_complete());

        let second = service.seed_defaults().await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.skipped.len(), default_tags().len());
        assert_eq!(second.skipped[0].reason, "already exists");
    }

    #[tokio::test]
    async fn test_set_parent_detects_cycle() {
        let db = setup_db().await;
        let service = TagService::new(&db);

        let a = service.create(red("a")).await.unwrap();
        let b = service.create(red("b").with_parent(a.id())).await.unwrap();

        assert!(matches!(
            service.set_parent(a.id(), Some(b.id())).await,
            Err(FolioError::CycleDetected(_))
        ));
        let b = service.set_parent(b.id(), None).await.unwrap();
        assert!(b.parent_id().is_none());
    }

    #[tokio::test]
    async fn test_assign_to_missing_subject_fails() {
        let db = setup_db().await;
        let service = TagService::new(&db);
        let tag = service.create(red("Work")).await.unwrap();

        assert!(matches!(
            service.assign_to_file("nope", &[tag.id.clone()]).await,
            Err(FolioError::NotFound { entity: "file", .. })
        ));
        assert!(matches!(
            service.assign_to_folder("nope", &[tag.id.clone()]).await,
            Err(FolioError::NotFound { entity: "folder", .. })
        ));
    }
}
