//! Hierarchy maintenance for folders.
//!
//! Keeps the folder forest acyclic and the stored paths consistent. Paths are
//! a cached denormalization of the ancestor chain; every rename or move
//! rewrites the paths of the whole subtree in the same transaction.

use std::collections::VecDeque;

use sqlx::SqliteConnection;
use tracing::debug;

use super::model::{compute_level, compute_path, Folder};
use super::repository::FolderRepository;
use super::DEFAULT_MAX_DEPTH;
use crate::db::DbPool;
use crate::error::persistence;
use crate::validation::{self, FieldError};
use crate::{FolioError, Result};

/// Upper bound on ancestor walks; only a corrupt store can reach it.
const MAX_WALK_STEPS: usize = 10_000;

/// Read-side hierarchy checks and lookups.
pub struct Hierarchy<'a> {
    pool: &'a DbPool,
    max_depth: i64,
}

impl<'a> Hierarchy<'a> {
    /// Create a new Hierarchy with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the maximum number of nesting levels.
    pub fn with_max_depth(mut self, max_depth: i64) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn max_depth(&self) -> i64 {
        self.max_depth
    }

    /// Parent reference of a folder row, regardless of its status.
    ///
    /// `None` means the row does not exist.
    async fn parent_of(&self, id: &str) -> Result<Option<Option<String>>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT parent_id FROM folders WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await
                .map_err(persistence("read folder parent"))?;
        Ok(row.map(|(parent_id,)| parent_id))
    }

    /// Fail with `CycleDetected` if moving `folder_id` under `new_parent_id`
    /// would make the folder its own ancestor.
    ///
    /// Walks from the new parent up to the root. A missing row ends the walk
    /// as if the root had been reached.
    pub async fn ensure_can_move(&self, folder_id: &str, new_parent_id: Option<&str>) -> Result<()> {
        let Some(start) = new_parent_id else {
            return Ok(());
        };

        let mut current = start.to_string();
        for _ in 0..MAX_WALK_STEPS {
            if current == folder_id {
                return Err(FolioError::CycleDetected(format!(
                    "folder {folder_id} cannot be moved under itself or one of its descendants"
                )));
            }
            match self.parent_of(&current).await? {
                Some(Some(parent)) => current = parent,
                Some(None) | None => return Ok(()),
            }
        }

        Err(FolioError::CycleDetected(format!(
            "ancestor chain of folder {start} does not terminate"
        )))
    }

    /// Live ancestors of a folder, root first. The folder itself is excluded.
    pub async fn ancestors(&self, folder_id: &str) -> Result<Vec<Folder>> {
        let repo = FolderRepository::new(self.pool);
        let folder = repo
            .find_by_id(folder_id)
            .await?
            .ok_or_else(|| FolioError::not_found("folder", folder_id))?;

        let mut chain = Vec::new();
        let mut next = folder.parent_id;
        while let Some(parent_id) = next {
            if chain.len() >= MAX_WALK_STEPS {
                return Err(FolioError::CycleDetected(format!(
                    "ancestor chain of folder {folder_id} does not terminate"
                )));
            }
            match repo.find_by_id(&parent_id).await? {
                Some(parent) => {
                    next = parent.parent_id.clone();
                    chain.push(parent);
                }
                None => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }

    /// Number of ancestors of a folder.
    pub async fn depth(&self, folder_id: &str) -> Result<i64> {
        Ok(self.ancestors(folder_id).await?.len() as i64)
    }

    /// Path computed from the live ancestor chain rather than the stored column.
    pub async fn full_path(&self, folder_id: &str) -> Result<String> {
        let repo = FolderRepository::new(self.pool);
        let folder = repo
            .find_by_id(folder_id)
            .await?
            .ok_or_else(|| FolioError::not_found("folder", folder_id))?;

        let mut path: Option<String> = None;
        for ancestor in self.ancestors(folder_id).await? {
            path = Some(compute_path(path.as_deref(), &ancestor.name));
        }
        Ok(compute_path(path.as_deref(), &folder.name))
    }

    /// Height of the live subtree below a folder (0 for a leaf).
    pub async fn subtree_height(&self, folder_id: &str) -> Result<i64> {
        let height: i64 = sqlx::query_scalar(
            "WITH RECURSIVE subtree(id, depth) AS (
                 SELECT id, 0 FROM folders WHERE id = ?
                 UNION ALL
                 SELECT f.id, s.depth + 1 FROM folders f
                 JOIN subtree s ON f.parent_id = s.id
                 WHERE f.status <> 'deleted' AND s.depth < ?
             )
             SELECT COALESCE(MAX(depth), 0) FROM subtree",
        )
        .bind(folder_id)
        .bind(MAX_WALK_STEPS as i64)
        .fetch_one(self.pool)
        .await
        .map_err(persistence("measure subtree"))?;
        Ok(height)
    }

    /// Fail if placing a subtree of `height` under `parent` exceeds the depth limit.
    pub fn ensure_depth(&self, parent: Option<&Folder>, height: i64) -> Result<()> {
        let deepest = compute_level(parent) + height;
        if deepest >= self.max_depth {
            return Err(FolioError::invalid(FieldError::new(
                "parent_id",
                format!("folders cannot be nested more than {} levels", self.max_depth),
                validation::MAX_DEPTH,
            )));
        }
        Ok(())
    }
}

/// Rewrite the stored path and level of every descendant of `folder`, and the
/// path of every file in the subtree, from `folder`'s current path.
///
/// Runs on the caller's connection so it can share the caller's transaction.
/// Returns the number of descendant folders rewritten.
pub(crate) async fn cascade_paths(conn: &mut SqliteConnection, folder: &Folder) -> Result<u64> {
    let mut queue: VecDeque<(String, String, i64)> = VecDeque::new();
    queue.push_back((folder.id.clone(), folder.path.clone(), folder.level));
    let mut rewritten = 0u64;

    while let Some((id, path, level)) = queue.pop_front() {
        sqlx::query("UPDATE files SET path = ? || '/' || name WHERE folder_id = ?")
            .bind(&path)
            .bind(&id)
            .execute(&mut *conn)
            .await
            .map_err(persistence("cascade file paths"))?;

        let children: Vec<(String, String)> =
            sqlx::query_as("SELECT id, name FROM folders WHERE parent_id = ?")
                .bind(&id)
                .fetch_all(&mut *conn)
                .await
                .map_err(persistence("cascade folder paths"))?;

        for (child_id, child_name) in children {
            if rewritten as usize >= MAX_WALK_STEPS {
                return Err(FolioError::CycleDetected(format!(
                    "subtree of folder {} does not terminate",
                    folder.id
                )));
            }
            let child_path = compute_path(Some(&path), &child_name);
            sqlx::query("UPDATE folders SET path = ?, level = ? WHERE id = ?")
                .bind(&child_path)
                .bind(level + 1)
                .bind(&child_id)
                .execute(&mut *conn)
                .await
                .map_err(persistence("cascade folder paths"))?;
            rewritten += 1;
            queue.push_back((child_id, child_path, level + 1));
        }
    }

    debug!(folder_id = %folder.id, rewritten, "Cascaded paths");
    Ok(rewritten)
}
