//! Folder repository implementation.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_core::types::pagination::PageRequest;
use stowage_entity::folder::{Folder, ROOT_FOLDER_NAME};

use super::is_unique_violation;

/// Upper bound on ancestor-chain walks; a longer chain means corrupt data.
const MAX_DEPTH: i64 = 10_000;

/// Repository for folder CRUD and tree queries.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: SqlitePool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a folder by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    /// Find the live root of an owner's tree.
    pub async fn find_live_root(&self, organization_id: Uuid, owner_id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE organization_id = ?1 AND owner_id = ?2 AND parent_id IS NULL AND is_deleted = 0",
        )
        .bind(organization_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find root folder", e))
    }

    /// Insert a new live root. Fails with `DuplicateName` if one already exists.
    pub async fn insert_root(&self, organization_id: Uuid, owner_id: Uuid) -> AppResult<Folder> {
        let mut conn = self.acquire().await?;
        insert(&mut conn, organization_id, owner_id, None, ROOT_FOLDER_NAME).await
    }

    /// Create a new child folder inside the caller's transaction.
    ///
    /// A live sibling with the same name yields `DuplicateName`.
    pub async fn create(
        conn: &mut SqliteConnection,
        organization_id: Uuid,
        owner_id: Uuid,
        parent_id: Uuid,
        name: &str,
    ) -> AppResult<Folder> {
        insert(conn, organization_id, owner_id, Some(parent_id), name).await
    }

    async fn acquire(&self) -> AppResult<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e))
    }

    /// Find a live child folder by exact name.
    pub async fn find_live_child_by_name(&self, parent_id: Uuid, name: &str) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE parent_id = ?1 AND name = ?2 AND is_deleted = 0",
        )
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find child folder", e))
    }

    /// Rename a folder.
    pub async fn rename(&self, folder_id: Uuid, new_name: &str) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>("UPDATE folders SET name = ?2 WHERE id = ?1 RETURNING *")
            .bind(folder_id)
            .bind(new_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::duplicate_name(new_name)
                } else {
                    AppError::with_source(ErrorKind::Database, "Failed to rename folder", e)
                }
            })?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }

    /// Re-parent a folder inside the caller's transaction.
    pub async fn set_parent(
        conn: &mut SqliteConnection,
        folder_id: Uuid,
        new_parent_id: Uuid,
    ) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>("UPDATE folders SET parent_id = ?2 WHERE id = ?1 RETURNING *")
            .bind(folder_id)
            .bind(new_parent_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::new(
                        ErrorKind::DuplicateName,
                        "A folder with the same name already exists in the target",
                    )
                } else {
                    AppError::with_source(ErrorKind::Database, "Failed to move folder", e)
                }
            })?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }

    /// One page of live child folders, ordered by name.
    pub async fn list_live_children(&self, parent_id: Uuid, page: &PageRequest) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE parent_id = ?1 AND is_deleted = 0 \
             ORDER BY name ASC, id ASC LIMIT ?2 OFFSET ?3",
        )
        .bind(parent_id)
        .bind(page.sql_limit())
        .bind(page.sql_offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    /// Number of live child folders.
    pub async fn count_live_children(&self, parent_id: Uuid) -> AppResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE parent_id = ?1 AND is_deleted = 0")
                .bind(parent_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count children", e)
                })?;
        Ok(count.max(0) as u64)
    }

    /// Every live child folder, ordered by name.
    pub async fn all_live_children(&self, parent_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE parent_id = ?1 AND is_deleted = 0 ORDER BY name ASC, id ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    /// The ancestor chain of a folder, ordered root to leaf, including the folder itself.
    pub async fn find_ancestors(&self, folder_id: Uuid) -> AppResult<Vec<Folder>> {
        let mut conn = self.acquire().await?;
        Self::ancestors_in(&mut conn, folder_id).await
    }

    /// [`find_ancestors`](Self::find_ancestors) inside the caller's transaction.
    pub async fn ancestors_in(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "WITH RECURSIVE chain(id, parent_id, depth) AS ( \
                SELECT id, parent_id, 0 FROM folders WHERE id = ?1 \
                UNION ALL \
                SELECT f.id, f.parent_id, c.depth + 1 FROM folders f \
                INNER JOIN chain c ON f.id = c.parent_id WHERE c.depth < ?2 \
             ) SELECT folders.* FROM folders INNER JOIN chain ON folders.id = chain.id \
             ORDER BY chain.depth DESC",
        )
        .bind(folder_id)
        .bind(MAX_DEPTH)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find ancestors", e))
    }

    /// A live folder, read inside the caller's transaction.
    pub async fn find_live_in(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?1 AND is_deleted = 0")
            .bind(folder_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    /// IDs of a live folder and all its live descendants.
    pub async fn live_subtree(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar(
            "WITH RECURSIVE subtree(id, depth) AS ( \
                SELECT id, 0 FROM folders WHERE id = ?1 AND is_deleted = 0 \
                UNION \
                SELECT f.id, s.depth + 1 FROM folders f \
                INNER JOIN subtree s ON f.parent_id = s.id \
                WHERE f.is_deleted = 0 AND s.depth < ?2 \
             ) SELECT DISTINCT id FROM subtree",
        )
        .bind(folder_id)
        .bind(MAX_DEPTH)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to walk subtree", e))
    }

    /// Flag folders deleted inside the caller's transaction.
    pub async fn mark_deleted(conn: &mut SqliteConnection, folder_ids: &[Uuid]) -> AppResult<u64> {
        let mut affected = 0;
        for id in folder_ids {
            let result = sqlx::query("UPDATE folders SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0")
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete folder", e)
                })?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    /// Whether a folder exists and is live, checked inside the caller's transaction.
    pub async fn is_live(conn: &mut SqliteConnection, folder_id: Uuid) -> AppResult<bool> {
        let live: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM folders WHERE id = ?1 AND is_deleted = 0")
                .bind(folder_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to check folder", e)
                })?;
        Ok(live.is_some())
    }
}

async fn insert(
    conn: &mut SqliteConnection,
    organization_id: Uuid,
    owner_id: Uuid,
    parent_id: Option<Uuid>,
    name: &str,
) -> AppResult<Folder> {
    sqlx::query_as::<_, Folder>(
        "INSERT INTO folders (id, organization_id, owner_id, parent_id, name, is_deleted, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(organization_id)
    .bind(owner_id)
    .bind(parent_id)
    .bind(name)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::duplicate_name(name)
        } else {
            AppError::with_source(ErrorKind::Database, "Failed to create folder", e)
        }
    })
}
