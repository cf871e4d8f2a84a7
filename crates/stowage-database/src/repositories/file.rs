//! File repository implementation.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_core::types::pagination::PageRequest;
use stowage_entity::file::{CreateFile, File, numbered_name, split_extension};

use super::{escape_like, is_unique_violation};

/// Repository for file CRUD and query operations.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a file by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    /// Find a live file in a folder by exact name.
    pub async fn find_live_by_name(&self, folder_id: Uuid, name: &str) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE folder_id = ?1 AND original_filename = ?2 AND is_deleted = 0",
        )
        .bind(folder_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file by name", e))
    }

    /// One page of live files in a folder, ordered by file name.
    pub async fn list_live_in_folder(&self, folder_id: Uuid, page: &PageRequest) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE folder_id = ?1 AND is_deleted = 0 \
             ORDER BY original_filename ASC, id ASC LIMIT ?2 OFFSET ?3",
        )
        .bind(folder_id)
        .bind(page.sql_limit())
        .bind(page.sql_offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    /// Number of live files in a folder.
    pub async fn count_live_in_folder(&self, folder_id: Uuid) -> AppResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE folder_id = ?1 AND is_deleted = 0")
                .bind(folder_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count files", e))?;
        Ok(count.max(0) as u64)
    }

    /// Every live file directly inside a folder, ordered by file name.
    pub async fn all_live_in_folder(&self, folder_id: Uuid) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE folder_id = ?1 AND is_deleted = 0 \
             ORDER BY original_filename ASC, id ASC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    /// Case-insensitive substring search over live file names.
    ///
    /// Matches against the stored Unicode-lowercased name, so non-ASCII
    /// letters fold too. `owner_id = None` searches every owner in the
    /// organization.
    pub async fn search(
        &self,
        organization_id: Uuid,
        owner_id: Option<Uuid>,
        query: &str,
        limit: i64,
    ) -> AppResult<Vec<File>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE organization_id = ?1 AND (?2 IS NULL OR owner_id = ?2) AND is_deleted = 0 \
               AND search_name LIKE ?3 ESCAPE '\\' \
             ORDER BY original_filename ASC, id ASC LIMIT ?4",
        )
        .bind(organization_id)
        .bind(owner_id)
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to search files", e))
    }

    /// Rename a file. A live sibling with the same name yields `DuplicateName`.
    pub async fn rename(&self, file_id: Uuid, new_name: &str) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET original_filename = ?2, search_name = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(file_id)
        .bind(new_name)
        .bind(new_name.to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::duplicate_name(new_name)
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to rename file", e)
            }
        })?
        .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    /// Move a live file into another folder inside the caller's transaction.
    pub async fn move_to(conn: &mut SqliteConnection, file_id: Uuid, folder_id: Uuid) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET folder_id = ?2 WHERE id = ?1 AND is_deleted = 0 RETURNING *",
        )
        .bind(file_id)
        .bind(folder_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::new(
                    ErrorKind::DuplicateName,
                    "A file with the same name already exists in the target folder",
                )
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to move file", e)
            }
        })?
        .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    /// First name based on `name` that no live file in the folder uses.
    ///
    /// Must run inside the transaction that inserts the file.
    pub async fn available_name(conn: &mut SqliteConnection, folder_id: Uuid, name: &str) -> AppResult<String> {
        let (stem, ext) = split_extension(name);
        let variants = match ext {
            Some(ext) => format!("{} (%).{}", escape_like(stem), escape_like(ext)),
            None => format!("{} (%)", escape_like(stem)),
        };

        let taken: HashSet<String> = sqlx::query_scalar(
            "SELECT original_filename FROM files WHERE folder_id = ?1 AND is_deleted = 0 \
             AND (original_filename = ?2 OR original_filename LIKE ?3 ESCAPE '\\')",
        )
        .bind(folder_id)
        .bind(name)
        .bind(variants)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check file names", e))?
        .into_iter()
        .collect();

        if !taken.contains(name) {
            return Ok(name.to_string());
        }
        // `taken` is finite, so a free slot exists within len + 1 tries.
        (1..=taken.len() as u32 + 1)
            .map(|n| numbered_name(name, n))
            .find(|candidate| !taken.contains(candidate))
            .ok_or_else(|| AppError::internal("No free file name found"))
    }

    /// Insert a file row inside the caller's transaction.
    pub async fn insert(conn: &mut SqliteConnection, data: &CreateFile) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "INSERT INTO files (id, organization_id, owner_id, folder_id, original_filename, \
             search_name, storage_key, storage_backend, size_bytes, content_type, is_deleted, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.organization_id)
        .bind(data.owner_id)
        .bind(data.folder_id)
        .bind(&data.original_filename)
        .bind(data.original_filename.to_lowercase())
        .bind(&data.storage_key)
        .bind(data.storage_backend.as_str())
        .bind(data.size_bytes)
        .bind(&data.content_type)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::duplicate_name(&data.original_filename)
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create file", e)
            }
        })
    }

    /// Flag a file deleted if it is still live. Returns the row when this call flipped it.
    pub async fn mark_deleted_if_live(conn: &mut SqliteConnection, file_id: Uuid) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0 RETURNING *",
        )
        .bind(file_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))
    }

    /// Live files directly inside any of `folder_ids`, read inside the caller's transaction.
    pub async fn live_in_folders(conn: &mut SqliteConnection, folder_ids: &[Uuid]) -> AppResult<Vec<File>> {
        let mut files = Vec::new();
        for folder_id in folder_ids {
            let batch = sqlx::query_as::<_, File>(
                "SELECT * FROM files WHERE folder_id = ?1 AND is_deleted = 0 ORDER BY id ASC",
            )
            .bind(folder_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))?;
            files.extend(batch);
        }
        Ok(files)
    }

    /// Sum of live file sizes of an organization.
    pub async fn sum_live_bytes(conn: &mut SqliteConnection, organization_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM files WHERE organization_id = ?1 AND is_deleted = 0",
        )
        .bind(organization_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to sum file sizes", e))
    }
}
