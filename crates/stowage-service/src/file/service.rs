//! File-level operations: delete, rename, move.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use stowage_core::error::AppError;
use stowage_core::result::AppResult;
use stowage_database::repositories::{FileRepository, FolderRepository};
use stowage_entity::file::File;
use stowage_storage::DynamicStorage;

use crate::folder::validated_name;
use crate::usage::UsageService;
use crate::{commit, lock_organization};

/// Manages individual files.
#[derive(Debug, Clone)]
pub struct FileService {
    /// Pool used for moves under the organization lock.
    pool: SqlitePool,
    /// File repository.
    file_repo: Arc<FileRepository>,
    /// Usage cache.
    usage: Arc<UsageService>,
    /// Backend selector.
    storage: Arc<DynamicStorage>,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(
        pool: SqlitePool,
        file_repo: Arc<FileRepository>,
        usage: Arc<UsageService>,
        storage: Arc<DynamicStorage>,
    ) -> Self {
        Self {
            pool,
            file_repo,
            usage,
            storage,
        }
    }

    /// A live file by ID.
    pub async fn get_live(&self, file_id: Uuid) -> AppResult<File> {
        self.file_repo
            .find_by_id(file_id)
            .await?
            .filter(|f| !f.is_deleted)
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    /// Remove a file's bytes from the backend holding them, then flag it
    /// deleted and decrement usage.
    ///
    /// If the backend delete fails the row stays live and the error propagates.
    pub async fn delete_file(&self, file: &File) -> AppResult<Option<File>> {
        self.storage.delete_from(file.storage_backend, &file.storage_key).await?;
        self.usage.record_delete(file).await
    }

    /// Rename a file; a live sibling with the same name is rejected.
    pub async fn rename_file(&self, file: &File, new_name: &str) -> AppResult<File> {
        let name = validated_name(new_name)?;
        if name == file.original_filename {
            return Ok(file.clone());
        }
        let renamed = self.file_repo.rename(file.id, &name).await?;
        info!(file_id = %file.id, "File renamed");
        Ok(renamed)
    }

    /// Move a file into another live folder of the same owner.
    ///
    /// Runs under the organization lock so the target cannot be
    /// cascade-deleted between the check and the move.
    pub async fn move_file(&self, file: &File, folder_id: Uuid) -> AppResult<File> {
        if file.folder_id == folder_id {
            return Ok(file.clone());
        }
        let mut tx = lock_organization(&self.pool, file.organization_id).await?;
        let target = FolderRepository::find_live_in(&mut *tx, folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
        if target.organization_id != file.organization_id || target.owner_id != file.owner_id {
            return Err(AppError::invalid_move(
                "Files can only move within the same owner's tree",
            ));
        }

        let moved = FileRepository::move_to(&mut *tx, file.id, target.id).await?;
        commit(tx).await?;
        info!(file_id = %file.id, folder_id = %target.id, "File moved");
        Ok(moved)
    }
}
