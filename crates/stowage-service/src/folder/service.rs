//! Folder tree operations: roots, create, rename, move, cascade delete, list, search.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_core::types::pagination::PageRequest;
use stowage_database::repositories::{FileRepository, FolderRepository, UsageRepository};
use stowage_entity::file::File;
use stowage_entity::folder::{Folder, normalize_name};
use stowage_storage::DynamicStorage;

use super::tree::{path_names, would_create_cycle};
use crate::usage::UsageService;
use crate::{commit, lock_organization};

/// What a cascading folder delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    /// Folders flagged deleted.
    pub folders_deleted: u64,
    /// Files whose bytes were removed and rows flagged deleted.
    pub files_deleted: u64,
    /// Sum of the deleted files' sizes, already subtracted from the usage cache.
    pub bytes_freed: u64,
}

/// One page of a folder's contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderListing {
    /// The listed folder.
    pub folder: Folder,
    /// Live child folders on this page, ordered by name.
    pub folders: Vec<Folder>,
    /// Live files on this page, ordered by filename.
    pub files: Vec<File>,
    /// Total live child folders.
    pub total_folders: u64,
    /// Total live files.
    pub total_files: u64,
}

/// A search result with the containing folder's path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matching file.
    pub file: File,
    /// Folder names from the owner's root down to the containing folder.
    pub folder_path: Vec<String>,
}

/// A live file found under a folder, with its path relative to that folder's parent.
#[derive(Debug, Clone)]
pub struct CollectedFile {
    /// Folder names from the collected folder down to the containing folder.
    pub dirs: Vec<String>,
    /// The file.
    pub file: File,
}

/// Manages the per-owner folder trees.
///
/// Ownership checks against the caller live in the explorer; this service
/// enforces that every folder it links together belongs to the same
/// organization and owner.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Pool used for tree-changing transactions.
    pool: SqlitePool,
    /// Folder repository.
    folder_repo: Arc<FolderRepository>,
    /// File repository.
    file_repo: Arc<FileRepository>,
    /// Usage cache, decremented as cascades remove files.
    usage: Arc<UsageService>,
    /// Backend selector.
    storage: Arc<DynamicStorage>,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        pool: SqlitePool,
        folder_repo: Arc<FolderRepository>,
        file_repo: Arc<FileRepository>,
        usage: Arc<UsageService>,
        storage: Arc<DynamicStorage>,
    ) -> Self {
        Self {
            pool,
            folder_repo,
            file_repo,
            usage,
            storage,
        }
    }

    /// A live folder by ID.
    pub async fn get_live(&self, folder_id: Uuid) -> AppResult<Folder> {
        self.folder_repo
            .find_by_id(folder_id)
            .await?
            .filter(Folder::is_live)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }

    /// The owner's live root, created on first access.
    pub async fn ensure_root(&self, organization_id: Uuid, owner_id: Uuid) -> AppResult<Folder> {
        if let Some(root) = self.folder_repo.find_live_root(organization_id, owner_id).await? {
            return Ok(root);
        }

        match self.folder_repo.insert_root(organization_id, owner_id).await {
            Ok(root) => {
                info!(
                    organization_id = %organization_id,
                    owner_id = %owner_id,
                    folder_id = %root.id,
                    "Root folder created"
                );
                Ok(root)
            }
            Err(e) if e.kind == ErrorKind::DuplicateName => {
                debug!(owner_id = %owner_id, "Concurrent root creation; re-reading");
                self.folder_repo
                    .find_live_root(organization_id, owner_id)
                    .await?
                    .ok_or_else(|| AppError::internal("Root folder vanished after conflict"))
            }
            Err(e) => Err(e),
        }
    }

    /// The root of the tree containing `folder`.
    pub async fn root_of(&self, folder: &Folder) -> AppResult<Folder> {
        if folder.is_root() {
            return Ok(folder.clone());
        }
        self.folder_repo
            .find_ancestors(folder.id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("Folder {} not found", folder.id)))
    }

    /// Create a child folder under `parent_id` in the owner's tree.
    pub async fn create_folder(
        &self,
        organization_id: Uuid,
        owner_id: Uuid,
        parent_id: Uuid,
        name: &str,
    ) -> AppResult<Folder> {
        let name = validated_name(name)?;
        let mut tx = lock_organization(&self.pool, organization_id).await?;
        let parent = FolderRepository::find_live_in(&mut *tx, parent_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {parent_id} not found")))?;
        if parent.organization_id != organization_id || parent.owner_id != owner_id {
            return Err(AppError::permission_denied(
                "Parent folder belongs to another owner",
            ));
        }

        let folder = FolderRepository::create(&mut *tx, organization_id, owner_id, parent.id, &name).await?;
        commit(tx).await?;
        info!(
            organization_id = %organization_id,
            folder_id = %folder.id,
            parent_id = %parent.id,
            "Folder created"
        );
        Ok(folder)
    }

    /// Rename a folder, keeping names unique among its live siblings.
    pub async fn rename_folder(&self, folder: &Folder, new_name: &str) -> AppResult<Folder> {
        let name = validated_name(new_name)?;
        if name == folder.name {
            return Ok(folder.clone());
        }
        let renamed = self.folder_repo.rename(folder.id, &name).await?;
        info!(folder_id = %folder.id, "Folder renamed");
        Ok(renamed)
    }

    /// Re-parent a folder under `new_parent_id`.
    ///
    /// Rejects moving the root, moving across owners, and any move that
    /// would put the folder inside its own subtree. The ancestor walk and
    /// the update share one transaction under the organization lock, so
    /// concurrent moves cannot combine into a cycle.
    pub async fn move_folder(&self, folder: &Folder, new_parent_id: Uuid) -> AppResult<Folder> {
        if folder.is_root() {
            return Err(AppError::invalid_move("The root folder cannot be moved"));
        }

        let mut tx = lock_organization(&self.pool, folder.organization_id).await?;
        let current = FolderRepository::find_live_in(&mut *tx, folder.id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {} not found", folder.id)))?;
        if current.parent_id == Some(new_parent_id) {
            return Ok(current);
        }

        let target = FolderRepository::find_live_in(&mut *tx, new_parent_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {new_parent_id} not found")))?;
        if target.organization_id != current.organization_id || target.owner_id != current.owner_id {
            return Err(AppError::invalid_move(
                "Folders can only move within the same owner's tree",
            ));
        }

        let chain: Vec<Uuid> = FolderRepository::ancestors_in(&mut *tx, target.id)
            .await?
            .iter()
            .map(|f| f.id)
            .collect();
        if would_create_cycle(current.id, &chain) {
            return Err(AppError::invalid_move(
                "A folder cannot be moved into itself or one of its subfolders",
            ));
        }

        let moved = FolderRepository::set_parent(&mut *tx, current.id, target.id).await?;
        commit(tx).await?;
        info!(folder_id = %folder.id, new_parent_id = %target.id, "Folder moved");
        Ok(moved)
    }

    /// Delete a folder's live subtree.
    ///
    /// First sweeps the subtree depth-first without holding any lock: each
    /// file's bytes are removed from the backend holding them, then the row
    /// is flagged deleted and the usage cache decremented in one
    /// transaction. The folders are then flagged in a final transaction
    /// under the organization lock, which also removes files that arrived
    /// in the subtree during the sweep. Uploads and moves take the same
    /// lock, so none can land in the subtree once it is flagged.
    ///
    /// If a backend delete fails the error propagates and the folders stay
    /// live; files already processed stay deleted and accounted.
    pub async fn soft_delete_folder(&self, folder: &Folder) -> AppResult<CascadeReport> {
        if folder.is_root() {
            return Err(AppError::validation("The root folder cannot be deleted"));
        }
        if !folder.is_live() {
            return Err(AppError::not_found(format!("Folder {} not found", folder.id)));
        }

        let mut report = CascadeReport::default();
        let mut stack = vec![folder.id];
        while let Some(folder_id) = stack.pop() {
            for file in self.file_repo.all_live_in_folder(folder_id).await? {
                self.storage.delete_from(file.storage_backend, &file.storage_key).await?;
                if let Some(deleted) = self.usage.record_delete(&file).await? {
                    report.files_deleted += 1;
                    report.bytes_freed += deleted.size();
                }
            }
            let children = self.folder_repo.all_live_children(folder_id).await?;
            stack.extend(children.iter().rev().map(|c| c.id));
        }

        let mut tx = lock_organization(&self.pool, folder.organization_id).await?;
        let subtree = FolderRepository::live_subtree(&mut *tx, folder.id).await?;
        if subtree.is_empty() {
            return Err(AppError::not_found(format!("Folder {} not found", folder.id)));
        }

        let stragglers = FileRepository::live_in_folders(&mut *tx, &subtree).await?;
        if !stragglers.is_empty() {
            debug!(
                folder_id = %folder.id,
                files = stragglers.len(),
                "Removing files that arrived during the cascade"
            );
        }
        for file in stragglers {
            if let Err(e) = self.storage.delete_from(file.storage_backend, &file.storage_key).await {
                commit(tx).await?;
                return Err(e);
            }
            if let Some(deleted) = FileRepository::mark_deleted_if_live(&mut *tx, file.id).await? {
                UsageRepository::apply_delta(&mut *tx, folder.organization_id, -deleted.size_bytes).await?;
                report.files_deleted += 1;
                report.bytes_freed += deleted.size();
            }
        }

        report.folders_deleted = FolderRepository::mark_deleted(&mut *tx, &subtree).await?;
        commit(tx).await?;

        info!(
            organization_id = %folder.organization_id,
            folder_id = %folder.id,
            folders = report.folders_deleted,
            files = report.files_deleted,
            bytes = report.bytes_freed,
            "Folder subtree deleted"
        );
        Ok(report)
    }

    /// One page of a folder's live contents.
    pub async fn list(&self, folder: &Folder, page: &PageRequest) -> AppResult<FolderListing> {
        let folders = self.folder_repo.list_live_children(folder.id, page).await?;
        let files = self.file_repo.list_live_in_folder(folder.id, page).await?;
        let total_folders = self.folder_repo.count_live_children(folder.id).await?;
        let total_files = self.file_repo.count_live_in_folder(folder.id).await?;

        Ok(FolderListing {
            folder: folder.clone(),
            folders,
            files,
            total_folders,
            total_files,
        })
    }

    /// Case-insensitive filename search, with each hit's folder path.
    ///
    /// `owner_id = None` searches every owner in the organization.
    pub async fn search(
        &self,
        organization_id: Uuid,
        owner_id: Option<Uuid>,
        query: &str,
        limit: u32,
    ) -> AppResult<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let files = self
            .file_repo
            .search(organization_id, owner_id, query, i64::from(limit.max(1)))
            .await?;

        let mut paths: HashMap<Uuid, Vec<String>> = HashMap::new();
        let mut hits = Vec::with_capacity(files.len());
        for file in files {
            let folder_path = match paths.get(&file.folder_id) {
                Some(path) => path.clone(),
                None => {
                    let chain = self.folder_repo.find_ancestors(file.folder_id).await?;
                    let path = path_names(&chain);
                    paths.insert(file.folder_id, path.clone());
                    path
                }
            };
            hits.push(SearchHit { file, folder_path });
        }
        Ok(hits)
    }

    /// Every live file under `folder`, breadth-first, with paths starting at the folder's name.
    pub async fn collect_live_files(&self, folder: &Folder) -> AppResult<Vec<CollectedFile>> {
        let mut collected = Vec::new();
        let mut seen = HashSet::from([folder.id]);
        let mut queue = VecDeque::from([(folder.id, vec![folder.name.clone()])]);

        while let Some((folder_id, dirs)) = queue.pop_front() {
            for file in self.file_repo.all_live_in_folder(folder_id).await? {
                collected.push(CollectedFile {
                    dirs: dirs.clone(),
                    file,
                });
            }
            for child in self.folder_repo.all_live_children(folder_id).await? {
                if seen.insert(child.id) {
                    let mut child_dirs = dirs.clone();
                    child_dirs.push(child.name);
                    queue.push_back((child.id, child_dirs));
                }
            }
        }
        Ok(collected)
    }
}

/// Normalize a folder or file name, rejecting names that are empty or contain separators.
pub fn validated_name(raw: &str) -> AppResult<String> {
    let name = normalize_name(raw);
    if name.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(AppError::validation(format!("Invalid name '{name}'")));
    }
    Ok(name)
}
