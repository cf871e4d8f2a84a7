//! Explorer service: the public storage operations, under access control.
//!
//! Every operation takes an [`ExplorerContext`] from
//! [`ExplorerService::resolve_context`]. Reads require a readable access
//! state; mutations require an active subscription. Regular users are
//! confined to their own subtree, org admins may address any owner of
//! their organization.

use std::collections::HashSet;
use std::io::{Seek, SeekFrom};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader, SyncIoBridge};
use tracing::{info, warn};
use uuid::Uuid;

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_core::traits::storage::ByteStream;
use stowage_core::types::pagination::PageRequest;
use stowage_core::types::settings::StorageMode;
use stowage_database::repositories::OrganizationRepository;
use stowage_entity::file::{CreateFile, File};
use stowage_entity::folder::Folder;
use stowage_entity::subscription::{AccessState, Limits};
use stowage_entity::usage::{BandwidthSnapshot, UsageSnapshot};
use stowage_storage::{DynamicStorage, build_storage_key};

use crate::context::{ExplorerContext, Principal};
use crate::file::{EntryNamer, FileService, IncomingFile, UploadValidator, write_zip};
use crate::folder::{CascadeReport, FolderListing, FolderService, SearchHit};
use crate::rate_limit::UploadRateLimiter;
use crate::usage::{BandwidthMeter, QuotaResolver, UsageService};

/// Default number of search hits.
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// A single-file download admitted by the bandwidth meter.
pub struct Download {
    /// File metadata.
    pub file: File,
    /// File content.
    pub stream: ByteStream,
    /// Bandwidth usage after this download.
    pub bandwidth: BandwidthSnapshot,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("file", &self.file)
            .field("bandwidth", &self.bandwidth)
            .finish_non_exhaustive()
    }
}

/// A ZIP bundle of several files, spooled to a temporary file and streamed from there.
pub struct BulkDownload {
    /// The archive content.
    pub stream: ByteStream,
    /// Compressed archive size in bytes.
    pub archive_size: u64,
    /// Number of files in the archive.
    pub file_count: usize,
    /// Uncompressed bytes served, as metered.
    pub total_bytes: u64,
    /// Bandwidth usage after this download.
    pub bandwidth: BandwidthSnapshot,
}

impl std::fmt::Debug for BulkDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkDownload")
            .field("archive_size", &self.archive_size)
            .field("file_count", &self.file_count)
            .field("total_bytes", &self.total_bytes)
            .field("bandwidth", &self.bandwidth)
            .finish_non_exhaustive()
    }
}

/// Whose files a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchScope {
    /// The caller's own subtree.
    Mine,
    /// One owner's subtree; admins only unless it is the caller.
    Owner(Uuid),
    /// Every owner in the organization; regular users get their own subtree.
    AllOwners,
}

/// Storage and bandwidth figures for an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageOverview {
    /// Access state.
    pub access: AccessState,
    /// Effective limits.
    pub limits: Limits,
    /// Storage usage against the total limit.
    pub storage: UsageSnapshot,
    /// Current-cycle bandwidth usage.
    pub bandwidth: BandwidthSnapshot,
}

/// Orchestrates the folder tree, usage accounting, and backend selection.
#[derive(Debug, Clone)]
pub struct ExplorerService {
    /// Quota resolver.
    quota: Arc<QuotaResolver>,
    /// Usage cache.
    usage: Arc<UsageService>,
    /// Bandwidth meter.
    bandwidth: Arc<BandwidthMeter>,
    /// Folder tree service.
    folders: Arc<FolderService>,
    /// File service.
    files: Arc<FileService>,
    /// Organization repository, for storage key segments.
    org_repo: Arc<OrganizationRepository>,
    /// Backend selector.
    storage: Arc<DynamicStorage>,
    /// Upload content rules.
    validator: UploadValidator,
    /// Upload throttle.
    rate_limiter: UploadRateLimiter,
}

impl ExplorerService {
    /// Creates a new explorer service.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        quota: Arc<QuotaResolver>,
        usage: Arc<UsageService>,
        bandwidth: Arc<BandwidthMeter>,
        folders: Arc<FolderService>,
        files: Arc<FileService>,
        org_repo: Arc<OrganizationRepository>,
        storage: Arc<DynamicStorage>,
        validator: UploadValidator,
        rate_limiter: UploadRateLimiter,
    ) -> Self {
        Self {
            quota,
            usage,
            bandwidth,
            folders,
            files,
            org_repo,
            storage,
            validator,
            rate_limiter,
        }
    }

    /// The shared upload throttle.
    pub fn rate_limiter(&self) -> &UploadRateLimiter {
        &self.rate_limiter
    }

    /// Resolve the caller's context.
    ///
    /// Platform administrators and organizations that never subscribed are refused.
    pub async fn resolve_context(&self, principal: &Principal) -> AppResult<ExplorerContext> {
        principal.require_tenant_role()?;
        let access = self.quota.access_state(principal.organization_id).await?;
        let ctx = ExplorerContext::new(principal, access)?;
        ctx.require_read()?;
        Ok(ctx)
    }

    /// A live folder the caller may address, or the caller's root when `folder_id` is `None`.
    async fn addressed_folder(&self, ctx: &ExplorerContext, folder_id: Option<Uuid>) -> AppResult<Folder> {
        match folder_id {
            Some(id) => {
                let folder = self.folders.get_live(id).await?;
                ctx.require_owner(folder.organization_id, folder.owner_id)?;
                Ok(folder)
            }
            None => self.folders.ensure_root(ctx.organization_id, ctx.user_id).await,
        }
    }

    async fn addressed_file(&self, ctx: &ExplorerContext, file_id: Uuid) -> AppResult<File> {
        let file = self.files.get_live(file_id).await?;
        ctx.require_owner(file.organization_id, file.owner_id)?;
        Ok(file)
    }

    /// List a folder. `folder_id = None` lists `owner_id`'s root (default: the caller's).
    pub async fn list(
        &self,
        ctx: &ExplorerContext,
        folder_id: Option<Uuid>,
        owner_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<FolderListing> {
        ctx.require_read()?;
        let folder = match folder_id {
            Some(_) => self.addressed_folder(ctx, folder_id).await?,
            None => {
                let owner = ctx.target_owner(owner_id)?;
                self.folders.ensure_root(ctx.organization_id, owner).await?
            }
        };
        self.folders.list(&folder, page).await
    }

    /// Create a folder under `parent_id` (default: the caller's root).
    pub async fn create_folder(&self, ctx: &ExplorerContext, parent_id: Option<Uuid>, name: &str) -> AppResult<Folder> {
        ctx.require_write()?;
        let parent = self.addressed_folder(ctx, parent_id).await?;
        self.folders
            .create_folder(parent.organization_id, parent.owner_id, parent.id, name)
            .await
    }

    /// Rename a folder.
    pub async fn rename_folder(&self, ctx: &ExplorerContext, folder_id: Uuid, name: &str) -> AppResult<Folder> {
        ctx.require_write()?;
        let folder = self.addressed_folder(ctx, Some(folder_id)).await?;
        self.folders.rename_folder(&folder, name).await
    }

    /// Move a folder under another folder of the same owner.
    pub async fn move_folder(&self, ctx: &ExplorerContext, folder_id: Uuid, new_parent_id: Uuid) -> AppResult<Folder> {
        ctx.require_write()?;
        let folder = self.addressed_folder(ctx, Some(folder_id)).await?;
        self.addressed_folder(ctx, Some(new_parent_id)).await?;
        self.folders.move_folder(&folder, new_parent_id).await
    }

    /// Delete a folder and everything under it.
    pub async fn delete_folder(&self, ctx: &ExplorerContext, folder_id: Uuid) -> AppResult<CascadeReport> {
        ctx.require_write()?;
        let folder = self.addressed_folder(ctx, Some(folder_id)).await?;
        self.folders.soft_delete_folder(&folder).await
    }

    /// Upload a file into `folder_id` (default: the caller's root).
    ///
    /// Gates run in order: active subscription, folder access, rate limits,
    /// content validation, capacity. The bytes are then written and the
    /// file row and usage increment committed together; if that commit
    /// fails the written object is removed again.
    pub async fn upload(&self, ctx: &ExplorerContext, folder_id: Option<Uuid>, incoming: IncomingFile) -> AppResult<File> {
        ctx.require_write()?;
        let folder = self.addressed_folder(ctx, folder_id).await?;
        self.rate_limiter.check(ctx.user_id, ctx.organization_id).await?;
        self.validator.validate(&incoming)?;

        let size = incoming.size();
        let limits = self.quota.limits(ctx.organization_id).await?;
        let (fits, snapshot) = self
            .quota
            .can_store_within(ctx.organization_id, &limits, size)
            .await?;
        if !fits {
            return Err(AppError::storage_limit_exceeded(snapshot.used_bytes, snapshot.limit_bytes));
        }

        let filename = incoming.sanitized_filename()?;
        let organization = self
            .org_repo
            .find_by_id(ctx.organization_id)
            .await?
            .ok_or_else(|| AppError::not_found("Organization not found"))?;
        let root = self.folders.root_of(&folder).await?;
        let key = build_storage_key(
            &organization.name,
            organization.id,
            folder.owner_id,
            &root.name,
            &filename,
        );

        let held_by = self.storage.save(&key, incoming.data.clone()).await?;

        let pending = CreateFile {
            organization_id: ctx.organization_id,
            owner_id: folder.owner_id,
            folder_id: folder.id,
            original_filename: filename,
            storage_key: key.clone(),
            storage_backend: held_by,
            size_bytes: i64::try_from(size).unwrap_or(i64::MAX),
            content_type: incoming.effective_content_type(),
        };
        match self.usage.record_upload(pending, limits.total_storage_bytes()).await {
            Ok(file) => {
                info!(
                    organization_id = %ctx.organization_id,
                    file_id = %file.id,
                    storage_key = %key,
                    backend = %held_by,
                    bytes = size,
                    "File uploaded"
                );
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete_from(held_by, &key).await {
                    warn!(
                        storage_key = %key,
                        error = %cleanup,
                        "Failed to remove object after rejected upload"
                    );
                }
                Err(e)
            }
        }
    }

    /// Open a file for download, metering its size against the bandwidth allowance.
    pub async fn download(&self, ctx: &ExplorerContext, file_id: Uuid) -> AppResult<Download> {
        ctx.require_read()?;
        let file = self.addressed_file(ctx, file_id).await?;
        let stream = self.storage.open_from(file.storage_backend, &file.storage_key).await?;

        let (admitted, bandwidth) = self.bandwidth.apply_usage(ctx.organization_id, file.size()).await?;
        if !admitted {
            return Err(AppError::bandwidth_limit_exceeded(bandwidth.used_bytes, bandwidth.limit_bytes));
        }
        Ok(Download {
            file,
            stream,
            bandwidth,
        })
    }

    /// Bundle files and folders into one ZIP archive.
    ///
    /// Folder selections expand breadth-first into their live files; each
    /// file is included once. The bandwidth meter admits the total size in
    /// a single decision before any bytes are read. Entries are streamed
    /// from storage one at a time into a temporary spool file, which backs
    /// the returned stream.
    pub async fn bulk_download(
        &self,
        ctx: &ExplorerContext,
        file_ids: &[Uuid],
        folder_ids: &[Uuid],
    ) -> AppResult<BulkDownload> {
        ctx.require_read()?;

        let mut seen = HashSet::new();
        let mut selected: Vec<(Vec<String>, File)> = Vec::new();
        for &file_id in file_ids {
            let file = self.addressed_file(ctx, file_id).await?;
            if seen.insert(file.id) {
                selected.push((Vec::new(), file));
            }
        }
        for &folder_id in folder_ids {
            let folder = self.addressed_folder(ctx, Some(folder_id)).await?;
            for collected in self.folders.collect_live_files(&folder).await? {
                if seen.insert(collected.file.id) {
                    selected.push((collected.dirs, collected.file));
                }
            }
        }
        if selected.is_empty() {
            return Err(AppError::validation("Nothing to download"));
        }

        let total_bytes: u64 = selected.iter().map(|(_, f)| f.size()).sum();
        let (admitted, bandwidth) = self.bandwidth.apply_usage(ctx.organization_id, total_bytes).await?;
        if !admitted {
            return Err(AppError::bandwidth_limit_exceeded(bandwidth.used_bytes, bandwidth.limit_bytes));
        }

        let mut namer = EntryNamer::new();
        let paths: Vec<String> = selected
            .iter()
            .map(|(dirs, file)| namer.assign(dirs, &file.original_filename))
            .collect();
        let sources: Vec<(StorageMode, String)> = selected
            .iter()
            .map(|(_, file)| (file.storage_backend, file.storage_key.clone()))
            .collect();
        let file_count = paths.len();

        let storage = Arc::clone(&self.storage);
        let handle = tokio::runtime::Handle::current();
        let spool = tokio::task::spawn_blocking(move || -> AppResult<std::fs::File> {
            let spool = tempfile::tempfile().map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to create archive spool", e)
            })?;
            let mut spool = write_zip(spool, &paths, |i| {
                let (held_by, key) = &sources[i];
                let stream = handle.block_on(storage.open_from(*held_by, key))?;
                Ok(SyncIoBridge::new_with_handle(StreamReader::new(stream), handle.clone()))
            })?;
            spool.seek(SeekFrom::Start(0)).map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to rewind archive spool", e)
            })?;
            Ok(spool)
        })
        .await
        .map_err(|e| AppError::internal(format!("Archive task failed: {e}")))??;

        let archive_size = spool
            .metadata()
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Failed to size archive spool", e))?
            .len();

        info!(
            organization_id = %ctx.organization_id,
            files = file_count,
            bytes = total_bytes,
            archive_bytes = archive_size,
            "Bulk download prepared"
        );
        Ok(BulkDownload {
            stream: Box::pin(ReaderStream::new(tokio::fs::File::from_std(spool))),
            archive_size,
            file_count,
            total_bytes,
            bandwidth,
        })
    }

    /// Delete a file.
    pub async fn delete_file(&self, ctx: &ExplorerContext, file_id: Uuid) -> AppResult<()> {
        ctx.require_write()?;
        let file = self.addressed_file(ctx, file_id).await?;
        self.files.delete_file(&file).await?;
        Ok(())
    }

    /// Rename a file.
    pub async fn rename_file(&self, ctx: &ExplorerContext, file_id: Uuid, name: &str) -> AppResult<File> {
        ctx.require_write()?;
        let file = self.addressed_file(ctx, file_id).await?;
        self.files.rename_file(&file, name).await
    }

    /// Move a file into another folder of the same owner.
    pub async fn move_file(&self, ctx: &ExplorerContext, file_id: Uuid, folder_id: Uuid) -> AppResult<File> {
        ctx.require_write()?;
        let file = self.addressed_file(ctx, file_id).await?;
        self.addressed_folder(ctx, Some(folder_id)).await?;
        self.files.move_file(&file, folder_id).await
    }

    /// Search filenames.
    pub async fn search(
        &self,
        ctx: &ExplorerContext,
        query: &str,
        scope: SearchScope,
        limit: Option<u32>,
    ) -> AppResult<Vec<SearchHit>> {
        ctx.require_read()?;
        let owner = match scope {
            SearchScope::Mine => Some(ctx.user_id),
            SearchScope::Owner(owner) => Some(ctx.target_owner(Some(owner))?),
            SearchScope::AllOwners if ctx.is_admin() => None,
            SearchScope::AllOwners => Some(ctx.user_id),
        };
        self.folders
            .search(
                ctx.organization_id,
                owner,
                query,
                limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            )
            .await
    }

    /// Storage and bandwidth figures for the caller's organization.
    pub async fn usage_overview(&self, ctx: &ExplorerContext) -> AppResult<UsageOverview> {
        ctx.require_read()?;
        let state = self.quota.resolve(ctx.organization_id).await?;
        let usage = self.usage.get(ctx.organization_id).await?;
        let bandwidth = self.bandwidth.snapshot(ctx.organization_id).await?;

        Ok(UsageOverview {
            access: state.access,
            storage: UsageSnapshot::new(usage.used(), state.limits.total_storage_bytes()),
            limits: state.limits,
            bandwidth,
        })
    }
}
