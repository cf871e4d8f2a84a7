//! Storage key construction.
//!
//! Keys have the shape
//! `media-storage/<org-slug>-<org-id>/media-storage/<root-slug>/<owner-id>-<uuid>.<ext>`
//! and must stay stable: changing the format orphans existing objects.

use uuid::Uuid;

const KEY_PREFIX: &str = "media-storage";
const MAX_EXTENSION_LEN: usize = 12;
const EMPTY_SLUG: &str = "default";

/// Build a fresh, never-reused key for an upload.
pub fn build_storage_key(
    org_name: &str,
    org_id: Uuid,
    owner_id: Uuid,
    root_folder_name: &str,
    original_filename: &str,
) -> String {
    let token = Uuid::new_v4().simple();
    let mut key = format!(
        "{KEY_PREFIX}/{}-{org_id}/{KEY_PREFIX}/{}/{owner_id}-{token}",
        slugify(org_name),
        slugify(root_folder_name),
    );
    if let Some(ext) = key_extension(original_filename) {
        key.push('.');
        key.push_str(&ext);
    }
    key
}

/// Lower-case, collapse every run of non-alphanumerics into one `-`, trim dashes.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// The extension used in keys: lower-cased, alphanumeric only, at most 12 chars.
fn key_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if filename.starts_with('.') && filename.matches('.').count() == 1 {
        return None;
    }
    let ext: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_LEN)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (!ext.is_empty()).then_some(ext)
}
