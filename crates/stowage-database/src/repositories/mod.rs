//! Repository implementations for all Stowage entities.

pub mod bandwidth;
pub mod file;
pub mod folder;
pub mod organization;
pub mod settings;
pub mod subscription;
pub mod usage;

pub use bandwidth::BandwidthRepository;
pub use file::FileRepository;
pub use folder::FolderRepository;
pub use organization::OrganizationRepository;
pub use settings::StorageSettingsRepository;
pub use subscription::SubscriptionRepository;
pub use usage::UsageRepository;

/// Whether a sqlx error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\\'` pattern.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
