//! Usage counters and their client-facing snapshots.

pub mod bandwidth;
pub mod snapshot;
pub mod storage;

pub use bandwidth::OrgBandwidthUsage;
pub use snapshot::{BandwidthSnapshot, UsageSnapshot};
pub use storage::OrgStorageUsage;
