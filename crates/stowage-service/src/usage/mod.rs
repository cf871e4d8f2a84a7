//! Usage accounting: storage counter, bandwidth meter, and quota resolution.

pub mod bandwidth;
pub mod cache;
pub mod quota;

pub use bandwidth::{BandwidthMeter, cycle_length, cycle_start_for};
pub use cache::{RebuildReport, UsageService};
pub use quota::{QuotaResolver, QuotaState, SubscriptionSource};
