//! Subscription, plan, and add-on entities plus the limits derived from them.

pub mod access;
pub mod addon;
pub mod limits;
pub mod model;
pub mod plan;

pub use access::AccessState;
pub use addon::AddonPurchase;
pub use limits::Limits;
pub use model::{BillingInterval, Subscription, SubscriptionStatus};
pub use plan::Plan;
