//! Cross-crate integration tests over a full engine.

mod helpers;

mod archive_test;
mod concurrency_test;
mod invariant_test;
mod scenario_test;
