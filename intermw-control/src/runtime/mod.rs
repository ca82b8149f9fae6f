//! Runtime integration layer.
//!
//! Bridge dispatch runs on dedicated threads, each driving a current-thread
//! Tokio runtime, so a slow bridge never starves broker delivery or other
//! platforms.

pub(crate) mod worker_runtime;
