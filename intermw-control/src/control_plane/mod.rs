//! Control-plane layer.
//!
//! Owns broker resource lifetime and the bridge-controller lifecycle. The
//! resource cache deduplicates publishers per topic and guarantees teardown;
//! the platform registry makes registration of one platform id exclusive and
//! rolls back a failed registration.
//!
//! ```
//! use std::sync::Arc;
//! use intermw_control::{BrokerRegistry, BrokerSettings, ResourceCache, LOOPBACK};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let brokers = BrokerRegistry::with_loopback(BrokerSettings {
//!     broker_type: LOOPBACK.to_string(),
//!     ..Default::default()
//! });
//! let cache = ResourceCache::new(Arc::new(brokers));
//!
//! let first = cache.get_publisher("prm_srm", None).await.unwrap();
//! let second = cache.get_publisher("prm_srm", None).await.unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//!
//! assert!(cache.destroy().await.is_clean());
//! assert!(cache.get_publisher("prm_srm", None).await.is_err());
//! # });
//! ```

pub(crate) mod bridge_controller;
pub(crate) mod platform_registry;
pub(crate) mod resource_cache;
