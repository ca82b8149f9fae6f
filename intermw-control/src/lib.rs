/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # intermw-control
//!
//! `intermw-control` is the control-plane routing and bridge-lifecycle engine of
//! the interoperability middleware. It keeps per-topic broker resources in a
//! shared cache, names every channel deterministically, and runs one bridge
//! controller per registered IoT platform.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use intermw_control::{
//!     Bridge, BridgeError, BridgeFactories, BridgeManager, BrokerRegistry, Configuration,
//!     ErrorReporter, Message, Platform, Publisher, LOOPBACK,
//! };
//!
//! struct EchoBridge {
//!     publisher: Option<Arc<dyn Publisher>>,
//! }
//!
//! #[async_trait]
//! impl Bridge for EchoBridge {
//!     fn set_publisher(&mut self, publisher: Arc<dyn Publisher>) {
//!         self.publisher = Some(publisher);
//!     }
//!
//!     fn set_error_reporter(&mut self, _error_reporter: ErrorReporter) {}
//!
//!     async fn process(&self, message: Message) -> Result<(), BridgeError> {
//!         let publisher = self
//!             .publisher
//!             .as_ref()
//!             .ok_or_else(|| BridgeError::new("publisher not injected"))?;
//!         publisher
//!             .publish(Message::response_to(&message))
//!             .await
//!             .map_err(|err| BridgeError::with_source("unable to respond", err))
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let configuration = Configuration::with_broker_type(LOOPBACK);
//! let brokers = Arc::new(BrokerRegistry::with_loopback(configuration.broker.clone()));
//! let mut factories = BridgeFactories::new();
//! factories.register("echo", |_, _| {
//!     Ok(Box::new(EchoBridge { publisher: None }) as Box<dyn Bridge>)
//! });
//!
//! let manager = BridgeManager::new(configuration, brokers, factories).await.unwrap();
//! let platform = Platform::new("http://test.inter-iot.eu/test-platform1", "echo");
//!
//! manager.register_platform(platform.clone()).await.unwrap();
//! assert!(manager.register_platform(platform).await.is_err());
//! assert!(manager.is_registered("http://test.inter-iot.eu/test-platform1").await);
//!
//! manager
//!     .unregister_platform("http://test.inter-iot.eu/test-platform1")
//!     .await
//!     .unwrap();
//! assert!(manager.registered_platforms().await.is_empty());
//! assert!(manager.shutdown().await.is_clean());
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Broker: capability traits over a message bus and the named implementation registry
//! - Routing: logical channels and topic-name resolution
//! - Control plane: resource cache, bridge controllers and platform registration
//! - Data plane: dispatch listener and fault-isolating dispatch worker
//! - Runtime: dedicated dispatch threads
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

mod bridge;
pub use bridge::{Bridge, BridgeConfiguration, BridgeFactories, BridgeFactory};

pub mod broker;
pub use broker::loopback::{LoopbackBroker, LOOPBACK};
pub use broker::{Broker, BrokerFactory, BrokerRegistry, Listener, Publisher, Subscriber};

mod config;
pub use config::{
    BrokerSettings, Configuration, DispatchSettings, BRIDGE_PROPERTY_PREFIX,
    DEFAULT_DISPATCH_QUEUE_SIZE, DEFAULT_TIMEOUT_MS,
};

mod control_plane;
pub use control_plane::bridge_controller::{BridgeController, ControllerSettings};
pub use control_plane::resource_cache::{ResourceCache, SubscriptionId};

mod data_plane;

mod error;
pub use error::{
    BridgeError, BrokerError, MiddlewareError, ReleaseFailure, ReleaseReport, ResourceKind,
};

mod error_monitor;
pub use error_monitor::ErrorChannelMonitor;

mod error_reporter;
pub use error_reporter::{
    describe_failure, ErrorCode, ErrorRecord, ErrorReporter, NO_ERROR_DESCRIPTION,
};

mod manager;
pub use manager::BridgeManager;

pub mod message;
pub use message::Message;

#[doc(hidden)]
pub mod observability;

mod platform;
pub use platform::Platform;

mod routing;
pub use routing::topic_naming::{resolve, sanitize, Channel};

mod runtime;
