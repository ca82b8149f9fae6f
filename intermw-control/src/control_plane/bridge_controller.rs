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

//! Per-platform unit wiring a bridge to its broker topics.

use crate::bridge::Bridge;
use crate::config::Configuration;
use crate::control_plane::resource_cache::{ResourceCache, SubscriptionId};
use crate::data_plane::dispatch_listener::DispatchListener;
use crate::data_plane::dispatch_worker::{DispatchTarget, DispatchWorker};
use crate::error::{MiddlewareError, ReleaseReport};
use crate::error_reporter::ErrorReporter;
use crate::observability::events;
use crate::platform::Platform;
use crate::routing::topic_naming::{resolve, Channel};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

const COMPONENT: &str = "bridge_controller";

/// Dispatch and broker settings shared by every controller of a process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControllerSettings {
    pub queue_size: usize,
    pub time_budget: Option<Duration>,
    /// How long `destroy` waits for an in-flight dispatch to finish.
    pub stop_grace: Duration,
    pub broker_impl: Option<String>,
}

impl ControllerSettings {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            queue_size: configuration.dispatch.queue_size,
            time_budget: configuration.dispatch.timeout_ms.map(Duration::from_millis),
            stop_grace: Duration::from_millis(configuration.default_timeout_ms),
            broker_impl: None,
        }
    }
}

enum ControllerState {
    Active(DispatchWorker),
    Destroyed,
}

/// Owns the inbound subscription and the dispatch worker of one platform's bridge.
///
/// Lifecycle is `Constructing -> Active -> Destroyed`. A controller is only
/// returned once active; destruction is idempotent and final.
pub struct BridgeController {
    platform: Platform,
    inbound_topic: String,
    inbound_subscription: SubscriptionId,
    outbound_topic: String,
    cache: Arc<ResourceCache>,
    stop_grace: Duration,
    state: Mutex<ControllerState>,
}

impl BridgeController {
    /// Wires `bridge` to the platform's topics.
    ///
    /// On failure everything acquired for this controller is released before
    /// returning [`MiddlewareError::BridgeConstruction`].
    pub async fn new(
        platform: Platform,
        mut bridge: Box<dyn Bridge>,
        cache: Arc<ResourceCache>,
        settings: &ControllerSettings,
    ) -> Result<Self, MiddlewareError> {
        let platform_id = platform.platform_id.clone();
        let broker_impl = settings.broker_impl.as_deref();

        let topics = resolve(Channel::BridgeIpsmrm, Some(platform_id.as_str())).and_then(|outbound| {
            resolve(Channel::IpsmrmBridge, Some(platform_id.as_str()))
                .map(|inbound| (outbound, inbound))
        });
        let (outbound_topic, inbound_topic) =
            topics.map_err(|err| Self::construction_failed(&platform_id, err))?;
        let error_topic = resolve(Channel::Error, None)
            .map_err(|err| Self::construction_failed(&platform_id, err))?;

        let publisher = cache
            .get_publisher(&outbound_topic, broker_impl)
            .await
            .map_err(|err| Self::construction_failed(&platform_id, err))?;
        bridge.set_publisher(publisher);

        let error_publisher = match cache.get_publisher(&error_topic, broker_impl).await {
            Ok(error_publisher) => error_publisher,
            Err(err) => {
                Self::roll_back(&cache, &platform_id, &outbound_topic).await;
                return Err(Self::construction_failed(&platform_id, err));
            }
        };
        let error_reporter = ErrorReporter::new(error_publisher).for_platform(&platform_id);
        bridge.set_error_reporter(error_reporter.clone());

        let (sender, receiver) = mpsc::channel(settings.queue_size);
        let target = DispatchTarget {
            platform_id: platform_id.clone(),
            bridge: Arc::from(bridge),
            error_reporter,
            time_budget: settings.time_budget,
        };
        let worker = match DispatchWorker::spawn(target, receiver) {
            Ok(worker) => worker,
            Err(err) => {
                Self::roll_back(&cache, &platform_id, &outbound_topic).await;
                return Err(Self::construction_failed(
                    &platform_id,
                    MiddlewareError::WorkerSpawn(err),
                ));
            }
        };

        let listener = Arc::new(DispatchListener::new(&platform_id, sender));
        let inbound_subscription = match cache.subscribe(&inbound_topic, listener, broker_impl).await {
            Ok(id) => id,
            Err(err) => {
                worker.stop(settings.stop_grace).await;
                Self::roll_back(&cache, &platform_id, &outbound_topic).await;
                return Err(Self::construction_failed(&platform_id, err));
            }
        };

        info!(
            event = events::CONTROLLER_ACTIVE,
            component = COMPONENT,
            platform_id = platform_id.as_str(),
            inbound_topic = inbound_topic.as_str(),
            outbound_topic = outbound_topic.as_str(),
            worker_id = worker.worker_id(),
            worker_thread = worker.runtime_thread(),
            "bridge controller active"
        );

        Ok(Self {
            platform,
            inbound_topic,
            inbound_subscription,
            outbound_topic,
            cache,
            stop_grace: settings.stop_grace,
            state: Mutex::new(ControllerState::Active(worker)),
        })
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn platform_id(&self) -> &str {
        &self.platform.platform_id
    }

    /// Router-to-bridge topic this controller subscribes to.
    pub fn inbound_topic(&self) -> &str {
        &self.inbound_topic
    }

    /// Bridge-to-router topic the bridge publishes on.
    pub fn outbound_topic(&self) -> &str {
        &self.outbound_topic
    }

    pub async fn is_active(&self) -> bool {
        matches!(*self.state.lock().await, ControllerState::Active(_))
    }

    /// Releases this controller's inbound subscriber and stops the dispatch worker.
    ///
    /// Other subscribers of the inbound topic are kept. The outbound publisher
    /// stays cached; see [`Self::release_publisher`].
    pub async fn destroy(&self) -> ReleaseReport {
        let mut state = self.state.lock().await;
        let ControllerState::Active(worker) =
            std::mem::replace(&mut *state, ControllerState::Destroyed)
        else {
            debug!(
                event = events::CONTROLLER_DESTROY_SKIPPED,
                component = COMPONENT,
                platform_id = self.platform_id(),
                "bridge controller already destroyed"
            );
            return ReleaseReport::default();
        };

        let report = self
            .cache
            .cancel_subscription(&self.inbound_topic, self.inbound_subscription)
            .await;
        let stopped = worker.stop(self.stop_grace).await;

        info!(
            event = events::CONTROLLER_DESTROY,
            component = COMPONENT,
            platform_id = self.platform_id(),
            released = report.released,
            failed = report.failures.len(),
            worker_stopped = stopped,
            "bridge controller destroyed"
        );

        report
    }

    /// Removes the outbound publisher from the shared cache, for permanent unregistration.
    pub async fn release_publisher(&self) -> Result<(), MiddlewareError> {
        self.cache.remove_publisher(&self.outbound_topic).await
    }

    fn construction_failed(platform_id: &str, err: MiddlewareError) -> MiddlewareError {
        warn!(
            event = events::CONTROLLER_CONSTRUCT_FAILED,
            component = COMPONENT,
            platform_id,
            err = %err,
            "bridge controller construction failed"
        );
        MiddlewareError::construction(platform_id, err)
    }

    async fn roll_back(cache: &ResourceCache, platform_id: &str, outbound_topic: &str) {
        debug!(
            event = events::CONTROLLER_ROLLBACK,
            component = COMPONENT,
            platform_id,
            topic = outbound_topic,
            "releasing resources of failed bridge controller"
        );
        // Release failures are already logged by the cache.
        let _ = cache.remove_publisher(outbound_topic).await;
    }
}
