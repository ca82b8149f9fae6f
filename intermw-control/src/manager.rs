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

use crate::bridge::{BridgeConfiguration, BridgeFactories};
use crate::broker::{BrokerRegistry, Publisher};
use crate::config::{Configuration, BRIDGE_PROPERTY_PREFIX};
use crate::control_plane::bridge_controller::{BridgeController, ControllerSettings};
use crate::control_plane::platform_registry::PlatformRegistry;
use crate::control_plane::resource_cache::ResourceCache;
use crate::error::{
    BrokerError, MiddlewareError, ReleaseFailure, ReleaseReport, ResourceKind,
};
use crate::error_monitor::ErrorChannelMonitor;
use crate::error_reporter::{ErrorCode, ErrorRecord, ErrorReporter};
use crate::observability::events;
use crate::platform::Platform;
use crate::routing::topic_naming::{resolve, Channel};
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "bridge_manager";

/// Composition root of the control plane.
///
/// Owns the shared [`ResourceCache`], the bridge factory table, the process
/// error reporter and one [`BridgeController`] per registered platform.
pub struct BridgeManager {
    configuration: Configuration,
    cache: Arc<ResourceCache>,
    factories: BridgeFactories,
    platforms: PlatformRegistry,
    error_publisher: Arc<dyn Publisher>,
    error_reporter: ErrorReporter,
    controller_settings: ControllerSettings,
}

impl BridgeManager {
    /// Validates `configuration` and acquires the error channel publisher.
    pub async fn new(
        configuration: Configuration,
        brokers: Arc<BrokerRegistry>,
        factories: BridgeFactories,
    ) -> Result<Self, MiddlewareError> {
        configuration.validate()?;

        let cache = Arc::new(ResourceCache::new(brokers));
        let error_topic = resolve(Channel::Error, None)?;
        let error_publisher = cache.get_publisher(&error_topic, None).await?;
        let error_reporter = ErrorReporter::new(error_publisher.clone());
        let controller_settings = ControllerSettings::from_configuration(&configuration);

        Ok(Self {
            configuration,
            cache,
            factories,
            platforms: PlatformRegistry::new(),
            error_publisher,
            error_reporter,
            controller_settings,
        })
    }

    /// Instantiates the bridge for `platform` and activates its controller.
    ///
    /// Rejects a platform id that is registered or still being registered.
    pub async fn register_platform(&self, platform: Platform) -> Result<(), MiddlewareError> {
        let platform_id = platform.platform_id.clone();
        info!(
            event = events::PLATFORM_REGISTER_START,
            component = COMPONENT,
            platform_id = platform_id.as_str(),
            platform_type = platform.platform_type.as_str(),
            "registering platform"
        );

        self.platforms
            .reserve(&platform_id)
            .await
            .inspect_err(|err| Self::log_register_failure(&platform_id, err))?;

        let activated = match self.activate(platform).await {
            Ok(controller) => match self.platforms.activate(&platform_id, controller).await {
                Ok(()) => Ok(()),
                Err(controller) => {
                    self.tear_down(&controller).await;
                    Err(MiddlewareError::ResourceCacheClosed)
                }
            },
            Err(err) => Err(err),
        };

        match activated {
            Ok(()) => {
                info!(
                    event = events::PLATFORM_REGISTER_OK,
                    component = COMPONENT,
                    platform_id = platform_id.as_str(),
                    "platform registered"
                );
                Ok(())
            }
            Err(err) => {
                self.platforms.cancel(&platform_id).await;
                Self::log_register_failure(&platform_id, &err);
                let record = ErrorRecord::new(ErrorCode::CannotCreateComponent, err.to_string())
                    .with_platform_id(&platform_id);
                let _ = self.error_reporter.report(record).await;
                Err(err)
            }
        }
    }

    async fn activate(&self, platform: Platform) -> Result<Arc<BridgeController>, MiddlewareError> {
        let configuration = BridgeConfiguration::new(
            &platform.platform_id,
            self.configuration.bridge_properties(BRIDGE_PROPERTY_PREFIX),
        );
        let bridge = self
            .factories
            .create(&platform, &configuration)
            .map_err(|err| MiddlewareError::construction(&platform.platform_id, err))?;
        let controller = BridgeController::new(
            platform,
            bridge,
            self.cache.clone(),
            &self.controller_settings,
        )
        .await?;

        Ok(Arc::new(controller))
    }

    /// Destroys the platform's controller and removes its outbound publisher.
    pub async fn unregister_platform(
        &self,
        platform_id: &str,
    ) -> Result<ReleaseReport, MiddlewareError> {
        info!(
            event = events::PLATFORM_UNREGISTER_START,
            component = COMPONENT,
            platform_id,
            "unregistering platform"
        );

        let controller = self
            .platforms
            .begin_unregister(platform_id)
            .await
            .inspect_err(|err| {
                warn!(
                    event = events::PLATFORM_UNREGISTER_FAILED,
                    component = COMPONENT,
                    platform_id,
                    err = %err,
                    "platform unregistration failed"
                );
            })?;

        let report = self.tear_down(&controller).await;
        self.platforms.finish_unregister(platform_id).await;

        info!(
            event = events::PLATFORM_UNREGISTER_OK,
            component = COMPONENT,
            platform_id,
            released = report.released,
            failed = report.failures.len(),
            "platform unregistered"
        );

        Ok(report)
    }

    pub async fn is_registered(&self, platform_id: &str) -> bool {
        self.platforms.is_active(platform_id).await
    }

    pub async fn registered_platforms(&self) -> Vec<String> {
        self.platforms.active_platform_ids().await
    }

    pub fn supported_platform_types(&self) -> Vec<String> {
        self.factories.supported_platform_types()
    }

    pub fn error_reporter(&self) -> &ErrorReporter {
        &self.error_reporter
    }

    pub fn resource_cache(&self) -> Arc<ResourceCache> {
        self.cache.clone()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Subscribes an [`ErrorChannelMonitor`] on the error topic.
    pub async fn install_error_monitor(&self) -> Result<ErrorChannelMonitor, MiddlewareError> {
        ErrorChannelMonitor::install(&self.cache, self.controller_settings.broker_impl.as_deref())
            .await
    }

    /// Deletes both platform-scoped topics of an unregistered platform on the broker.
    ///
    /// Topics that do not exist are skipped.
    pub async fn purge_platform_topics(&self, platform_id: &str) -> Result<(), MiddlewareError> {
        if self.platforms.is_claimed(platform_id).await {
            return Err(MiddlewareError::AlreadyRegistered(platform_id.to_string()));
        }

        for channel in [Channel::BridgeIpsmrm, Channel::IpsmrmBridge] {
            let topic = resolve(channel, Some(platform_id))?;
            match self.error_publisher.delete_topic(&topic).await {
                Ok(()) | Err(BrokerError::TopicNotFound(_)) => {}
                Err(err) => return Err(MiddlewareError::broker_unavailable(&topic, err)),
            }
        }

        info!(
            event = events::PLATFORM_TOPICS_PURGED,
            component = COMPONENT,
            platform_id,
            "platform topics deleted"
        );
        Ok(())
    }

    /// Destroys every controller, then the resource cache.
    ///
    /// Registrations still in flight are torn down when they complete and
    /// fail with [`MiddlewareError::ResourceCacheClosed`].
    pub async fn shutdown(&self) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        for controller in self.platforms.close().await {
            report.merge(controller.destroy().await);
        }
        report.merge(self.cache.destroy().await);
        report
    }

    /// Destroys `controller` and removes its outbound publisher.
    async fn tear_down(&self, controller: &BridgeController) -> ReleaseReport {
        let mut report = controller.destroy().await;
        match controller.release_publisher().await {
            Ok(()) => report.released += 1,
            Err(MiddlewareError::Release { topic, source }) => {
                report.failures.push(ReleaseFailure {
                    topic,
                    kind: ResourceKind::Publisher,
                    error: source,
                });
            }
            Err(err) => {
                warn!(
                    event = events::RESOURCE_RELEASE_FAILED,
                    component = COMPONENT,
                    platform_id = controller.platform_id(),
                    err = %err,
                    "unable to release outbound publisher"
                );
            }
        }
        report
    }

    fn log_register_failure(platform_id: &str, err: &MiddlewareError) {
        warn!(
            event = events::PLATFORM_REGISTER_FAILED,
            component = COMPONENT,
            platform_id,
            err = %err,
            "platform registration failed"
        );
    }
}
