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

//! Platform bridge capability and the per-platform-type factory table.

use crate::broker::Publisher;
use crate::error::{BridgeError, MiddlewareError};
use crate::error_reporter::ErrorReporter;
use crate::message::Message;
use crate::platform::Platform;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Translates between the common message format and one platform's native protocol.
///
/// The controller injects the outbound publisher and the error reporter before
/// the first message is processed; the bridge never owns their lifecycle.
#[async_trait]
pub trait Bridge: Send + Sync {
    fn set_publisher(&mut self, publisher: Arc<dyn Publisher>);

    fn set_error_reporter(&mut self, error_reporter: ErrorReporter);

    async fn process(&self, message: Message) -> Result<(), BridgeError>;
}

/// Settings handed to a bridge factory.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BridgeConfiguration {
    pub platform_id: String,
    /// `bridge.`-scoped properties with the prefix stripped.
    pub properties: BTreeMap<String, String>,
}

impl BridgeConfiguration {
    pub fn new(platform_id: &str, properties: BTreeMap<String, String>) -> Self {
        Self {
            platform_id: platform_id.to_string(),
            properties,
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

pub type BridgeFactory = Arc<
    dyn Fn(&Platform, &BridgeConfiguration) -> Result<Box<dyn Bridge>, BridgeError> + Send + Sync,
>;

/// Bridge constructors keyed by platform type.
#[derive(Clone, Default)]
pub struct BridgeFactories {
    factories: HashMap<String, BridgeFactory>,
}

impl BridgeFactories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, platform_type: &str, factory: F)
    where
        F: Fn(&Platform, &BridgeConfiguration) -> Result<Box<dyn Bridge>, BridgeError>
            + Send
            + Sync
            + 'static,
    {
        self.factories
            .insert(platform_type.to_string(), Arc::new(factory));
    }

    pub fn supported_platform_types(&self) -> Vec<String> {
        let mut platform_types: Vec<String> = self.factories.keys().cloned().collect();
        platform_types.sort();
        platform_types
    }

    /// Instantiates the bridge registered for `platform.platform_type`.
    pub fn create(
        &self,
        platform: &Platform,
        configuration: &BridgeConfiguration,
    ) -> Result<Box<dyn Bridge>, MiddlewareError> {
        let factory = self.factories.get(&platform.platform_type).ok_or_else(|| {
            MiddlewareError::UnsupportedPlatformType(platform.platform_type.clone())
        })?;

        factory(platform, configuration).map_err(|source| MiddlewareError::BridgeInstantiation {
            platform_id: platform.platform_id.clone(),
            source,
        })
    }
}
