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

//! Startup configuration consumed read-only by the composition root.

use crate::error::MiddlewareError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_DISPATCH_QUEUE_SIZE: usize = 1024;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const BRIDGE_PROPERTY_PREFIX: &str = "bridge.";

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    pub broker: BrokerSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Free-form bridge properties, e.g. `bridge.test-platform.endpoint`.
    #[serde(default)]
    pub bridges: BTreeMap<String, String>,
}

/// Connection parameters handed to broker factories.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BrokerSettings {
    /// Key of the default broker implementation.
    pub broker_type: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchSettings {
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    /// Per-message time budget for `Bridge::process`; unbounded when absent.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_DISPATCH_QUEUE_SIZE,
            timeout_ms: None,
        }
    }
}

fn default_queue_size() -> usize {
    DEFAULT_DISPATCH_QUEUE_SIZE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Configuration {
    /// Builds a configuration for the given default broker implementation.
    pub fn with_broker_type(broker_type: &str) -> Self {
        Self {
            broker: BrokerSettings {
                broker_type: broker_type.to_string(),
                ..Default::default()
            },
            dispatch: DispatchSettings::default(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            bridges: BTreeMap::new(),
        }
    }

    pub fn from_json5_str(contents: &str) -> Result<Self, MiddlewareError> {
        let configuration: Configuration = json5::from_str(contents).map_err(|e| {
            MiddlewareError::Configuration(format!("unable to parse configuration: {e}"))
        })?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MiddlewareError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MiddlewareError::Configuration(format!(
                "unable to read configuration file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json5_str(&contents)
    }

    pub fn validate(&self) -> Result<(), MiddlewareError> {
        if self.broker.broker_type.trim().is_empty() {
            return Err(MiddlewareError::Configuration(
                "broker.broker_type must not be empty".to_string(),
            ));
        }
        if self.dispatch.queue_size == 0 {
            return Err(MiddlewareError::Configuration(
                "dispatch.queue_size must be greater than zero".to_string(),
            ));
        }
        if self.dispatch.timeout_ms == Some(0) {
            return Err(MiddlewareError::Configuration(
                "dispatch.timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        if self.default_timeout_ms == 0 {
            return Err(MiddlewareError::Configuration(
                "default_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the bridge properties under `prefix`, with the prefix stripped.
    pub fn bridge_properties(&self, prefix: &str) -> BTreeMap<String, String> {
        self.bridges
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .filter(|stripped| !stripped.is_empty())
                    .map(|stripped| (stripped.to_string(), value.clone()))
            })
            .collect()
    }
}
