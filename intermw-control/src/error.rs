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

//! Error taxonomy shared by the broker seam, bridges and the control plane.

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Failures reported by a broker backend.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("listener registration failed: {0}")]
    ListenerRegistration(String),
    #[error("resource release failed: {0}")]
    Release(String),
    #[error("no broker implementation registered under `{0}`")]
    UnknownImplementation(String),
    #[error("topic `{0}` does not exist")]
    TopicNotFound(String),
}

/// Recoverable failure raised by a bridge while processing one message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BridgeError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Public error type of the control plane.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// Invalid or missing connection/naming parameters.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("broker unavailable for topic `{topic}`")]
    BrokerUnavailable {
        topic: String,
        #[source]
        source: BrokerError,
    },
    #[error("unable to register listener on topic `{topic}`")]
    ListenerRegistration {
        topic: String,
        #[source]
        source: BrokerError,
    },
    /// Bridge controller construction failed; nothing acquired for it is left behind.
    #[error("failed to create bridge controller for platform `{platform_id}`")]
    BridgeConstruction {
        platform_id: String,
        #[source]
        source: Box<MiddlewareError>,
    },
    #[error("bridge instantiation failed for platform `{platform_id}`")]
    BridgeInstantiation {
        platform_id: String,
        #[source]
        source: BridgeError,
    },
    #[error("a bridge is already registered for platform `{0}`")]
    AlreadyRegistered(String),
    #[error("no bridge is registered for platform `{0}`")]
    NotRegistered(String),
    #[error("no bridge is registered for platform type `{0}`")]
    UnsupportedPlatformType(String),
    #[error("resource cache has been destroyed")]
    ResourceCacheClosed,
    #[error("unable to release resources of topic `{topic}`")]
    Release {
        topic: String,
        #[source]
        source: BrokerError,
    },
    #[error("unable to spawn dispatch worker")]
    WorkerSpawn(#[source] std::io::Error),
}

impl MiddlewareError {
    pub(crate) fn broker_unavailable(topic: &str, source: BrokerError) -> Self {
        MiddlewareError::BrokerUnavailable {
            topic: topic.to_string(),
            source,
        }
    }

    pub(crate) fn construction(platform_id: &str, source: MiddlewareError) -> Self {
        MiddlewareError::BridgeConstruction {
            platform_id: platform_id.to_string(),
            source: Box::new(source),
        }
    }
}

/// Kind of broker handle involved in a release.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    Publisher,
    Subscriber,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Publisher => write!(f, "publisher"),
            ResourceKind::Subscriber => write!(f, "subscriber"),
        }
    }
}

/// One release call that failed during a sweep.
#[derive(Debug)]
pub struct ReleaseFailure {
    pub topic: String,
    pub kind: ResourceKind,
    pub error: BrokerError,
}

/// Outcome of a best-effort release sweep.
///
/// Failed releases do not abort the sweep; they are collected here and logged.
#[derive(Debug, Default)]
pub struct ReleaseReport {
    pub released: usize,
    pub failures: Vec<ReleaseFailure>,
}

impl ReleaseReport {
    pub fn attempted(&self) -> usize {
        self.released + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: ReleaseReport) {
        self.released += other.released;
        self.failures.extend(other.failures);
    }
}
