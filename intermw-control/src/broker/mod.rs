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

//! Broker abstraction.
//!
//! The control plane only talks to a message bus through the [`Broker`],
//! [`Publisher`], [`Subscriber`] and [`Listener`] capabilities. Backends are
//! selected by name through a [`BrokerRegistry`] populated at startup.

pub mod loopback;

use crate::config::BrokerSettings;
use crate::error::BrokerError;
use crate::message::Message;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Callback bound to a [`Subscriber`]; invoked once per delivered message.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn on_receive(&self, message: Message);
}

#[async_trait]
pub trait Publisher: Send + Sync {
    fn topic(&self) -> &str;

    async fn publish(&self, message: Message) -> Result<(), BrokerError>;

    /// Administrative deletion of `topic` on the broker.
    async fn delete_topic(&self, topic: &str) -> Result<(), BrokerError>;

    /// Releases the broker-side resources of this publisher. Idempotent.
    async fn clean_up(&self) -> Result<(), BrokerError>;
}

#[async_trait]
pub trait Subscriber: Send + Sync {
    fn topic(&self) -> &str;

    async fn subscribe(&self, listener: Arc<dyn Listener>) -> Result<(), BrokerError>;

    /// Detaches the bound listener and releases broker-side resources. Idempotent.
    async fn clean_up(&self) -> Result<(), BrokerError>;
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Registry key of this implementation.
    fn implementation(&self) -> &str;

    async fn create_publisher(&self, topic: &str) -> Result<Arc<dyn Publisher>, BrokerError>;

    async fn create_subscriber(&self, topic: &str) -> Result<Arc<dyn Subscriber>, BrokerError>;
}

pub type BrokerFactory =
    Arc<dyn Fn(&BrokerSettings) -> Result<Arc<dyn Broker>, BrokerError> + Send + Sync>;

/// Named broker implementations, each instantiated at most once.
pub struct BrokerRegistry {
    settings: BrokerSettings,
    factories: HashMap<String, BrokerFactory>,
    instances: Mutex<HashMap<String, Arc<dyn Broker>>>,
}

impl BrokerRegistry {
    /// Creates an empty registry; `settings.broker_type` is the default key.
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            factories: HashMap::new(),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Registry with the in-process [`loopback::LoopbackBroker`] available.
    pub fn with_loopback(settings: BrokerSettings) -> Self {
        let mut registry = Self::new(settings);
        registry.register_factory(loopback::LOOPBACK, |_| {
            Ok(Arc::new(loopback::LoopbackBroker::new()) as Arc<dyn Broker>)
        });
        registry
    }

    pub fn register_factory<F>(&mut self, implementation: &str, factory: F)
    where
        F: Fn(&BrokerSettings) -> Result<Arc<dyn Broker>, BrokerError> + Send + Sync + 'static,
    {
        self.factories
            .insert(implementation.to_string(), Arc::new(factory));
    }

    /// Registers an already constructed broker under `implementation`.
    pub fn register_instance(&mut self, implementation: &str, broker: Arc<dyn Broker>) {
        self.register_factory(implementation, move |_| Ok(broker.clone()));
    }

    pub fn default_implementation(&self) -> &str {
        &self.settings.broker_type
    }

    pub fn implementations(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Resolves `implementation` (or the default one), instantiating it on first use.
    pub async fn broker(&self, implementation: Option<&str>) -> Result<Arc<dyn Broker>, BrokerError> {
        let key = implementation.unwrap_or(self.settings.broker_type.as_str());

        let mut instances = self.instances.lock().await;
        if let Some(broker) = instances.get(key) {
            return Ok(broker.clone());
        }

        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| BrokerError::UnknownImplementation(key.to_string()))?;
        let broker = factory(&self.settings)?;
        instances.insert(key.to_string(), broker.clone());

        Ok(broker)
    }
}
