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

//! In-process broker used by the router binary and by tests.
//!
//! Topics are created implicitly by the first publisher or subscriber and live
//! until deleted through [`Publisher::delete_topic`]. Publishing delivers the
//! message to every listener bound to the topic at that moment, in
//! subscription order, on the publishing task.

use super::{Broker, Listener, Publisher, Subscriber};
use crate::error::BrokerError;
use crate::message::Message;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub const LOOPBACK: &str = "loopback";

const COMPONENT: &str = "loopback_broker";

#[derive(Default)]
struct TopicState {
    publishers: usize,
    listeners: Vec<(u64, Arc<dyn Listener>)>,
}

#[derive(Default)]
struct Topics {
    by_name: Mutex<HashMap<String, TopicState>>,
    next_listener_id: AtomicU64,
}

impl Topics {
    async fn listeners(&self, topic: &str) -> Result<Vec<Arc<dyn Listener>>, BrokerError> {
        let by_name = self.by_name.lock().await;
        by_name
            .get(topic)
            .map(|state| {
                state
                    .listeners
                    .iter()
                    .map(|(_, listener)| listener.clone())
                    .collect()
            })
            .ok_or_else(|| BrokerError::TopicNotFound(topic.to_string()))
    }
}

#[derive(Default)]
pub struct LoopbackBroker {
    topics: Arc<Topics>,
}

impl LoopbackBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn topic_exists(&self, topic: &str) -> bool {
        self.topics.by_name.lock().await.contains_key(topic)
    }

    /// Number of live (not cleaned up) publishers on `topic`.
    pub async fn publisher_count(&self, topic: &str) -> usize {
        self.topics
            .by_name
            .lock()
            .await
            .get(topic)
            .map_or(0, |state| state.publishers)
    }

    /// Number of listeners currently bound on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .by_name
            .lock()
            .await
            .get(topic)
            .map_or(0, |state| state.listeners.len())
    }

    pub async fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.by_name.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Broker for LoopbackBroker {
    fn implementation(&self) -> &str {
        LOOPBACK
    }

    async fn create_publisher(&self, topic: &str) -> Result<Arc<dyn Publisher>, BrokerError> {
        let mut by_name = self.topics.by_name.lock().await;
        by_name.entry(topic.to_string()).or_default().publishers += 1;

        Ok(Arc::new(LoopbackPublisher {
            topic: topic.to_string(),
            topics: self.topics.clone(),
            released: AtomicBool::new(false),
        }))
    }

    async fn create_subscriber(&self, topic: &str) -> Result<Arc<dyn Subscriber>, BrokerError> {
        let mut by_name = self.topics.by_name.lock().await;
        by_name.entry(topic.to_string()).or_default();

        Ok(Arc::new(LoopbackSubscriber {
            topic: topic.to_string(),
            topics: self.topics.clone(),
            listener_id: Mutex::new(None),
        }))
    }
}

struct LoopbackPublisher {
    topic: String,
    topics: Arc<Topics>,
    released: AtomicBool,
}

#[async_trait]
impl Publisher for LoopbackPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish(&self, message: Message) -> Result<(), BrokerError> {
        if self.released.load(Ordering::Acquire) {
            return Err(BrokerError::Unavailable(format!(
                "publisher for `{}` has been released",
                self.topic
            )));
        }

        let listeners = self.topics.listeners(&self.topic).await?;
        debug!(
            component = COMPONENT,
            topic = self.topic.as_str(),
            listeners = listeners.len(),
            "delivering message"
        );

        for listener in listeners {
            listener.on_receive(message.clone()).await;
        }

        Ok(())
    }

    async fn delete_topic(&self, topic: &str) -> Result<(), BrokerError> {
        self.topics
            .by_name
            .lock()
            .await
            .remove(topic)
            .map(|_| ())
            .ok_or_else(|| BrokerError::TopicNotFound(topic.to_string()))
    }

    async fn clean_up(&self) -> Result<(), BrokerError> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Some(state) = self.topics.by_name.lock().await.get_mut(&self.topic) {
            state.publishers = state.publishers.saturating_sub(1);
        }
        Ok(())
    }
}

struct LoopbackSubscriber {
    topic: String,
    topics: Arc<Topics>,
    listener_id: Mutex<Option<u64>>,
}

#[async_trait]
impl Subscriber for LoopbackSubscriber {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn subscribe(&self, listener: Arc<dyn Listener>) -> Result<(), BrokerError> {
        let mut listener_id = self.listener_id.lock().await;
        if listener_id.is_some() {
            return Err(BrokerError::ListenerRegistration(format!(
                "subscriber for `{}` already has a listener",
                self.topic
            )));
        }

        let id = self.topics.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.topics
            .by_name
            .lock()
            .await
            .entry(self.topic.clone())
            .or_default()
            .listeners
            .push((id, listener));
        *listener_id = Some(id);

        Ok(())
    }

    async fn clean_up(&self) -> Result<(), BrokerError> {
        let Some(id) = self.listener_id.lock().await.take() else {
            return Ok(());
        };

        if let Some(state) = self.topics.by_name.lock().await.get_mut(&self.topic) {
            state.listeners.retain(|(listener_id, _)| *listener_id != id);
        }
        Ok(())
    }
}
