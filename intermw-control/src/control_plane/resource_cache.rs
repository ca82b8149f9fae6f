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

//! Per-process cache of broker publisher and subscriber handles, keyed by topic.

use crate::broker::{BrokerRegistry, Listener, Publisher, Subscriber};
use crate::error::{
    BrokerError, MiddlewareError, ReleaseFailure, ReleaseReport, ResourceKind,
};
use crate::observability::events;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "resource_cache";

/// Handle of one subscriber created through [`ResourceCache::subscribe`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct CacheState {
    publishers: HashMap<String, Arc<dyn Publisher>>,
    subscribers: HashMap<String, Vec<(SubscriptionId, Arc<dyn Subscriber>)>>,
    next_subscription: u64,
    closed: bool,
}

/// Single owner of the broker resources created by this process.
///
/// One lock guards both maps and is held across broker calls, so at most one
/// publisher is ever created per topic and teardown never interleaves with an
/// in-flight subscription.
pub struct ResourceCache {
    brokers: Arc<BrokerRegistry>,
    state: Mutex<CacheState>,
}

impl ResourceCache {
    pub fn new(brokers: Arc<BrokerRegistry>) -> Self {
        Self {
            brokers,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the cached publisher for `topic`, creating it on first use.
    pub async fn get_publisher(
        &self,
        topic: &str,
        broker_impl: Option<&str>,
    ) -> Result<Arc<dyn Publisher>, MiddlewareError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(MiddlewareError::ResourceCacheClosed);
        }

        if let Some(publisher) = state.publishers.get(topic) {
            debug!(
                event = events::RESOURCE_PUBLISHER_REUSE,
                component = COMPONENT,
                topic,
                "reusing cached publisher"
            );
            return Ok(publisher.clone());
        }

        let broker = self
            .brokers
            .broker(broker_impl)
            .await
            .map_err(|err| MiddlewareError::broker_unavailable(topic, err))?;
        let publisher = broker
            .create_publisher(topic)
            .await
            .map_err(|err| MiddlewareError::broker_unavailable(topic, err))?;

        state
            .publishers
            .insert(topic.to_string(), publisher.clone());
        debug!(
            event = events::RESOURCE_PUBLISHER_CREATE,
            component = COMPONENT,
            topic,
            broker = broker.implementation(),
            "created publisher"
        );

        Ok(publisher)
    }

    /// Creates a new subscriber on `topic` bound to `listener`. Subscribers are never deduplicated.
    ///
    /// The returned id releases exactly this subscriber via [`Self::cancel_subscription`].
    pub async fn subscribe(
        &self,
        topic: &str,
        listener: Arc<dyn Listener>,
        broker_impl: Option<&str>,
    ) -> Result<SubscriptionId, MiddlewareError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(MiddlewareError::ResourceCacheClosed);
        }

        let broker = self
            .brokers
            .broker(broker_impl)
            .await
            .map_err(|err| MiddlewareError::broker_unavailable(topic, err))?;
        let subscriber = broker
            .create_subscriber(topic)
            .await
            .map_err(|err| MiddlewareError::broker_unavailable(topic, err))?;

        if let Err(err) = subscriber.subscribe(listener).await {
            warn!(
                event = events::RESOURCE_SUBSCRIBE_FAILED,
                component = COMPONENT,
                topic,
                err = %err,
                "listener registration failed; releasing subscriber"
            );
            if let Err(release_err) = subscriber.clean_up().await {
                log_release_failure(topic, ResourceKind::Subscriber, &release_err);
            }
            return Err(MiddlewareError::ListenerRegistration {
                topic: topic.to_string(),
                source: err,
            });
        }

        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        let subscribers = state.subscribers.entry(topic.to_string()).or_default();
        subscribers.push((id, subscriber));
        debug!(
            event = events::RESOURCE_SUBSCRIBE_OK,
            component = COMPONENT,
            topic,
            subscribers = subscribers.len(),
            "subscriber registered"
        );

        Ok(id)
    }

    /// Removes and releases the publisher of `topic`. Absent topics are a no-op.
    pub async fn remove_publisher(&self, topic: &str) -> Result<(), MiddlewareError> {
        let mut state = self.state.lock().await;
        let Some(publisher) = state.publishers.remove(topic) else {
            return Ok(());
        };

        match publisher.clean_up().await {
            Ok(()) => {
                log_release_ok(topic, ResourceKind::Publisher);
                Ok(())
            }
            Err(err) => {
                log_release_failure(topic, ResourceKind::Publisher, &err);
                Err(MiddlewareError::Release {
                    topic: topic.to_string(),
                    source: err,
                })
            }
        }
    }

    /// Removes and releases every subscriber of `topic`, whoever created it.
    pub async fn unsubscribe(&self, topic: &str) -> ReleaseReport {
        let mut state = self.state.lock().await;
        let mut report = ReleaseReport::default();

        for (_, subscriber) in state.subscribers.remove(topic).unwrap_or_default() {
            let result = subscriber.clean_up().await;
            record_release(&mut report, topic, ResourceKind::Subscriber, result);
        }

        report
    }

    /// Removes and releases the single subscriber `id` on `topic`.
    ///
    /// Other subscribers of the topic are left alone. Unknown ids are a no-op.
    pub async fn cancel_subscription(&self, topic: &str, id: SubscriptionId) -> ReleaseReport {
        let mut state = self.state.lock().await;
        let mut report = ReleaseReport::default();

        let Some(subscribers) = state.subscribers.get_mut(topic) else {
            return report;
        };
        let Some(position) = subscribers.iter().position(|(owned, _)| *owned == id) else {
            return report;
        };
        let (_, subscriber) = subscribers.remove(position);
        if subscribers.is_empty() {
            state.subscribers.remove(topic);
        }

        let result = subscriber.clean_up().await;
        record_release(&mut report, topic, ResourceKind::Subscriber, result);
        report
    }

    /// Best-effort release of every cached handle; closes the cache.
    ///
    /// The cache is empty afterwards regardless of individual failures, which
    /// are returned in the report. A second call is a no-op.
    pub async fn destroy(&self) -> ReleaseReport {
        let mut state = self.state.lock().await;
        let mut report = ReleaseReport::default();
        if state.closed {
            return report;
        }
        state.closed = true;

        let publishers = std::mem::take(&mut state.publishers);
        let subscribers = std::mem::take(&mut state.subscribers);

        for (topic, publisher) in publishers {
            let result = publisher.clean_up().await;
            record_release(&mut report, &topic, ResourceKind::Publisher, result);
        }
        for (topic, topic_subscribers) in subscribers {
            for (_, subscriber) in topic_subscribers {
                let result = subscriber.clean_up().await;
                record_release(&mut report, &topic, ResourceKind::Subscriber, result);
            }
        }

        info!(
            event = events::RESOURCE_CACHE_DESTROYED,
            component = COMPONENT,
            released = report.released,
            failed = report.failures.len(),
            "resource cache destroyed"
        );

        report
    }

    pub async fn has_publisher(&self, topic: &str) -> bool {
        self.state.lock().await.publishers.contains_key(topic)
    }

    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.state
            .lock()
            .await
            .subscribers
            .get(topic)
            .map_or(0, Vec::len)
    }

    pub async fn publisher_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.state.lock().await.publishers.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub async fn subscriber_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .state
            .lock()
            .await
            .subscribers
            .keys()
            .cloned()
            .collect();
        topics.sort();
        topics
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

fn record_release(
    report: &mut ReleaseReport,
    topic: &str,
    kind: ResourceKind,
    result: Result<(), BrokerError>,
) {
    match result {
        Ok(()) => {
            log_release_ok(topic, kind);
            report.released += 1;
        }
        Err(error) => {
            log_release_failure(topic, kind, &error);
            report.failures.push(ReleaseFailure {
                topic: topic.to_string(),
                kind,
                error,
            });
        }
    }
}

fn log_release_ok(topic: &str, kind: ResourceKind) {
    debug!(
        event = events::RESOURCE_RELEASE_OK,
        component = COMPONENT,
        topic,
        kind = %kind,
        "released broker resource"
    );
}

fn log_release_failure(topic: &str, kind: ResourceKind, err: &BrokerError) {
    warn!(
        event = events::RESOURCE_RELEASE_FAILED,
        component = COMPONENT,
        topic,
        kind = %kind,
        err = %err,
        "failed to release broker resource"
    );
}

#[cfg(test)]
mod tests {
    use super::ResourceCache;
    use crate::broker::{Broker, BrokerRegistry, Listener, Publisher, Subscriber};
    use crate::config::BrokerSettings;
    use crate::error::{BrokerError, MiddlewareError, ResourceKind};
    use crate::message::Message;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TEST_BROKER: &str = "test";

    #[derive(Default)]
    struct Counters {
        publishers_created: AtomicUsize,
        subscribers_created: AtomicUsize,
        release_calls: AtomicUsize,
    }

    /// Broker double; `fail_releases_after` lets every release after the n-th fail.
    struct CountingBroker {
        counters: Arc<Counters>,
        fail_releases_after: Option<usize>,
        reject_listeners: bool,
        unavailable: bool,
    }

    impl CountingBroker {
        fn healthy() -> Self {
            Self {
                counters: Arc::new(Counters::default()),
                fail_releases_after: None,
                reject_listeners: false,
                unavailable: false,
            }
        }
    }

    struct CountingHandle {
        topic: String,
        counters: Arc<Counters>,
        fail_releases_after: Option<usize>,
        reject_listeners: bool,
    }

    impl CountingHandle {
        fn release(&self) -> Result<(), BrokerError> {
            let call = self.counters.release_calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_releases_after {
                Some(limit) if call >= limit => Err(BrokerError::Release(format!(
                    "release #{call} of {} failed",
                    self.topic
                ))),
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl Publisher for CountingHandle {
        fn topic(&self) -> &str {
            &self.topic
        }

        async fn publish(&self, _message: Message) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn delete_topic(&self, _topic: &str) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn clean_up(&self) -> Result<(), BrokerError> {
            self.release()
        }
    }

    #[async_trait]
    impl Subscriber for CountingHandle {
        fn topic(&self) -> &str {
            &self.topic
        }

        async fn subscribe(&self, _listener: Arc<dyn Listener>) -> Result<(), BrokerError> {
            if self.reject_listeners {
                return Err(BrokerError::ListenerRegistration(self.topic.clone()));
            }
            Ok(())
        }

        async fn clean_up(&self) -> Result<(), BrokerError> {
            self.release()
        }
    }

    #[async_trait]
    impl Broker for CountingBroker {
        fn implementation(&self) -> &str {
            TEST_BROKER
        }

        async fn create_publisher(&self, topic: &str) -> Result<Arc<dyn Publisher>, BrokerError> {
            if self.unavailable {
                return Err(BrokerError::Unavailable("broker down".to_string()));
            }
            self.counters
                .publishers_created
                .fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(self.handle(topic)))
        }

        async fn create_subscriber(
            &self,
            topic: &str,
        ) -> Result<Arc<dyn Subscriber>, BrokerError> {
            if self.unavailable {
                return Err(BrokerError::Unavailable("broker down".to_string()));
            }
            self.counters
                .subscribers_created
                .fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(self.handle(topic)))
        }
    }

    impl CountingBroker {
        fn handle(&self, topic: &str) -> CountingHandle {
            CountingHandle {
                topic: topic.to_string(),
                counters: self.counters.clone(),
                fail_releases_after: self.fail_releases_after,
                reject_listeners: self.reject_listeners,
            }
        }
    }

    struct NoopListener;

    #[async_trait]
    impl Listener for NoopListener {
        async fn on_receive(&self, _message: Message) {}
    }

    fn cache_for(broker: CountingBroker) -> (Arc<Counters>, Arc<ResourceCache>) {
        let counters = broker.counters.clone();
        let mut registry = BrokerRegistry::new(BrokerSettings {
            broker_type: TEST_BROKER.to_string(),
            ..Default::default()
        });
        registry.register_instance(TEST_BROKER, Arc::new(broker));
        (counters, Arc::new(ResourceCache::new(Arc::new(registry))))
    }

    #[tokio::test]
    async fn get_publisher_creates_one_publisher_per_topic() {
        let (counters, cache) = cache_for(CountingBroker::healthy());

        let first = cache.get_publisher("prm_srm", None).await.unwrap();
        for _ in 0..10 {
            let again = cache.get_publisher("prm_srm", None).await.unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }

        assert_eq!(counters.publishers_created.load(Ordering::SeqCst), 1);
        assert!(cache.has_publisher("prm_srm").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_get_publisher_never_duplicates() {
        let (counters, cache) = cache_for(CountingBroker::healthy());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_publisher("srm_prm", None).await })
            })
            .collect();
        for task in tasks {
            task.await.expect("task joins").expect("publisher resolves");
        }

        assert_eq!(counters.publishers_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribe_tracks_independent_subscribers() {
        let (counters, cache) = cache_for(CountingBroker::healthy());

        cache.subscribe("error", Arc::new(NoopListener), None).await.unwrap();
        cache.subscribe("error", Arc::new(NoopListener), None).await.unwrap();

        assert_eq!(cache.subscriber_count("error").await, 2);
        assert_eq!(counters.subscribers_created.load(Ordering::SeqCst), 2);

        let report = cache.unsubscribe("error").await;
        assert_eq!(report.released, 2);
        assert_eq!(cache.subscriber_count("error").await, 0);
        assert_eq!(cache.unsubscribe("error").await.attempted(), 0);
    }

    #[tokio::test]
    async fn cancel_subscription_releases_only_its_own_subscriber() {
        let (counters, cache) = cache_for(CountingBroker::healthy());

        let own = cache
            .subscribe("ipsmrm_bridge_a", Arc::new(NoopListener), None)
            .await
            .unwrap();
        let foreign = cache
            .subscribe("ipsmrm_bridge_a", Arc::new(NoopListener), None)
            .await
            .unwrap();
        assert_ne!(own, foreign);

        let report = cache.cancel_subscription("ipsmrm_bridge_a", own).await;
        assert_eq!(report.released, 1);
        assert_eq!(cache.subscriber_count("ipsmrm_bridge_a").await, 1);
        assert_eq!(
            cache
                .cancel_subscription("ipsmrm_bridge_a", own)
                .await
                .attempted(),
            0
        );

        cache.cancel_subscription("ipsmrm_bridge_a", foreign).await;
        assert!(cache.subscriber_topics().await.is_empty());
        assert_eq!(counters.release_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn destroy_sweeps_everything_despite_release_failures() {
        let broker = CountingBroker {
            fail_releases_after: Some(1),
            ..CountingBroker::healthy()
        };
        let (counters, cache) = cache_for(broker);
        let publisher_topics = ["prm_srm", "srm_prm", "error"];
        let subscriber_topics = ["ipsmrm_bridge_a", "ipsmrm_bridge_a", "arm_prm"];

        for topic in publisher_topics {
            cache.get_publisher(topic, None).await.unwrap();
        }
        for topic in subscriber_topics {
            cache.subscribe(topic, Arc::new(NoopListener), None).await.unwrap();
        }

        let report = cache.destroy().await;

        let expected = publisher_topics.len() + subscriber_topics.len();
        assert_eq!(counters.release_calls.load(Ordering::SeqCst), expected);
        assert_eq!(report.attempted(), expected);
        assert_eq!(report.failures.len(), expected - 1);
        assert!(report
            .failures
            .iter()
            .any(|failure| failure.kind == ResourceKind::Subscriber));
        assert!(cache.publisher_topics().await.is_empty());
        assert!(cache.subscriber_topics().await.is_empty());
    }

    #[tokio::test]
    async fn destroyed_cache_is_closed_and_destroy_is_idempotent() {
        let (counters, cache) = cache_for(CountingBroker::healthy());
        cache.get_publisher("error", None).await.unwrap();

        assert_eq!(cache.destroy().await.released, 1);
        assert_eq!(cache.destroy().await.attempted(), 0);
        assert!(cache.is_closed().await);
        assert!(matches!(
            cache.get_publisher("error", None).await,
            Err(MiddlewareError::ResourceCacheClosed)
        ));
        assert!(matches!(
            cache.subscribe("error", Arc::new(NoopListener), None).await,
            Err(MiddlewareError::ResourceCacheClosed)
        ));
        assert_eq!(counters.release_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remove_publisher_is_noop_when_absent_and_propagates_release_failure() {
        let broker = CountingBroker {
            fail_releases_after: Some(0),
            ..CountingBroker::healthy()
        };
        let (_, cache) = cache_for(broker);

        assert!(cache.remove_publisher("missing").await.is_ok());

        cache.get_publisher("bridge_ipsmrm_p", None).await.unwrap();
        assert!(matches!(
            cache.remove_publisher("bridge_ipsmrm_p").await,
            Err(MiddlewareError::Release { topic, .. }) if topic == "bridge_ipsmrm_p"
        ));
        assert!(!cache.has_publisher("bridge_ipsmrm_p").await);
    }

    #[tokio::test]
    async fn failed_listener_registration_releases_the_subscriber() {
        let broker = CountingBroker {
            reject_listeners: true,
            ..CountingBroker::healthy()
        };
        let (counters, cache) = cache_for(broker);

        let result = cache.subscribe("rest_api", Arc::new(NoopListener), None).await;

        assert!(matches!(
            result,
            Err(MiddlewareError::ListenerRegistration { .. })
        ));
        assert_eq!(counters.release_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.subscriber_count("rest_api").await, 0);
    }

    #[tokio::test]
    async fn unreachable_broker_is_reported_per_topic() {
        let broker = CountingBroker {
            unavailable: true,
            ..CountingBroker::healthy()
        };
        let (_, cache) = cache_for(broker);

        assert!(matches!(
            cache.get_publisher("prm_arm", None).await,
            Err(MiddlewareError::BrokerUnavailable { topic, .. }) if topic == "prm_arm"
        ));
        assert!(matches!(
            cache.get_publisher("prm_arm", Some("mqtt")).await,
            Err(MiddlewareError::BrokerUnavailable {
                source: BrokerError::UnknownImplementation(_),
                ..
            })
        ));
    }
}
