#![allow(dead_code)]

use async_trait::async_trait;
use intermw_control::{
    resolve, Bridge, BridgeError, BridgeFactories, BridgeManager, Broker, BrokerError,
    BrokerRegistry, Channel, Configuration, ErrorCode, ErrorRecord, ErrorReporter, Listener,
    LoopbackBroker, Message, Platform, Publisher, Subscriber, LOOPBACK,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const PLATFORM_TYPE: &str = "scripted";
pub(crate) const FAIL: &str = "FAIL";
pub(crate) const PANIC: &str = "PANIC";
pub(crate) const STALL: &str = "STALL";
pub(crate) const REJECT: &str = "REJECT";

const WAIT_STEP: Duration = Duration::from_millis(10);
const WAIT_ATTEMPTS: usize = 500;

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Messages each platform's bridge has processed successfully, keyed by platform id.
#[derive(Default)]
pub(crate) struct BridgeRecorder {
    processed: Mutex<HashMap<String, Vec<Message>>>,
}

impl BridgeRecorder {
    pub(crate) fn processed(&self, platform_id: &str) -> usize {
        self.processed
            .lock()
            .unwrap()
            .get(platform_id)
            .map_or(0, Vec::len)
    }

    fn record(&self, platform_id: &str, message: Message) {
        self.processed
            .lock()
            .unwrap()
            .entry(platform_id.to_string())
            .or_default()
            .push(message);
    }
}

/// Bridge whose behavior is picked by the message type: `FAIL` returns an error,
/// `PANIC` panics, `STALL` sleeps well past any test budget and `REJECT` answers
/// with an error response through the bridge's own reporter. Anything else is
/// recorded and answered with a `RESPONSE` on the outbound topic.
pub(crate) struct ScriptedBridge {
    platform_id: String,
    recorder: Arc<BridgeRecorder>,
    publisher: Option<Arc<dyn Publisher>>,
    error_reporter: Option<ErrorReporter>,
}

#[async_trait]
impl Bridge for ScriptedBridge {
    fn set_publisher(&mut self, publisher: Arc<dyn Publisher>) {
        self.publisher = Some(publisher);
    }

    fn set_error_reporter(&mut self, error_reporter: ErrorReporter) {
        self.error_reporter = Some(error_reporter);
    }

    async fn process(&self, message: Message) -> Result<(), BridgeError> {
        if message.has_type(FAIL) {
            return Err(BridgeError::new("scripted failure"));
        }
        if message.has_type(REJECT) {
            if let (Some(reporter), Some(publisher)) = (&self.error_reporter, &self.publisher) {
                let refusal = BridgeError::new("scripted rejection");
                reporter
                    .report_failure_to(
                        &**publisher,
                        &message,
                        &refusal,
                        None,
                        ErrorCode::UnsupportedActionException,
                    )
                    .await;
            }
            return Ok(());
        }
        if message.has_type(PANIC) {
            panic!("scripted panic");
        }
        if message.has_type(STALL) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }

        let response = Message::response_to(&message);
        self.recorder.record(&self.platform_id, message);
        if let Some(publisher) = &self.publisher {
            publisher
                .publish(response)
                .await
                .map_err(|err| BridgeError::with_source("unable to respond", err))?;
        }
        Ok(())
    }
}

/// Listener that keeps every message it receives.
#[derive(Default)]
pub(crate) struct CollectingListener {
    messages: Mutex<Vec<Message>>,
}

impl CollectingListener {
    pub(crate) fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub(crate) fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub(crate) fn error_records(&self) -> Vec<ErrorRecord> {
        self.messages()
            .iter()
            .map(|message| ErrorRecord::from_message(message).expect("valid error record"))
            .collect()
    }
}

#[async_trait]
impl Listener for CollectingListener {
    async fn on_receive(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }
}

pub(crate) struct Harness {
    pub(crate) broker: Arc<LoopbackBroker>,
    pub(crate) manager: BridgeManager,
    pub(crate) recorder: Arc<BridgeRecorder>,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        Self::with_configuration(Configuration::with_broker_type(LOOPBACK)).await
    }

    pub(crate) async fn with_configuration(configuration: Configuration) -> Self {
        Self::build(configuration, Duration::ZERO).await
    }

    /// Harness whose broker takes `delay` to create each subscriber.
    pub(crate) async fn with_subscribe_delay(delay: Duration) -> Self {
        Self::build(Configuration::with_broker_type(LOOPBACK), delay).await
    }

    async fn build(configuration: Configuration, subscribe_delay: Duration) -> Self {
        init_logging();

        let broker = Arc::new(LoopbackBroker::new());
        let mut brokers = BrokerRegistry::new(configuration.broker.clone());
        brokers.register_instance(
            LOOPBACK,
            Arc::new(DelayedBroker {
                inner: broker.clone(),
                subscribe_delay,
            }),
        );

        let recorder = Arc::new(BridgeRecorder::default());
        let mut factories = BridgeFactories::new();
        let factory_recorder = recorder.clone();
        factories.register(PLATFORM_TYPE, move |platform, _| {
            Ok(Box::new(ScriptedBridge {
                platform_id: platform.platform_id.clone(),
                recorder: factory_recorder.clone(),
                publisher: None,
                error_reporter: None,
            }) as Box<dyn Bridge>)
        });

        let manager = BridgeManager::new(configuration, Arc::new(brokers), factories)
            .await
            .expect("manager creation should succeed");

        Self {
            broker,
            manager,
            recorder,
        }
    }

    pub(crate) async fn register(&self, platform_id: &str) {
        self.manager
            .register_platform(Platform::new(platform_id, PLATFORM_TYPE))
            .await
            .expect("platform registration should succeed");
    }

    /// Publisher on the platform's inbound topic, as the router would hold it.
    pub(crate) async fn inbound_publisher(&self, platform_id: &str) -> Arc<dyn Publisher> {
        let topic = resolve(Channel::IpsmrmBridge, Some(platform_id)).unwrap();
        self.manager
            .resource_cache()
            .get_publisher(&topic, None)
            .await
            .expect("inbound publisher")
    }

    pub(crate) async fn listen(&self, topic: &str) -> Arc<CollectingListener> {
        let listener = Arc::new(CollectingListener::default());
        self.manager
            .resource_cache()
            .subscribe(topic, listener.clone(), None)
            .await
            .expect("subscription should succeed");
        listener
    }

    pub(crate) async fn listen_errors(&self) -> Arc<CollectingListener> {
        self.listen(&resolve(Channel::Error, None).unwrap()).await
    }
}

/// Loopback broker that sleeps before handing out each subscriber.
struct DelayedBroker {
    inner: Arc<LoopbackBroker>,
    subscribe_delay: Duration,
}

#[async_trait]
impl Broker for DelayedBroker {
    fn implementation(&self) -> &str {
        self.inner.implementation()
    }

    async fn create_publisher(&self, topic: &str) -> Result<Arc<dyn Publisher>, BrokerError> {
        self.inner.create_publisher(topic).await
    }

    async fn create_subscriber(&self, topic: &str) -> Result<Arc<dyn Subscriber>, BrokerError> {
        if !self.subscribe_delay.is_zero() {
            tokio::time::sleep(self.subscribe_delay).await;
        }
        self.inner.create_subscriber(topic).await
    }
}

/// Polls `condition` until it holds or the wait budget runs out.
pub(crate) async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..WAIT_ATTEMPTS {
        if condition() {
            return true;
        }
        tokio::time::sleep(WAIT_STEP).await;
    }
    condition()
}
