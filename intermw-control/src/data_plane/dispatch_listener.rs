//! Broker listener that queues inbound bridge messages for the dispatch worker.

use crate::broker::Listener;
use crate::message::Message;
use crate::observability::events;
use crate::observability::fields::FormattedMessageFields;
use async_trait::async_trait;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, Level};

const COMPONENT: &str = "dispatch_listener";

pub(crate) struct DispatchListener {
    platform_id: String,
    sender: Sender<Message>,
}

impl DispatchListener {
    pub(crate) fn new(platform_id: &str, sender: Sender<Message>) -> Self {
        Self {
            platform_id: platform_id.to_string(),
            sender,
        }
    }
}

#[async_trait]
impl Listener for DispatchListener {
    async fn on_receive(&self, message: Message) {
        let platform_id = self.platform_id.as_str();
        let formatted_fields = tracing::enabled!(Level::DEBUG)
            .then(|| FormattedMessageFields::from_message(&message));

        if let Some(fields) = formatted_fields.as_ref() {
            debug!(
                event = events::DISPATCH_ENQUEUE,
                component = COMPONENT,
                platform_id,
                msg_id = fields.msg_id.as_str(),
                msg_types = fields.msg_types.as_str(),
                "queueing inbound message for bridge"
            );
        }

        // Waits for queue capacity; fails only once the worker is gone.
        if let Err(e) = self.sender.send(message).await {
            let fields = FormattedMessageFields::from_message(&e.0);
            error!(
                event = events::DISPATCH_ENQUEUE_FAILED,
                component = COMPONENT,
                platform_id,
                msg_id = fields.msg_id.as_str(),
                msg_types = fields.msg_types.as_str(),
                "dispatch worker stopped; dropping message"
            );
        }
    }
}
