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

use async_trait::async_trait;
use intermw_control::message::message_types;
use intermw_control::{
    Bridge, BridgeConfiguration, BridgeError, ErrorCode, ErrorReporter, Message, Platform,
    Publisher,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub(crate) const ECHO_PLATFORM_TYPE: &str = "echo";
const GREETING_PROPERTY: &str = "echo.greeting";
const DEFAULT_GREETING: &str = "echo";

/// Answers every request on the outbound topic with a `RESPONSE` carrying the
/// request id. Platform lifecycle messages are refused with an error response.
pub(crate) struct EchoBridge {
    platform_id: String,
    greeting: String,
    publisher: Option<Arc<dyn Publisher>>,
    error_reporter: Option<ErrorReporter>,
}

impl EchoBridge {
    pub(crate) fn new(platform: &Platform, configuration: &BridgeConfiguration) -> Self {
        Self {
            platform_id: platform.platform_id.clone(),
            greeting: configuration
                .property(GREETING_PROPERTY)
                .unwrap_or(DEFAULT_GREETING)
                .to_string(),
            publisher: None,
            error_reporter: None,
        }
    }

    fn publisher(&self) -> Result<&Arc<dyn Publisher>, BridgeError> {
        self.publisher
            .as_ref()
            .ok_or_else(|| BridgeError::new("outbound publisher was not injected"))
    }
}

#[async_trait]
impl Bridge for EchoBridge {
    fn set_publisher(&mut self, publisher: Arc<dyn Publisher>) {
        self.publisher = Some(publisher);
    }

    fn set_error_reporter(&mut self, error_reporter: ErrorReporter) {
        self.error_reporter = Some(error_reporter);
    }

    async fn process(&self, message: Message) -> Result<(), BridgeError> {
        let publisher = self.publisher()?;

        if message.has_type(message_types::PLATFORM_REGISTER)
            || message.has_type(message_types::PLATFORM_UNREGISTER)
        {
            let refusal = BridgeError::new("platform lifecycle is handled by the bridge manager");
            if let Some(error_reporter) = &self.error_reporter {
                error_reporter
                    .report_failure_to(
                        &**publisher,
                        &message,
                        &refusal,
                        None,
                        ErrorCode::UnsupportedActionException,
                    )
                    .await;
                return Ok(());
            }
            return Err(refusal);
        }

        let payload = json!({
            "platform_id": self.platform_id,
            "greeting": self.greeting,
            "in_reply_to": message.message_id,
        });
        let response = Message::response_to(&message).with_payload(payload.to_string());

        debug!(
            platform_id = self.platform_id.as_str(),
            conversation_id = message.conversation_id.as_deref().unwrap_or("none"),
            "echoing message"
        );
        publisher
            .publish(response)
            .await
            .map_err(|err| BridgeError::with_source("unable to publish echo response", err))
    }
}
