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

//! Publishes structured failure records on the process-wide error channel.

use crate::broker::Publisher;
use crate::error::MiddlewareError;
use crate::message::{message_types, Message};
use crate::observability::events;
use crate::observability::fields::{self, FormattedMessageFields};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{debug, error, warn};

const COMPONENT: &str = "error_reporter";
const MAX_CAUSE_DEPTH: usize = 3;
pub const NO_ERROR_DESCRIPTION: &str = "No error description available.";

/// Error categories shared with every component publishing on the error channel.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoConfig,
    NoConfigProperty,
    ContextException,
    UnsupportedActionException,
    IllegalActionException,
    UnknownActionException,
    CannotCreateComponent,
    CannotDestroyComponent,
    CannotPublishMessageUpstream,
    CannotPublishMessageDownstream,
    CannotPublishMessageToServices,
    PlatformidUriNotValid,
    ErrorHandlingReceivedMessage,
}

impl ErrorCode {
    pub const fn code(self) -> u16 {
        match self {
            ErrorCode::NoConfig => 1,
            ErrorCode::NoConfigProperty => 2,
            ErrorCode::ContextException => 4,
            ErrorCode::UnsupportedActionException => 5,
            ErrorCode::IllegalActionException => 6,
            ErrorCode::UnknownActionException => 7,
            ErrorCode::CannotCreateComponent => 8,
            ErrorCode::CannotDestroyComponent => 9,
            ErrorCode::CannotPublishMessageUpstream => 10,
            ErrorCode::CannotPublishMessageDownstream => 11,
            ErrorCode::CannotPublishMessageToServices => 12,
            ErrorCode::PlatformidUriNotValid => 13,
            ErrorCode::ErrorHandlingReceivedMessage => 14,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            ErrorCode::NoConfig => "No configuration registered",
            ErrorCode::NoConfigProperty => "A mandatory configuration property is missing: ",
            ErrorCode::ContextException => "There is an error while creating the context. Please review your client configuration. Error description: ",
            ErrorCode::UnsupportedActionException => {
                "The requested action is legal but currently not supported"
            }
            ErrorCode::IllegalActionException => {
                "The requested action is not legal for the component adressed"
            }
            ErrorCode::UnknownActionException => "The action requested is labelled as unknown and thus is not processable by the component",
            ErrorCode::CannotCreateComponent => "Cannot create the desired component",
            ErrorCode::CannotDestroyComponent => "Cannot destroy the desired component",
            ErrorCode::CannotPublishMessageUpstream => {
                "Cannot publish the message to the desired component going upstream"
            }
            ErrorCode::CannotPublishMessageDownstream => {
                "Cannot publish the message to the desired component going downstream"
            }
            ErrorCode::CannotPublishMessageToServices => {
                "Cannot publish the message to MW2MWM services"
            }
            ErrorCode::PlatformidUriNotValid => {
                "Cannot publish the message to the desired component going right"
            }
            ErrorCode::ErrorHandlingReceivedMessage => "Error while handling received message",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.description().trim_end_matches(&[' ', ':'][..]))
    }
}

/// Payload of a message on the error channel.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub message_types: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_message: Option<Message>,
}

impl ErrorRecord {
    pub fn new(error_code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            error_code: Some(error_code),
            description: description.into(),
            platform_id: None,
            message_types: BTreeSet::new(),
            conversation_id: None,
            original_message: None,
        }
    }

    /// Record answering `original`: same conversation, its types plus `RESPONSE`.
    pub fn responding_to(original: &Message, error_code: ErrorCode, description: String) -> Self {
        let mut message_types = original.message_types.clone();
        message_types.insert(message_types::RESPONSE.to_string());

        Self {
            error_code: Some(error_code),
            description,
            platform_id: None,
            message_types,
            conversation_id: original.conversation_id.clone(),
            original_message: Some(original.clone()),
        }
    }

    pub fn with_platform_id(mut self, platform_id: impl Into<String>) -> Self {
        self.platform_id = Some(platform_id.into());
        self
    }

    /// Wraps the record into a message tagged `ERROR`.
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        let payload = serde_json::to_vec(self)?;
        let mut message = Message::new(self.message_types.iter().cloned())
            .with_payload(payload);
        message
            .message_types
            .insert(message_types::ERROR.to_string());
        message.conversation_id = self.conversation_id.clone();
        message.sender_platform_id = self.platform_id.clone();
        Ok(message)
    }

    pub fn from_message(message: &Message) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(&message.payload)
    }
}

/// Joins the code description, the caller description, the error and up to
/// three levels of its source chain, one per line.
pub fn describe_failure(
    error_code: Option<ErrorCode>,
    description: Option<&str>,
    error: Option<&(dyn StdError + 'static)>,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(error_code) = error_code {
        lines.push(error_code.description().to_string());
    }
    if let Some(description) = description {
        lines.push(description.to_string());
    }
    if let Some(error) = error {
        lines.push(error.to_string());
        let mut cause = error.source();
        let mut depth = 0;
        while let Some(current) = cause {
            if depth == MAX_CAUSE_DEPTH {
                break;
            }
            lines.push(current.to_string());
            cause = current.source();
            depth += 1;
        }
    }

    if lines.is_empty() {
        return NO_ERROR_DESCRIPTION.to_string();
    }
    lines.join("\n")
}

/// Thin adapter over the error channel publisher. Cheap to clone.
#[derive(Clone)]
pub struct ErrorReporter {
    error_publisher: Arc<dyn Publisher>,
    platform_id: Option<String>,
}

impl ErrorReporter {
    pub fn new(error_publisher: Arc<dyn Publisher>) -> Self {
        Self {
            error_publisher,
            platform_id: None,
        }
    }

    /// Same channel, records stamped with `platform_id`.
    pub fn for_platform(&self, platform_id: &str) -> Self {
        Self {
            error_publisher: self.error_publisher.clone(),
            platform_id: Some(platform_id.to_string()),
        }
    }

    pub fn topic(&self) -> &str {
        self.error_publisher.topic()
    }

    pub fn platform_id(&self) -> Option<&str> {
        self.platform_id.as_deref()
    }

    /// Publishes `record`. A publish failure is logged locally and returned.
    pub async fn report(&self, mut record: ErrorRecord) -> Result<(), MiddlewareError> {
        if record.platform_id.is_none() {
            record.platform_id = self.platform_id.clone();
        }

        let message = record.to_message().map_err(|err| {
            MiddlewareError::Configuration(format!("unable to encode error record: {err}"))
        })?;
        self.publish_to_error_channel(message).await
    }

    /// Reports a failure while handling `original` on the error channel.
    pub async fn report_failure(
        &self,
        original: &Message,
        error: &(dyn StdError + Send + Sync + 'static),
        description: Option<&str>,
        error_code: ErrorCode,
    ) {
        let record = self.failure_record(original, error, description, error_code);
        let _ = self.report(record).await;
    }

    /// Sends the error response to `publisher` and a copy to the error channel.
    ///
    /// If `publisher` rejects it, a `CannotPublishMessageUpstream` record is
    /// published on the error channel as well.
    pub async fn report_failure_to(
        &self,
        publisher: &dyn Publisher,
        original: &Message,
        error: &(dyn StdError + Send + Sync + 'static),
        description: Option<&str>,
        error_code: ErrorCode,
    ) {
        let record = self.failure_record(original, error, description, error_code);
        let response = match record.to_message() {
            Ok(response) => response,
            Err(err) => {
                error!(
                    event = events::ERROR_REPORT_FAILED,
                    component = COMPONENT,
                    topic = publisher.topic(),
                    err = %err,
                    "unable to encode error response"
                );
                return;
            }
        };

        if let Err(err) = publisher.publish(response.clone()).await {
            warn!(
                event = events::ERROR_REPORT_UPSTREAM_FAILED,
                component = COMPONENT,
                topic = publisher.topic(),
                msg_id = fields::format_message_id(&response).as_str(),
                err = %err,
                "failed to publish error response upstream"
            );

            let mut upstream_failure = record.clone();
            upstream_failure.error_code = Some(ErrorCode::CannotPublishMessageUpstream);
            upstream_failure.description =
                ErrorCode::CannotPublishMessageUpstream.description().to_string();
            let _ = self.report(upstream_failure).await;
        }

        let _ = self.publish_to_error_channel(response).await;
    }

    fn failure_record(
        &self,
        original: &Message,
        error: &(dyn StdError + Send + Sync + 'static),
        description: Option<&str>,
        error_code: ErrorCode,
    ) -> ErrorRecord {
        let mut record = ErrorRecord::responding_to(
            original,
            error_code,
            describe_failure(
                Some(error_code),
                description,
                Some(error as &(dyn StdError + 'static)),
            ),
        );
        record.platform_id = self.platform_id.clone();
        record
    }

    async fn publish_to_error_channel(&self, message: Message) -> Result<(), MiddlewareError> {
        let message_fields = FormattedMessageFields::from_message(&message);

        match self.error_publisher.publish(message).await {
            Ok(()) => {
                debug!(
                    event = events::ERROR_REPORT_SENT,
                    component = COMPONENT,
                    topic = self.error_publisher.topic(),
                    msg_id = message_fields.msg_id.as_str(),
                    msg_types = message_fields.msg_types.as_str(),
                    conversation_id = message_fields.conversation_id.as_str(),
                    "error record published"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    event = events::ERROR_REPORT_FAILED,
                    component = COMPONENT,
                    topic = self.error_publisher.topic(),
                    msg_id = message_fields.msg_id.as_str(),
                    msg_types = message_fields.msg_types.as_str(),
                    conversation_id = message_fields.conversation_id.as_str(),
                    err = %err,
                    "failed to publish error record to the error channel"
                );
                Err(MiddlewareError::broker_unavailable(
                    self.error_publisher.topic(),
                    err,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{describe_failure, ErrorCode, ErrorRecord, ErrorReporter, NO_ERROR_DESCRIPTION};
    use crate::broker::Publisher;
    use crate::error::{BridgeError, BrokerError, MiddlewareError};
    use crate::message::{message_types, Message};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct RecordingPublisher {
        topic: String,
        fail: bool,
        published: Mutex<Vec<Message>>,
    }

    impl RecordingPublisher {
        fn new(topic: &str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                topic: topic.to_string(),
                fail,
                published: Mutex::new(Vec::new()),
            })
        }

        async fn records(&self) -> Vec<ErrorRecord> {
            self.published
                .lock()
                .await
                .iter()
                .map(|message| ErrorRecord::from_message(message).expect("record decodes"))
                .collect()
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        fn topic(&self) -> &str {
            &self.topic
        }

        async fn publish(&self, message: Message) -> Result<(), BrokerError> {
            if self.fail {
                return Err(BrokerError::Unavailable("connection reset".to_string()));
            }
            self.published.lock().await.push(message);
            Ok(())
        }

        async fn delete_topic(&self, _topic: &str) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn clean_up(&self) -> Result<(), BrokerError> {
            Ok(())
        }
    }

    #[test]
    fn error_codes_keep_their_wire_numbers() {
        assert_eq!(ErrorCode::NoConfig.code(), 1);
        assert_eq!(ErrorCode::ContextException.code(), 4);
        assert_eq!(ErrorCode::ErrorHandlingReceivedMessage.code(), 14);
        assert_eq!(
            serde_json::to_string(&ErrorCode::CannotPublishMessageUpstream).unwrap(),
            "\"CANNOT_PUBLISH_MESSAGE_UPSTREAM\""
        );
    }

    #[test]
    fn describe_failure_limits_cause_chain() {
        let root = std::io::Error::new(std::io::ErrorKind::Other, "level-4");
        let level3 = BridgeError::with_source("level-3", root);
        let level2 = BridgeError::with_source("level-2", level3);
        let level1 = BridgeError::with_source("level-1", level2);
        let top = BridgeError::with_source("top", level1);

        let description = describe_failure(
            Some(ErrorCode::ErrorHandlingReceivedMessage),
            Some("while processing"),
            Some(&top as &(dyn std::error::Error + 'static)),
        );

        assert_eq!(
            description,
            "Error while handling received message\nwhile processing\ntop\nlevel-1\nlevel-2\nlevel-3"
        );
        assert_eq!(describe_failure(None, None, None), NO_ERROR_DESCRIPTION);
    }

    #[tokio::test]
    async fn report_failure_publishes_error_response_record() {
        let publisher = RecordingPublisher::new("error", false);
        let reporter = ErrorReporter::new(publisher.clone()).for_platform("urn:p1");
        let original = Message::new(["QUERY"]).with_conversation_id("conv-1");

        reporter
            .report_failure(
                &original,
                &BridgeError::new("platform rejected query"),
                None,
                ErrorCode::ErrorHandlingReceivedMessage,
            )
            .await;

        let published = publisher.published.lock().await;
        assert_eq!(published.len(), 1);
        assert!(published[0].has_type(message_types::ERROR));
        assert!(published[0].has_type(message_types::RESPONSE));
        assert!(published[0].has_type("QUERY"));
        assert_eq!(published[0].conversation_id.as_deref(), Some("conv-1"));
        drop(published);

        let records = publisher.records().await;
        assert_eq!(records[0].platform_id.as_deref(), Some("urn:p1"));
        assert_eq!(records[0].original_message.as_ref(), Some(&original));
        assert!(records[0].description.ends_with("platform rejected query"));
    }

    #[tokio::test]
    async fn report_failure_to_falls_back_when_upstream_rejects() {
        let error_channel = RecordingPublisher::new("error", false);
        let upstream = RecordingPublisher::new("bridge_ipsmrm_p1", true);
        let reporter = ErrorReporter::new(error_channel.clone());

        reporter
            .report_failure_to(
                upstream.as_ref(),
                &Message::new(["SUBSCRIBE"]),
                &BridgeError::new("subscription failed"),
                Some("subscribe"),
                ErrorCode::ErrorHandlingReceivedMessage,
            )
            .await;

        let codes: Vec<_> = error_channel
            .records()
            .await
            .into_iter()
            .map(|record| record.error_code)
            .collect();
        assert_eq!(
            codes,
            vec![
                Some(ErrorCode::CannotPublishMessageUpstream),
                Some(ErrorCode::ErrorHandlingReceivedMessage)
            ]
        );
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn failure_reports_can_run_inside_spawned_tasks() {
        let publisher = RecordingPublisher::new("error", false);
        let reporter = ErrorReporter::new(publisher.clone());
        let original = Message::new(["QUERY"]);
        let error = BridgeError::new("rejected");

        let failure = reporter.report_failure(
            &original,
            &error,
            None,
            ErrorCode::ErrorHandlingReceivedMessage,
        );
        assert_send(&failure);

        let upstream = publisher.as_ref();
        let failure_to = reporter.report_failure_to(
            upstream,
            &original,
            &error,
            None,
            ErrorCode::UnsupportedActionException,
        );
        assert_send(&failure_to);
    }

    #[tokio::test]
    async fn report_surfaces_unreachable_error_channel() {
        let reporter = ErrorReporter::new(RecordingPublisher::new("error", true));

        let result = reporter
            .report(ErrorRecord::new(ErrorCode::CannotCreateComponent, "bridge"))
            .await;

        assert!(matches!(
            result,
            Err(MiddlewareError::BrokerUnavailable { topic, .. }) if topic == "error"
        ));
    }
}
