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

//! Shared field values and message formatting helpers for log events.

use crate::message::Message;

pub const NONE: &str = "none";
pub const REASON_QUEUE_CLOSED: &str = "queue_closed";
pub const REASON_SHUTDOWN_REQUESTED: &str = "shutdown_requested";
pub const REASON_INVALID_THREAD_NAME: &str = "invalid_thread_name";
pub const DEFAULT_WORKER_THREAD: &str = "unknown-thread";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkerContext {
    pub worker_id: String,
    pub worker_thread: String,
}

impl WorkerContext {
    pub fn with_current_thread(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_thread: current_thread_name_or_default(),
        }
    }
}

pub fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_WORKER_THREAD).to_string()
}

pub fn current_thread_name_or_default() -> String {
    thread_name_or_default(std::thread::current().name())
}

pub fn format_message_id(message: &Message) -> String {
    message
        .message_id
        .clone()
        .unwrap_or_else(|| NONE.to_string())
}

pub fn format_conversation_id(message: &Message) -> String {
    message
        .conversation_id
        .clone()
        .unwrap_or_else(|| NONE.to_string())
}

/// Comma-joined type tags, in their sorted set order.
pub fn format_message_types(message: &Message) -> String {
    if message.message_types.is_empty() {
        return NONE.to_string();
    }

    message
        .message_types
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Message fields formatted once per log site.
pub(crate) struct FormattedMessageFields {
    pub(crate) msg_id: String,
    pub(crate) msg_types: String,
    pub(crate) conversation_id: String,
}

impl FormattedMessageFields {
    pub(crate) fn from_message(message: &Message) -> Self {
        Self {
            msg_id: format_message_id(message),
            msg_types: format_message_types(message),
            conversation_id: format_conversation_id(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        format_conversation_id, format_message_id, format_message_types, thread_name_or_default,
        DEFAULT_WORKER_THREAD, NONE,
    };
    use crate::message::Message;

    #[test]
    fn format_message_types_joins_sorted_tags() {
        let message = Message::new(["SUBSCRIBE", "RESPONSE"]);

        assert_eq!(format_message_types(&message), "RESPONSE,SUBSCRIBE");
        assert_eq!(format_message_types(&Message::default()), NONE);
    }

    #[test]
    fn identifiers_fall_back_to_none() {
        let message = Message::default();

        assert_eq!(format_message_id(&message), NONE);
        assert_eq!(format_conversation_id(&message), NONE);

        let message = Message::new(["QUERY"]).with_conversation_id("conv-9");
        assert_eq!(format_conversation_id(&message), "conv-9");
        assert_ne!(format_message_id(&message), NONE);
    }

    #[test]
    fn thread_name_or_default_falls_back_when_absent() {
        assert_eq!(thread_name_or_default(None), DEFAULT_WORKER_THREAD);
        assert_eq!(thread_name_or_default(Some("named-thread")), "named-thread");
    }
}
