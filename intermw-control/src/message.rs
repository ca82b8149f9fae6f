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

//! Opaque message unit moved between channels.
//!
//! The control plane only looks at the metadata (type tags and identifiers);
//! the payload belongs to the semantic layer and is carried untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Well-known message type tags used by the control plane itself.
pub mod message_types {
    pub const RESPONSE: &str = "RESPONSE";
    pub const ERROR: &str = "ERROR";
    pub const PLATFORM_REGISTER: &str = "PLATFORM_REGISTER";
    pub const PLATFORM_UNREGISTER: &str = "PLATFORM_UNREGISTER";
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_types: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_platform_id: Option<String>,
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl Message {
    /// Creates a message with a fresh id and the given type tags.
    pub fn new<I, S>(message_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message_types: message_types.into_iter().map(Into::into).collect(),
            message_id: Some(new_message_id()),
            ..Default::default()
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Builds a response: same conversation and type tags plus `RESPONSE`, new id.
    pub fn response_to(original: &Message) -> Self {
        let mut message_types = original.message_types.clone();
        message_types.insert(message_types::RESPONSE.to_string());

        Self {
            message_types,
            message_id: Some(new_message_id()),
            conversation_id: original.conversation_id.clone(),
            sender_platform_id: None,
            payload: Vec::new(),
        }
    }

    pub fn has_type(&self, message_type: &str) -> bool {
        self.message_types.contains(message_type)
    }
}

pub(crate) fn new_message_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}
