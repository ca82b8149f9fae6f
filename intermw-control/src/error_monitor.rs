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

//! Logs every record arriving on the error channel.

use crate::broker::Listener;
use crate::control_plane::resource_cache::ResourceCache;
use crate::error::MiddlewareError;
use crate::error_reporter::ErrorRecord;
use crate::message::Message;
use crate::observability::events;
use crate::observability::fields;
use crate::routing::topic_naming::{resolve, Channel};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "error_monitor";

#[derive(Default)]
struct MonitorCounters {
    received: AtomicUsize,
    malformed: AtomicUsize,
}

/// Subscribes to the `error` topic and logs each decoded [`ErrorRecord`].
pub struct ErrorChannelMonitor {
    counters: Arc<MonitorCounters>,
}

impl ErrorChannelMonitor {
    pub async fn install(
        cache: &ResourceCache,
        broker_impl: Option<&str>,
    ) -> Result<Self, MiddlewareError> {
        let counters = Arc::new(MonitorCounters::default());
        let topic = resolve(Channel::Error, None)?;
        cache
            .subscribe(
                &topic,
                Arc::new(ErrorRecordListener {
                    counters: counters.clone(),
                }),
                broker_impl,
            )
            .await?;

        Ok(Self { counters })
    }

    /// Records decoded and logged so far.
    pub fn received(&self) -> usize {
        self.counters.received.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> usize {
        self.counters.malformed.load(Ordering::Relaxed)
    }
}

struct ErrorRecordListener {
    counters: Arc<MonitorCounters>,
}

#[async_trait]
impl Listener for ErrorRecordListener {
    async fn on_receive(&self, message: Message) {
        match ErrorRecord::from_message(&message) {
            Ok(record) => {
                self.counters.received.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event = events::ERROR_RECORD_RECEIVED,
                    component = COMPONENT,
                    error_code = record.error_code.map(|code| code.code()),
                    platform_id = record.platform_id.as_deref().unwrap_or(fields::NONE),
                    conversation_id = record.conversation_id.as_deref().unwrap_or(fields::NONE),
                    msg_id = fields::format_message_id(&message).as_str(),
                    description = record.description.as_str(),
                    "error record received"
                );
            }
            Err(err) => {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event = events::ERROR_RECORD_MALFORMED,
                    component = COMPONENT,
                    msg_id = fields::format_message_id(&message).as_str(),
                    msg_types = fields::format_message_types(&message).as_str(),
                    err = %err,
                    "undecodable message on the error channel"
                );
            }
        }
    }
}
