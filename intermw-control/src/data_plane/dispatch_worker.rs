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

//! Dispatch worker that hands queued messages to a bridge under fault isolation.

use crate::bridge::Bridge;
use crate::error::BridgeError;
use crate::error_reporter::{ErrorCode, ErrorReporter};
use crate::message::{new_message_id, Message};
use crate::observability::events;
use crate::observability::fields::{self, FormattedMessageFields, WorkerContext};
use crate::runtime::worker_runtime::{
    spawn_dispatch_loop, DispatchLoopHandle, DEFAULT_DISPATCH_RUNTIME_THREAD_NAME,
};
use futures::FutureExt;
use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn, Level};

const DISPATCH_RUNTIME_THREAD_NAME_PREFIX: &str = "mw-bridge-";
const DISPATCH_RUNTIME_THREAD_NAME_MAX_LEN: usize = 15;
const COMPONENT: &str = "dispatch_worker";

#[derive(Debug, Error)]
pub(crate) enum DispatchFailure {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("bridge panicked while processing message: {0}")]
    Panicked(String),
    #[error("bridge did not finish processing within {0:?}")]
    TimedOut(Duration),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DispatchOutcome {
    Delivered,
    Failed,
    Panicked,
    TimedOut,
}

/// Everything one dispatch loop needs besides its queue.
#[derive(Clone)]
pub(crate) struct DispatchTarget {
    pub(crate) platform_id: String,
    pub(crate) bridge: Arc<dyn Bridge>,
    pub(crate) error_reporter: ErrorReporter,
    pub(crate) time_budget: Option<Duration>,
}

/// Owns the dedicated thread running one bridge's dispatch loop.
pub(crate) struct DispatchWorker {
    worker_id: String,
    shutdown: oneshot::Sender<()>,
    dispatch_handle: DispatchLoopHandle,
}

impl DispatchWorker {
    pub(crate) fn spawn(
        target: DispatchTarget,
        message_receiver: mpsc::Receiver<Message>,
    ) -> io::Result<Self> {
        let worker_id = new_message_id();
        let runtime_thread_name = Self::build_runtime_thread_name(&worker_id);
        let worker_id_for_loop = worker_id.clone();
        let (shutdown, shutdown_receiver) = oneshot::channel();

        let dispatch_handle = spawn_dispatch_loop(runtime_thread_name, move || async move {
            Self::dispatch_loop(worker_id_for_loop, target, message_receiver, shutdown_receiver)
                .await;
        })?;

        Ok(Self {
            worker_id,
            shutdown,
            dispatch_handle,
        })
    }

    pub(crate) fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub(crate) fn runtime_thread(&self) -> &str {
        self.dispatch_handle.worker_thread()
    }

    /// Signals shutdown and waits up to `grace` for the in-flight dispatch to finish.
    ///
    /// Returns `false` if the loop was still running when `grace` elapsed; the
    /// thread is then left to finish on its own.
    pub(crate) async fn stop(self, grace: Duration) -> bool {
        let _ = self.shutdown.send(());
        tokio::time::timeout(grace, self.dispatch_handle.stopped())
            .await
            .is_ok()
    }

    fn build_runtime_thread_name(worker_id: &str) -> String {
        let suffix_len =
            DISPATCH_RUNTIME_THREAD_NAME_MAX_LEN - DISPATCH_RUNTIME_THREAD_NAME_PREFIX.len();
        let suffix: String = worker_id
            .chars()
            .filter(|ch| ch.is_ascii_hexdigit())
            .take(suffix_len)
            .collect();

        if suffix.len() == suffix_len {
            format!("{DISPATCH_RUNTIME_THREAD_NAME_PREFIX}{suffix}")
        } else {
            DEFAULT_DISPATCH_RUNTIME_THREAD_NAME.to_string()
        }
    }

    pub(crate) async fn dispatch_loop(
        worker_id: String,
        target: DispatchTarget,
        mut message_receiver: mpsc::Receiver<Message>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let worker_context = WorkerContext::with_current_thread(worker_id);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(
                        event = events::DISPATCH_SHUTDOWN,
                        component = COMPONENT,
                        worker_id = worker_context.worker_id.as_str(),
                        worker_thread = worker_context.worker_thread.as_str(),
                        platform_id = target.platform_id.as_str(),
                        reason = fields::REASON_SHUTDOWN_REQUESTED,
                        "stopping dispatch loop"
                    );
                    break;
                }
                received = message_receiver.recv() => match received {
                    Some(message) => {
                        dispatch_isolated(&target, &worker_context, message).await;
                    }
                    None => {
                        info!(
                            event = events::DISPATCH_QUEUE_CLOSED,
                            component = COMPONENT,
                            worker_id = worker_context.worker_id.as_str(),
                            worker_thread = worker_context.worker_thread.as_str(),
                            platform_id = target.platform_id.as_str(),
                            reason = fields::REASON_QUEUE_CLOSED,
                            "dispatch queue closed; stopping dispatch loop"
                        );
                        break;
                    }
                }
            }
        }
    }
}

/// Runs `Bridge::process` for one message; every failure class is contained here.
pub(crate) async fn dispatch_isolated(
    target: &DispatchTarget,
    worker_context: &WorkerContext,
    message: Message,
) -> DispatchOutcome {
    let mut message_fields =
        tracing::enabled!(Level::DEBUG).then(|| FormattedMessageFields::from_message(&message));

    if let Some(fields) = message_fields.as_ref() {
        debug!(
            event = events::DISPATCH_ATTEMPT,
            component = COMPONENT,
            worker_id = worker_context.worker_id.as_str(),
            worker_thread = worker_context.worker_thread.as_str(),
            platform_id = target.platform_id.as_str(),
            msg_id = fields.msg_id.as_str(),
            msg_types = fields.msg_types.as_str(),
            "dispatching message to bridge"
        );
    }

    let processing = AssertUnwindSafe(target.bridge.process(message.clone())).catch_unwind();
    let completed = match target.time_budget {
        Some(budget) => tokio::time::timeout(budget, processing).await.ok(),
        None => Some(processing.await),
    };

    let (outcome, event, failure) = match completed {
        Some(Ok(Ok(()))) => (DispatchOutcome::Delivered, events::DISPATCH_OK, None),
        Some(Ok(Err(err))) => (
            DispatchOutcome::Failed,
            events::DISPATCH_FAILED,
            Some(DispatchFailure::from(err)),
        ),
        Some(Err(payload)) => (
            DispatchOutcome::Panicked,
            events::DISPATCH_PANICKED,
            Some(DispatchFailure::Panicked(panic_message(payload.as_ref()))),
        ),
        None => (
            DispatchOutcome::TimedOut,
            events::DISPATCH_TIMED_OUT,
            Some(DispatchFailure::TimedOut(
                target.time_budget.unwrap_or_default(),
            )),
        ),
    };

    let Some(failure) = failure else {
        if let Some(fields) = message_fields.as_ref() {
            debug!(
                event,
                component = COMPONENT,
                worker_id = worker_context.worker_id.as_str(),
                worker_thread = worker_context.worker_thread.as_str(),
                platform_id = target.platform_id.as_str(),
                msg_id = fields.msg_id.as_str(),
                msg_types = fields.msg_types.as_str(),
                "bridge processed message"
            );
        }
        return outcome;
    };

    let fields =
        message_fields.get_or_insert_with(|| FormattedMessageFields::from_message(&message));
    warn!(
        event,
        component = COMPONENT,
        worker_id = worker_context.worker_id.as_str(),
        worker_thread = worker_context.worker_thread.as_str(),
        platform_id = target.platform_id.as_str(),
        msg_id = fields.msg_id.as_str(),
        msg_types = fields.msg_types.as_str(),
        conversation_id = fields.conversation_id.as_str(),
        err = %failure,
        "bridge failed to process message"
    );

    let description = format!("Failed to process message for platform {}", target.platform_id);
    target
        .error_reporter
        .report_failure(
            &message,
            &failure,
            Some(description.as_str()),
            ErrorCode::ErrorHandlingReceivedMessage,
        )
        .await;

    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
