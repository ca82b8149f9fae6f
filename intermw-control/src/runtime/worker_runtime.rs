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

//! Runtime helper for spawning bridge dispatch loops on dedicated threads.

use crate::observability::events;
use crate::observability::fields;
use std::future::Future;
use std::io;
use std::thread;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub(crate) const DEFAULT_DISPATCH_RUNTIME_THREAD_NAME: &str = "mw-dispatch";
const COMPONENT: &str = "worker_runtime";

/// Handle of a spawned dispatch loop thread.
pub(crate) struct DispatchLoopHandle {
    worker_thread: String,
    stopped: oneshot::Receiver<()>,
}

impl DispatchLoopHandle {
    pub(crate) fn worker_thread(&self) -> &str {
        &self.worker_thread
    }

    /// Resolves once the dispatch loop future has completed (or its thread is gone).
    pub(crate) async fn stopped(self) {
        let _ = self.stopped.await;
    }
}

fn sanitize_thread_name(thread_name: String) -> String {
    if thread_name.is_empty() || thread_name.contains('\0') {
        warn!(
            event = events::RUNTIME_THREAD_NAME_FALLBACK,
            component = COMPONENT,
            reason = fields::REASON_INVALID_THREAD_NAME,
            fallback = DEFAULT_DISPATCH_RUNTIME_THREAD_NAME,
            "invalid dispatch thread name; using fallback"
        );
        return DEFAULT_DISPATCH_RUNTIME_THREAD_NAME.to_string();
    }
    thread_name
}

/// Runs `run_loop` to completion on a new thread driving its own current-thread runtime.
pub(crate) fn spawn_dispatch_loop<F, Fut>(
    thread_name: String,
    run_loop: F,
) -> io::Result<DispatchLoopHandle>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    let worker_thread = sanitize_thread_name(thread_name);
    debug!(
        event = events::RUNTIME_SPAWN_START,
        component = COMPONENT,
        worker_thread = worker_thread.as_str(),
        "spawning dispatch runtime thread"
    );

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .inspect_err(|err| log_spawn_failure(&worker_thread, err))?;
    let (stopped_tx, stopped_rx) = oneshot::channel();

    thread::Builder::new()
        .name(worker_thread.clone())
        .spawn(move || {
            runtime.block_on(run_loop());
            let _ = stopped_tx.send(());
        })
        .inspect_err(|err| log_spawn_failure(&worker_thread, err))?;

    debug!(
        event = events::RUNTIME_SPAWN_OK,
        component = COMPONENT,
        worker_thread = worker_thread.as_str(),
        "dispatch runtime thread spawned"
    );

    Ok(DispatchLoopHandle {
        worker_thread,
        stopped: stopped_rx,
    })
}

fn log_spawn_failure(worker_thread: &str, err: &io::Error) {
    warn!(
        event = events::RUNTIME_SPAWN_FAILED,
        component = COMPONENT,
        worker_thread,
        err = %err,
        "unable to spawn dispatch runtime thread"
    );
}
