//! Data-plane layer.
//!
//! Owns the path of an inbound message from the broker subscription to the
//! bridge: a [`dispatch_listener::DispatchListener`] queues each message on a
//! bounded channel and a [`dispatch_worker::DispatchWorker`] hands it to the
//! bridge under fault isolation. A failing, panicking or stalled bridge is
//! logged and reported on the error channel; the worker then moves on.

pub(crate) mod dispatch_listener;
pub(crate) mod dispatch_worker;
