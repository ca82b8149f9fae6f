//! Structured logging vocabulary: event names and field formatting helpers.

pub mod events;
pub mod fields;
