//! # Update sources
//!
//! Where updates come from: the [`Polling`] long-poll loop and the
//! transport-agnostic [`WebhookSink`]. Both deliver [`Update`]s over a
//! bounded channel the runner drains into the dispatcher.
//!
//! [`Update`]: crate::types::Update

mod polling;
mod webhook;

pub use polling::{Polling, PollingConfig, PollingError, PollingHandle};
pub use webhook::{SECRET_TOKEN_HEADER, WebhookResponse, WebhookSink};
