//! Inputs to the link actor
//!
//! Transport callbacks, reconnect ticks and requests from the control surface
//! all arrive as [`LinkEvent`]s on one channel, so the connection manager
//! sees them in a single total order.

use std::fmt;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Identifies one transport connection attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

/// Identifies one reconnect timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LinkEvent {
    // Transport callbacks
    Opened(ConnId),
    Message(ConnId, String),
    Failed(ConnId, TransportError),
    Closed {
        conn: ConnId,
        code: u16,
        reason: String,
    },

    // Reconnect timer
    ReconnectTick(TimerId),

    // Requests
    Command(String),
    Connect,
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<LinkEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<LinkEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
