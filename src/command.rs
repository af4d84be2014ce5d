//! Command channel - motion directives for the controller
//!
//! Commands are fire-and-forget: sent as one text frame when the link is
//! Connected, otherwise dropped with a diagnostic log entry. Nothing is
//! queued for later and nothing is retried.

use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace, warn};

use crate::error::UnknownDirection;
use crate::event::{EventSender, LinkEvent};
use crate::link::ConnectionManager;
use crate::transport::{Connection, Connector};

/// The five directives the controller understands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl Direction {
    pub const ALL: &'static [Direction] = &[
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
        Direction::Stop,
    ];

    /// Wire form, sent verbatim as the whole frame
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Stop => "stop",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = UnknownDirection;

    /// Accepts the wire names and the w/s/a/d/x keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "w" => Ok(Direction::Forward),
            "backward" | "s" => Ok(Direction::Backward),
            "left" | "a" => Ok(Direction::Left),
            "right" | "d" => Ok(Direction::Right),
            "stop" | "x" => Ok(Direction::Stop),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

/// Send side handed to the control surface
///
/// Cloneable; every clone feeds the same link actor.
#[derive(Clone)]
pub struct CommandChannel {
    events: EventSender,
}

impl CommandChannel {
    pub(crate) fn new(events: EventSender) -> Self {
        Self { events }
    }

    /// Send any text as one frame. The core does not validate the vocabulary.
    pub fn send(&self, command: impl Into<String>) {
        let command = command.into();
        if self.events.send(LinkEvent::Command(command)).is_err() {
            trace!("Link actor stopped, command discarded");
        }
    }

    /// Control pressed
    pub fn press(&self, direction: Direction) {
        self.send(direction.as_str());
    }

    /// Control released
    pub fn release(&self) {
        self.send(Direction::Stop.as_str());
    }
}

/// Connected-or-drop policy, run on the link actor.
pub(crate) fn dispatch<C: Connector>(link: &ConnectionManager<C>, command: &str) {
    let Some(conn) = link.ready_connection() else {
        warn!(command, state = %link.state(), "Link not open, command dropped");
        link.log(format!("Link is not open. State: {}", link.state()));
        return;
    };

    match conn.send_text(command) {
        Ok(()) => debug!(command, "Command sent"),
        // The close event that follows drives recovery
        Err(e) => {
            warn!(command, error = %e, "Command lost");
            link.log(format!("Link error: {e}"));
        }
    }
}
