//! Shared link connection state
//!
//! Single authoritative value, mutated only by the connection manager.

use std::fmt;

/// Link connection state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Staying in the same state is always allowed. The only forbidden move
    /// is jumping straight from Disconnected to Connected.
    pub fn can_transition_to(self, next: LinkState) -> bool {
        match (self, next) {
            (a, b) if a == b => true,
            (LinkState::Disconnected, LinkState::Connecting)
            | (LinkState::Connecting, LinkState::Connected)
            | (LinkState::Connecting, LinkState::Disconnected)
            | (LinkState::Connected, LinkState::Disconnected) => true,
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LinkState::Disconnected => "Disconnected",
            LinkState::Connecting => "Connecting",
            LinkState::Connected => "Connected",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
