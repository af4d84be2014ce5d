//! Remote-control link for a fixed-address motion controller
//!
//! Keeps one WebSocket connection to the controller alive and relays
//! directional commands over it:
//! - [`RemoteLink`] spawns the link actor and hands out status, logs and commands
//! - [`ConnectionManager`] is the lifecycle state machine with its reconnect loop
//! - [`CommandChannel`] sends while Connected and drops otherwise

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod link;
pub mod link_state;
pub mod logbook;
pub mod timer;
pub mod transport;

pub use client::RemoteLink;
pub use command::{CommandChannel, Direction};
pub use config::{ClosePolicy, Endpoint, Settings};
pub use error::{ConfigError, TransportError, UnknownDirection};
pub use link::ConnectionManager;
pub use link_state::LinkState;
pub use logbook::{LogBook, LogEntry};
