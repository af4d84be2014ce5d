//! Connection manager - owns the controller link and its recovery
//!
//! The manager holds the one transport connection, the lifecycle state and the
//! optional reconnect timer. All of it changes only inside [`ConnectionManager::handle`]
//! (and the operations it dispatches to), which the link actor calls once per
//! event. That keeps a single writer and a single event order.
//!
//! Recovery policy:
//! - any loss degrades to Disconnected, never to an error for the caller
//! - a close that matches the [`ClosePolicy`](crate::config::ClosePolicy) starts a fixed-period timer
//! - each tick calls [`connect`](ConnectionManager::connect) again, forever
//! - only reaching Connected (or a manual connect finding an open link)
//!   cancels the timer

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::TransportError;
use crate::event::{ConnId, EventSender, LinkEvent, TimerId};
use crate::link_state::LinkState;
use crate::logbook::LogBook;
use crate::timer::ReconnectTimer;
use crate::transport::{Connection, Connector};

struct ActiveConn<T> {
    id: ConnId,
    handle: T,
}

pub struct ConnectionManager<C: Connector> {
    settings: Settings,
    url: String,
    connector: C,
    events: EventSender,
    conn: Option<ActiveConn<C::Conn>>,
    state: LinkState,
    status: watch::Sender<LinkState>,
    timer: Option<ReconnectTimer>,
    log: LogBook,
    next_conn: u64,
    next_timer: u64,
}

impl<C: Connector> ConnectionManager<C> {
    /// `events` must feed back into whatever calls [`handle`](Self::handle).
    pub fn new(settings: Settings, connector: C, events: EventSender) -> Self {
        let (status, _) = watch::channel(LinkState::Disconnected);
        Self {
            url: settings.endpoint.url(),
            settings,
            connector,
            events,
            conn: None,
            state: LinkState::Disconnected,
            status,
            timer: None,
            log: LogBook::new(),
            next_conn: 0,
            next_timer: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn status(&self) -> watch::Receiver<LinkState> {
        self.status.subscribe()
    }

    pub fn logbook(&self) -> LogBook {
        self.log.clone()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn reconnect_pending(&self) -> bool {
        self.timer.is_some()
    }

    /// The connection, but only while the link is Connected
    pub(crate) fn ready_connection(&self) -> Option<&C::Conn> {
        match &self.conn {
            Some(conn) if self.state.is_connected() => Some(&conn.handle),
            _ => None,
        }
    }

    pub(crate) fn log(&self, text: impl Into<String>) {
        self.log.push(text);
    }

    /// Single entry point for everything the actor receives.
    ///
    /// [`LinkEvent::Shutdown`] tears the link down; the caller is expected to
    /// stop feeding events afterwards.
    pub fn handle(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Opened(id) => {
                if self.is_current(id) {
                    self.on_open();
                }
            }
            LinkEvent::Message(id, data) => {
                if self.is_current(id) {
                    self.on_message(&data);
                }
            }
            LinkEvent::Failed(id, err) => {
                if self.is_current(id) {
                    self.on_error(&err);
                }
            }
            LinkEvent::Closed { conn, code, reason } => {
                if self.is_current(conn) {
                    self.on_close(code, &reason);
                }
            }
            LinkEvent::ReconnectTick(id) => self.on_reconnect_tick(id),
            LinkEvent::Command(command) => crate::command::dispatch(self, &command),
            LinkEvent::Connect => self.connect(),
            LinkEvent::Shutdown => self.shutdown(),
        }
    }

    fn is_current(&self, id: ConnId) -> bool {
        let current = self.conn.as_ref().is_some_and(|c| c.id == id);
        if !current {
            debug!(%id, "Ignoring event from superseded connection");
        }
        current
    }

    fn set_state(&mut self, next: LinkState) {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "Unexpected link state transition");
        }
        self.state = next;
        self.status.send_replace(next);
    }

    /// Cancel the reconnect timer. Returns whether one was running.
    fn cancel_reconnect(&mut self) -> bool {
        self.timer.take().is_some()
    }

    /// Idempotent connect: a no-op (besides timer cleanup) when already connected.
    pub fn connect(&mut self) {
        if self.conn.is_some() && self.state.is_connected() {
            self.log("Link is already connected.");
            if self.cancel_reconnect() {
                self.log("Reconnection attempts cleared due to active connection.");
            }
            self.set_state(LinkState::Connected);
            return;
        }

        // A pending attempt is superseded, never left running beside the new one
        if let Some(mut stale) = self.conn.take() {
            debug!(id = %stale.id, "Abandoning pending connection");
            stale.handle.close();
        }

        self.next_conn += 1;
        let id = ConnId(self.next_conn);
        info!(url = %self.url, %id, "Opening link");
        let handle = self.connector.open(&self.url, id, self.events.clone());
        self.conn = Some(ActiveConn { id, handle });
        self.set_state(LinkState::Connecting);
    }

    fn on_open(&mut self) {
        if self.state != LinkState::Connecting {
            debug!(state = %self.state, "Ignoring open outside of Connecting");
            return;
        }
        info!(url = %self.url, "Link connected");
        self.log(format!("Connected to {}", self.url));
        self.set_state(LinkState::Connected);
        if self.cancel_reconnect() {
            self.log("Reconnection attempts cleared after successful connection.");
        }
    }

    fn on_message(&mut self, data: &str) {
        debug!(data, "Frame received");
        self.log(format!("Received: {data}"));
    }

    /// The close that follows decides about reconnecting.
    fn on_error(&mut self, err: &TransportError) {
        error!(error = %err, "Link error");
        self.log(format!("Link error: {err}"));
        self.set_state(LinkState::Disconnected);
    }

    fn on_close(&mut self, code: u16, reason: &str) {
        let was_connected = self.state.is_connected();
        warn!(code, reason, "Link closed");
        self.conn = None;
        self.set_state(LinkState::Disconnected);
        self.log(format!("Link closed: {code}, {reason}"));

        if self.settings.close_policy.should_reconnect(code, was_connected) {
            self.log("Connection was reset. Attempting to reconnect...");
            self.schedule_reconnect();
        }
    }

    /// Start the reconnect timer unless one is already running.
    pub fn schedule_reconnect(&mut self) {
        if self.timer.is_some() {
            debug!("Reconnect timer already running");
            return;
        }
        self.next_timer += 1;
        let timer = ReconnectTimer::start(
            TimerId(self.next_timer),
            self.settings.reconnect_interval(),
            self.events.clone(),
        );
        self.timer = Some(timer);
    }

    fn on_reconnect_tick(&mut self, id: TimerId) {
        if self.timer.as_ref().map(ReconnectTimer::id) != Some(id) {
            debug!(timer = id.0, "Ignoring tick from cancelled timer");
            return;
        }
        info!(url = %self.url, "Reconnect attempt");
        self.log("Attempting to reconnect...");
        self.connect();
    }

    /// Close the connection and cancel the timer. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            info!(id = %conn.id, "Closing link");
            conn.handle.close();
        }
        self.cancel_reconnect();
        self.set_state(LinkState::Disconnected);
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
