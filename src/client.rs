//! Link actor and its owned handle
//!
//! One tokio task owns the [`ConnectionManager`] and applies events in arrival
//! order. The [`RemoteLink`] handle is what a control surface holds: it reads
//! status and logs, and sends commands through a [`CommandChannel`].

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::command::CommandChannel;
use crate::config::Settings;
use crate::event::{self, EventReceiver, EventSender, LinkEvent};
use crate::link::ConnectionManager;
use crate::link_state::LinkState;
use crate::logbook::LogBook;
use crate::transport::{Connector, WsConnector};

pub struct RemoteLink {
    events: EventSender,
    status: watch::Receiver<LinkState>,
    logbook: LogBook,
    task: Option<JoinHandle<()>>,
}

impl RemoteLink {
    /// Start the link over WebSocket. Must be called from within a tokio runtime.
    pub fn spawn(settings: Settings) -> Self {
        Self::spawn_with(settings, WsConnector)
    }

    /// Start the link over any [`Connector`] and issue the first connect.
    pub fn spawn_with<C: Connector>(settings: Settings, connector: C) -> Self {
        let (events, rx) = event::channel();
        let mut manager = ConnectionManager::new(settings, connector, events.clone());
        let status = manager.status();
        let logbook = manager.logbook();

        info!(url = manager.url(), "Starting link");
        manager.connect();
        let task = tokio::spawn(run(manager, rx));

        Self {
            events,
            status,
            logbook,
            task: Some(task),
        }
    }

    pub fn commands(&self) -> CommandChannel {
        CommandChannel::new(self.events.clone())
    }

    /// Live connection state
    pub fn status(&self) -> watch::Receiver<LinkState> {
        self.status.clone()
    }

    pub fn state(&self) -> LinkState {
        *self.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn logbook(&self) -> LogBook {
        self.logbook.clone()
    }

    /// Manual connect request; a no-op if the link is already up.
    pub fn connect(&self) {
        let _ = self.events.send(LinkEvent::Connect);
    }

    /// Close the connection, cancel any reconnect timer, and wait for the actor.
    pub async fn shutdown(mut self) {
        let _ = self.events.send(LinkEvent::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Link actor did not shut down cleanly");
            }
        }
    }
}

impl Drop for RemoteLink {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.events.send(LinkEvent::Shutdown);
        }
    }
}

async fn run<C: Connector>(mut manager: ConnectionManager<C>, mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        let stop = matches!(event, LinkEvent::Shutdown);
        manager.handle(event);
        if stop {
            break;
        }
    }
    debug!("Link actor exiting");
}
