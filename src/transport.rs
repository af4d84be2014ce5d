//! WebSocket transport for the controller link
//!
//! Each connection runs in its own tokio task and reports back through the
//! link's event queue. Opening never blocks the caller.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ABNORMAL_CLOSURE, NO_STATUS_RECEIVED};
use crate::error::TransportError;
use crate::event::{ConnId, EventSender, LinkEvent};

/// Opens transport connections
pub trait Connector: Send + 'static {
    type Conn: Connection;

    /// Start opening a connection to `url`. The outcome arrives later as
    /// [`LinkEvent::Opened`] or [`LinkEvent::Failed`] + [`LinkEvent::Closed`],
    /// all tagged with `id`.
    fn open(&mut self, url: &str, id: ConnId, events: EventSender) -> Self::Conn;
}

/// Handle to one live or pending connection
pub trait Connection: Send {
    /// Queue one text frame.
    fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Close the connection. No further events are reported for it.
    fn close(&mut self);
}

/// tokio-tungstenite backed connector
#[derive(Clone, Debug, Default)]
pub struct WsConnector;

pub struct WsConnection {
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl Connector for WsConnector {
    type Conn = WsConnection;

    fn open(&mut self, url: &str, id: ConnId, events: EventSender) -> WsConnection {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let url = url.to_string();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            run_websocket(&url, id, events, outbound_rx, task_cancel).await;
        });

        WsConnection { outbound, cancel }
    }
}

impl Connection for WsConnection {
    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.outbound
            .send(text.to_string())
            .map_err(|_| TransportError::Send("connection task has exited".into()))
    }

    fn close(&mut self) {
        self.cancel.cancel();
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Report a broken connection: error first, then the abnormal close.
fn report_failure(events: &EventSender, id: ConnId, err: TransportError) {
    let _ = events.send(LinkEvent::Failed(id, err));
    let _ = events.send(LinkEvent::Closed {
        conn: id,
        code: ABNORMAL_CLOSURE,
        reason: String::new(),
    });
}

async fn run_websocket(
    url: &str,
    id: ConnId,
    events: EventSender,
    mut outbound: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    info!(url, %id, "Connecting to controller");

    let connected = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(%id, "Connection attempt abandoned");
            return;
        }
        result = connect_async(url) => result,
    };

    let ws_stream = match connected {
        Ok((stream, _)) => {
            info!(%id, "WebSocket connected");
            let _ = events.send(LinkEvent::Opened(id));
            stream
        }
        Err(e) => {
            error!(%id, error = %e, "Failed to connect");
            report_failure(&events, id, TransportError::Open(e.to_string()));
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%id, "Closing connection");
                let _ = write.send(Message::Close(None)).await;
                return;
            }
            frame = outbound.recv() => {
                let Some(text) = frame else {
                    // Handle dropped
                    let _ = write.send(Message::Close(None)).await;
                    return;
                };
                trace!(%id, frame = %text, "Sending frame");
                if let Err(e) = write.send(Message::Text(text)).await {
                    error!(%id, error = %e, "Failed to send frame");
                    report_failure(&events, id, TransportError::Stream(e.to_string()));
                    return;
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(LinkEvent::Message(id, text.to_string()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(cf) => (u16::from(cf.code), cf.reason.to_string()),
                            None => (NO_STATUS_RECEIVED, String::new()),
                        };
                        warn!(%id, code, reason = %reason, "WebSocket closed by controller");
                        let _ = events.send(LinkEvent::Closed { conn: id, code, reason });
                        return;
                    }
                    Some(Err(e)) => {
                        error!(%id, error = %e, "WebSocket error");
                        report_failure(&events, id, TransportError::Stream(e.to_string()));
                        return;
                    }
                    None => {
                        warn!(%id, "WebSocket stream ended");
                        let _ = events.send(LinkEvent::Closed {
                            conn: id,
                            code: ABNORMAL_CLOSURE,
                            reason: String::new(),
                        });
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
