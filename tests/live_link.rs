//! End-to-end link behavior against a local WebSocket server

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rc_remote::{Direction, Endpoint, LinkState, RemoteLink, Settings};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(10);

async fn local_server() -> (TcpListener, Settings) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let settings = Settings {
        endpoint: Endpoint::new("127.0.0.1", port),
        reconnect_interval_ms: 200,
        ..Settings::default()
    };
    (listener, settings)
}

async fn wait_for(status: &mut watch::Receiver<LinkState>, want: LinkState) {
    tokio::time::timeout(WAIT, status.wait_for(|s| *s == want))
        .await
        .expect("timed out waiting for link state")
        .expect("link actor stopped");
}

async fn next_text<S>(read: &mut S) -> String
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(WAIT, read.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return text.to_string();
        }
    }
}

#[tokio::test]
async fn commands_arrive_in_order() {
    let (listener, settings) = local_server().await;
    let link = RemoteLink::spawn(settings);
    let mut status = link.status();

    let (tcp, _) = listener.accept().await.unwrap();
    let mut server = accept_async(tcp).await.unwrap();
    wait_for(&mut status, LinkState::Connected).await;
    assert!(link.logbook().count_containing("Connected") >= 1);

    let commands = link.commands();
    commands.press(Direction::Forward);
    tokio::time::sleep(Duration::from_millis(300)).await;
    commands.release();

    assert_eq!(next_text(&mut server).await, "forward");
    assert_eq!(next_text(&mut server).await, "stop");

    let mut feed = link.logbook().subscribe();
    server.send(Message::Text("ack".into())).await.unwrap();
    let entry = tokio::time::timeout(WAIT, feed.recv()).await.unwrap().unwrap();
    assert_eq!(entry.text, "Received: ack");

    link.shutdown().await;
}

#[tokio::test]
async fn abnormal_drop_reconnects() {
    let (listener, settings) = local_server().await;
    let link = RemoteLink::spawn(settings);
    let mut status = link.status();

    let (tcp, _) = listener.accept().await.unwrap();
    let server = accept_async(tcp).await.unwrap();
    wait_for(&mut status, LinkState::Connected).await;

    // Drop without a close handshake
    drop(server);
    wait_for(&mut status, LinkState::Disconnected).await;

    link.commands().send("forward");

    let (tcp, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("no reconnect attempt")
        .unwrap();
    let mut server = accept_async(tcp).await.unwrap();
    wait_for(&mut status, LinkState::Connected).await;

    let log = link.logbook();
    assert!(log.count_containing("1006") >= 1);
    assert!(log.count_containing("Attempting to reconnect...") >= 1);
    assert_eq!(log.count_containing("not open"), 1);

    // The dropped command is not replayed on the new connection
    link.commands().send("left");
    assert_eq!(next_text(&mut server).await, "left");

    link.shutdown().await;
}

#[tokio::test]
async fn unreachable_controller_keeps_retrying() {
    let (listener, settings) = local_server().await;
    // Nothing listens on the port any more
    drop(listener);

    let link = RemoteLink::spawn(settings);
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let log = link.logbook();
    assert!(!link.is_connected());
    assert!(log.count_containing("Link error") >= 2);
    assert!(log.count_containing("Attempting to reconnect...") >= 2);

    link.shutdown().await;
}

#[tokio::test]
async fn clean_server_close_stays_idle() {
    let (listener, settings) = local_server().await;
    let link = RemoteLink::spawn(settings);
    let mut status = link.status();

    let (tcp, _) = listener.accept().await.unwrap();
    let mut server = accept_async(tcp).await.unwrap();
    wait_for(&mut status, LinkState::Connected).await;

    server
        .close(Some(CloseFrame { code: CloseCode::Normal, reason: "bye".into() }))
        .await
        .unwrap();
    wait_for(&mut status, LinkState::Disconnected).await;

    // Several reconnect periods pass without a new attempt
    let accepted = tokio::time::timeout(Duration::from_millis(800), listener.accept()).await;
    assert!(accepted.is_err(), "clean close must not reconnect");

    let log = link.logbook();
    assert_eq!(log.count_containing("Link closed: 1000, bye"), 1);
    assert_eq!(log.count_containing("Attempting to reconnect"), 0);
    assert_eq!(log.count_containing("Link error"), 0);
    assert_eq!(link.state(), LinkState::Disconnected);

    link.shutdown().await;
}

#[tokio::test]
async fn close_without_payload_reports_no_status() {
    let (listener, settings) = local_server().await;
    let link = RemoteLink::spawn(settings);
    let mut status = link.status();

    let (tcp, _) = listener.accept().await.unwrap();
    let mut server = accept_async(tcp).await.unwrap();
    wait_for(&mut status, LinkState::Connected).await;

    server.close(None).await.unwrap();
    wait_for(&mut status, LinkState::Disconnected).await;

    let accepted = tokio::time::timeout(Duration::from_millis(800), listener.accept()).await;
    assert!(accepted.is_err(), "close while connected must not reconnect");

    let log = link.logbook();
    assert_eq!(log.count_containing("Link closed: 1005, "), 1);
    assert_eq!(log.count_containing("Attempting to reconnect"), 0);

    link.shutdown().await;
}

#[tokio::test]
async fn failed_handshake_logs_error_before_close() {
    let (listener, settings) = local_server().await;
    let link = RemoteLink::spawn(settings);

    // Accept the TCP connection, then hang up before the upgrade
    let (tcp, _) = listener.accept().await.unwrap();
    drop(tcp);

    let mut feed = link.logbook().subscribe();
    let mut seen = link.logbook().texts();
    while !seen.iter().any(|t| t.starts_with("Link closed: 1006")) {
        let entry = tokio::time::timeout(WAIT, feed.recv()).await.unwrap().unwrap();
        seen.push(entry.text);
    }

    let error_at = seen
        .iter()
        .position(|t| t.starts_with("Link error: failed to open connection"))
        .expect("handshake error logged");
    let close_at = seen
        .iter()
        .position(|t| t.starts_with("Link closed: 1006"))
        .unwrap();
    assert!(error_at < close_at);
    assert!(!link.is_connected());

    link.shutdown().await;
}
