//! Terminal control surface for the controller link
//!
//! Run with: cargo run --features cli --bin rc-cli
//!
//! Input, one per line:
//! - `forward` / `backward` / `left` / `right` / `stop` (or w/s/a/d/x): press
//! - `<direction> <ms>`: press, hold for ms, release
//! - `connect`: manual connect
//! - `log`: dump the log as JSON lines
//! - `quit`: shut down
//!
//! Anything else is sent verbatim.

use std::time::Duration;

use rc_remote::{CommandChannel, Direction, RemoteLink, Settings};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rc_remote=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let settings = Settings::load()?;
    info!(url = %settings.endpoint.url(), "Starting remote control");

    let link = RemoteLink::spawn(settings);
    let commands = link.commands();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stats_interval = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.trim() {
                    "" => {}
                    "quit" | "exit" => break,
                    "connect" => link.connect(),
                    "log" => {
                        for entry in link.logbook().entries() {
                            println!("{}", serde_json::to_string(&entry)?);
                        }
                    }
                    input => handle_input(&commands, input),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                break;
            }
            _ = stats_interval.tick() => {
                info!(
                    state = %link.state(),
                    log_entries = link.logbook().len(),
                    "status"
                );
            }
        }
    }

    link.shutdown().await;
    Ok(())
}

/// Translate one input line into press / hold / release.
fn handle_input(commands: &CommandChannel, input: &str) {
    let mut parts = input.split_whitespace();
    let word = parts.next().unwrap_or_default();

    let Ok(direction) = word.parse::<Direction>() else {
        commands.send(input);
        return;
    };

    commands.press(direction);
    if let Some(ms) = parts.next().and_then(|ms| ms.parse::<u64>().ok()) {
        let commands = commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            commands.release();
        });
    }
}
