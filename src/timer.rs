//! Reconnect timer
//!
//! A periodic task that posts [`LinkEvent::ReconnectTick`] into the link's
//! event queue. The first tick fires one full period after start. Dropping
//! the handle aborts the task, so cancellation is just `Option::take`.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::event::{EventSender, LinkEvent, TimerId};

const MIN_PERIOD: Duration = Duration::from_millis(1);

pub struct ReconnectTimer {
    id: TimerId,
    task: JoinHandle<()>,
}

impl ReconnectTimer {
    /// Must be called from within a tokio runtime. A zero period is raised to 1 ms.
    pub fn start(id: TimerId, period: Duration, events: EventSender) -> Self {
        let period = period.max(MIN_PERIOD);
        debug!(timer = id.0, period_ms = period.as_millis() as u64, "Reconnect timer started");
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if events.send(LinkEvent::ReconnectTick(id)).is_err() {
                    // Link actor is gone
                    break;
                }
            }
        });
        Self { id, task }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.task.abort();
        debug!(timer = self.id.0, "Reconnect timer cancelled");
    }
}
