use std::time::Duration;

use tokio::sync::mpsc::WeakSender;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::CoordinatorMessage;
use crate::bt::{ConsumerUsage, PassthroughKey};

/// Second half of a two-phase key press.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum KeyRelease {
    Hid(ConsumerUsage),
    Passthrough { label: u8, key: PassthroughKey },
}

/// Timer expiries delivered to the coordinator.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum TimerEvent {
    MetadataPoll,
    Release(KeyRelease),
}

/// Timer tasks owned by one Bluetooth session.
///
/// Tasks post back through a weak sender so they never keep the coordinator
/// alive, and all of them stop when the session is cancelled.
#[derive(Debug)]
pub(crate) struct Timers {
    queue: WeakSender<CoordinatorMessage>,
    session: CancellationToken,
    metadata_poll: Option<CancellationToken>,
}

impl Timers {
    pub(crate) fn new(queue: WeakSender<CoordinatorMessage>) -> Self {
        Self {
            queue,
            session: CancellationToken::new(),
            metadata_poll: None,
        }
    }

    /// Posts `release` after `delay` unless the session ends first.
    pub(crate) fn schedule_release(&self, delay: Duration, release: KeyRelease) {
        let queue = self.queue.clone();
        let session = self.session.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = session.cancelled() => {}
                () = sleep(delay) => {
                    post(&queue, TimerEvent::Release(release)).await;
                }
            }
        });
    }

    /// Starts the periodic metadata refresh. Does nothing when already running.
    pub(crate) fn start_metadata_poll(&mut self, period: Duration) {
        if self.metadata_poll.is_some() {
            return;
        }
        let token = self.session.child_token();
        self.metadata_poll = Some(token.clone());
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => return,
                    _ = ticks.tick() => {
                        if !post(&queue, TimerEvent::MetadataPoll).await {
                            return;
                        }
                    }
                }
            }
        });
    }

    pub(crate) fn stop_metadata_poll(&mut self) {
        if let Some(token) = self.metadata_poll.take() {
            token.cancel();
        }
    }

    pub(crate) fn is_polling(&self) -> bool {
        self.metadata_poll.is_some()
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.session.cancel();
    }
}

async fn post(queue: &WeakSender<CoordinatorMessage>, event: TimerEvent) -> bool {
    let Some(queue) = queue.upgrade() else {
        return false;
    };
    if queue.send(CoordinatorMessage::Timer(event)).await.is_err() {
        trace!(?event, "coordinator gone, dropping timer event");
        return false;
    }
    true
}
