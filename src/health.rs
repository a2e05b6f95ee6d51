use serde_with::SerializeDisplay;
use strum_macros::Display;
use tokio::sync::watch;
use tracing::{info, warn};

pub const DEFAULT_MISSED_PONG_THRESHOLD: u32 = 3;

/// Liveness of the radio controller as seen by the heartbeat.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Display, SerializeDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Healthy,
    Unresponsive,
}

/// Counts pings left unanswered and publishes status transitions.
#[derive(Debug)]
pub struct HealthMonitor {
    threshold: u32,
    missed: u32,
    status: watch::Sender<HealthStatus>,
}

impl HealthMonitor {
    /// Creates a monitor in [`HealthStatus::Unknown`] and a receiver for its transitions.
    #[must_use]
    pub fn new(threshold: u32) -> (Self, watch::Receiver<HealthStatus>) {
        let (status, receiver) = watch::channel(HealthStatus::Unknown);
        let monitor = Self {
            threshold: threshold.max(1),
            missed: 0,
            status,
        };
        (monitor, receiver)
    }

    /// Records a heartbeat ping. Returns the new status if this ping made the peer unresponsive.
    pub fn record_ping(&mut self) -> Option<HealthStatus> {
        self.missed = self.missed.saturating_add(1);
        if self.missed < self.threshold || self.status() == HealthStatus::Unresponsive {
            return None;
        }
        warn!(missed = self.missed, "radio controller stopped answering pings");
        self.publish(HealthStatus::Unresponsive)
    }

    /// Records a pong. Returns the new status on a transition.
    pub fn record_pong(&mut self) -> Option<HealthStatus> {
        self.missed = 0;
        if self.status() == HealthStatus::Healthy {
            return None;
        }
        info!("radio controller is healthy");
        self.publish(HealthStatus::Healthy)
    }

    #[must_use]
    pub fn status(&self) -> HealthStatus {
        *self.status.borrow()
    }

    /// Pings sent since the last pong.
    #[must_use]
    pub fn missed(&self) -> u32 {
        self.missed
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.status.subscribe()
    }

    fn publish(&self, status: HealthStatus) -> Option<HealthStatus> {
        self.status.send_replace(status);
        Some(status)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starts_unknown() {
        let (monitor, receiver) = HealthMonitor::new(DEFAULT_MISSED_PONG_THRESHOLD);

        assert_eq!(HealthStatus::Unknown, monitor.status());
        assert_eq!(HealthStatus::Unknown, *receiver.borrow());
    }

    #[test]
    fn third_missed_pong_marks_unresponsive_once() {
        let (mut monitor, receiver) = HealthMonitor::new(3);

        assert_eq!(None, monitor.record_ping());
        assert_eq!(None, monitor.record_ping());
        assert_eq!(Some(HealthStatus::Unresponsive), monitor.record_ping());
        assert_eq!(None, monitor.record_ping());
        assert_eq!(4, monitor.missed());
        assert_eq!(HealthStatus::Unresponsive, *receiver.borrow());
    }

    #[test]
    fn pong_recovers_and_resets_the_count() {
        let (mut monitor, _receiver) = HealthMonitor::new(3);
        for _ in 0..3 {
            monitor.record_ping();
        }

        assert_eq!(Some(HealthStatus::Healthy), monitor.record_pong());
        assert_eq!(0, monitor.missed());
        assert_eq!(None, monitor.record_pong());
    }

    #[test]
    fn status_serialises_as_snake_case() {
        let json = serde_json::to_string(&HealthStatus::Unresponsive)
            .expect("status should serialise");

        assert_eq!("\"unresponsive\"", json);
    }
}
