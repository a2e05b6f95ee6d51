use std::time::Duration;

use async_trait::async_trait;
use strum_macros::Display;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, instrument};

use crate::error::LinkError;

/// Link edges needed to wake from light sleep.
pub const DEFAULT_WAKE_EDGE_THRESHOLD: u32 = 3;
/// Pause between flushing the deactivation acknowledgement and sleeping.
pub const DEFAULT_SUSPEND_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WakeReason {
    LinkActivity,
    LinkClosed,
}

/// Low-power hook used while the Bluetooth stack is deactivated.
#[async_trait]
pub trait PowerControl: Send + Sync {
    /// Configures the link as a wake source.
    ///
    /// # Errors
    ///
    /// Returns an error if the wake source cannot be armed.
    async fn arm_wake(&self, edge_threshold: u32) -> Result<(), LinkError>;

    /// Sleeps until the armed wake source fires. The bytes that caused the
    /// wake are consumed and never reach the frame decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the link fails while waiting.
    async fn suspend(
        &self,
        link: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<WakeReason, LinkError>;
}

/// Host stand-in for light sleep: blocks until the next inbound bytes.
#[derive(Debug, Default)]
pub struct LinkActivityWake;

#[async_trait]
impl PowerControl for LinkActivityWake {
    async fn arm_wake(&self, edge_threshold: u32) -> Result<(), LinkError> {
        debug!(edge_threshold, "link armed as wake source");
        Ok(())
    }

    #[instrument(skip_all, level = "info")]
    async fn suspend(
        &self,
        link: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<WakeReason, LinkError> {
        info!("suspended until link activity");
        let mut discarded = [0u8; 64];
        let count = link
            .read(&mut discarded)
            .await
            .map_err(|source| LinkError::Read { source })?;
        if count == 0 {
            return Ok(WakeReason::LinkClosed);
        }
        debug!(discarded = count, "woken by link activity");
        Ok(WakeReason::LinkActivity)
    }
}
