//! Mutating call executor
//!
//! Updates are submitted, then polled until the network certifies a
//! terminal result: `Submitted -> Polling -> Finalized | Rejected`. The poll
//! loop suspends only the calling task; unrelated queries and updates run
//! untouched. Abandoning the returned future stops polling but not the
//! remote mutation, so callers must tolerate at-least-once execution.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::{Result, TaggrError};
use crate::transport::{CallStatus, Transport};

/// Polling cadence for update calls.
///
/// The terminal result of an update only exists after certification, so the
/// executor re-reads the call status every `interval` until `timeout` has
/// elapsed. A zero timeout exhausts the loop after one status read without
/// sleeping.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between consecutive status reads
    pub interval: Duration,
    /// Overall budget before the call is abandoned as timed out
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

/// One step of the update state machine
enum CallState {
    Polling,
    Finalized(Vec<u8>),
    Rejected(String),
}

impl CallState {
    fn from_status(status: CallStatus) -> Self {
        match status {
            CallStatus::Replied { arg } => CallState::Finalized(arg),
            // Terminal with no retrievable payload: success with unknown id.
            CallStatus::Done => CallState::Finalized(Vec::new()),
            CallStatus::Rejected { message, .. } => CallState::Rejected(message),
            CallStatus::Unknown | CallStatus::Received | CallStatus::Processing => {
                CallState::Polling
            }
        }
    }
}

/// Submit a mutating call and block the calling task until it finalizes.
///
/// Returns the raw certified reply bytes; zero-length means the call
/// completed without a decodable payload.
pub async fn update(
    transport: &dyn Transport,
    poll: &PollConfig,
    method: &str,
    arg: &[u8],
) -> Result<Vec<u8>> {
    let request_id = transport.submit(method, arg).await?;
    debug!(method, %request_id, "update submitted, polling for certification");

    let deadline = Instant::now() + poll.timeout;
    loop {
        let status = transport.request_status(&request_id).await?;
        match CallState::from_status(status) {
            CallState::Finalized(bytes) => {
                debug!(method, %request_id, reply_len = bytes.len(), "update finalized");
                return Ok(bytes);
            }
            CallState::Rejected(message) => {
                debug!(method, %request_id, "update rejected");
                return Err(TaggrError::protocol(method, message));
            }
            CallState::Polling => {}
        }

        if Instant::now() >= deadline {
            return Err(TaggrError::protocol(method, "polling timeout"));
        }
        tokio::time::sleep(poll.interval).await;
    }
}
