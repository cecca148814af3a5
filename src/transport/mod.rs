//! Network transport for canister calls
//!
//! The [`Transport`] trait is the seam between the call executors and the
//! wire: production uses [`HttpTransport`] against the network's HTTP
//! interface, tests substitute an in-memory implementation.

mod envelope;
mod http;

pub use http::HttpTransport;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Identifier of a submitted update call, derived from the request content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub [u8; 32]);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Outcome of a read-only call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResponse {
    /// The canister replied with raw payload bytes
    Replied { arg: Vec<u8> },
    /// The call was rejected at the protocol level
    Rejected { code: u64, message: String },
}

/// Observed status of a submitted update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    /// The network does not know the request yet
    Unknown,
    Received,
    Processing,
    /// Terminal: certified reply payload is available
    Replied { arg: Vec<u8> },
    /// Terminal: the call was rejected
    Rejected { code: u64, message: String },
    /// Terminal: the call completed but the reply is no longer retrievable
    Done,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Replied { .. } | CallStatus::Rejected { .. } | CallStatus::Done
        )
    }
}

/// Transport-level error
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// A wire envelope could not be built or understood
    #[error("envelope error: {0}")]
    Envelope(String),
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// One handle to the remote network.
///
/// Implementations must be cheap to share behind an `Arc`; all methods take
/// `&self` and may be called from any number of tasks concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a read-only call and return its protocol-level outcome.
    async fn query(&self, method: &str, arg: &[u8]) -> Result<QueryResponse>;

    /// Submit a mutating call for asynchronous execution.
    async fn submit(&self, method: &str, arg: &[u8]) -> Result<RequestId>;

    /// Look up the current status of a submitted call.
    async fn request_status(&self, request_id: &RequestId) -> Result<CallStatus>;

    /// Fetch and pin the network's root verification material.
    ///
    /// Called once by the session manager for local/development networks
    /// before the transport is shared. In-memory transports treat this as a
    /// no-op.
    async fn bootstrap_trust(&self) -> Result<()>;
}
