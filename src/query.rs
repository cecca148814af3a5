//! Read-only call executor
//!
//! Queries carry their arguments as a JSON array and return JSON-shaped
//! replies. Failures propagate to the caller unchanged; queries are never
//! retried here.

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TaggrError};
use crate::transport::{QueryResponse, Transport};

/// Issue a read-only call and decode its JSON reply.
pub async fn query(transport: &dyn Transport, method: &str, args: &[Value]) -> Result<Value> {
    let arg = serde_json::to_vec(args)
        .map_err(|e| TaggrError::protocol(method, format!("argument encoding failed: {e}")))?;

    debug!(method, "issuing query");
    match transport.query(method, &arg).await? {
        QueryResponse::Replied { arg } => serde_json::from_slice(&arg).map_err(|e| {
            debug!(method, error = %e, "query reply is not valid JSON");
            TaggrError::protocol(method, "malformed reply")
        }),
        QueryResponse::Rejected { code, message } => {
            debug!(method, code, "query rejected");
            Err(TaggrError::protocol(method, message))
        }
    }
}
