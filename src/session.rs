//! Session management for the shared network transport
//!
//! One transport per process, built lazily on first use. Construction is
//! single-flight: concurrent first callers await the same in-flight build
//! and observe the same handle. A failed build leaves nothing cached, so a
//! later caller simply retries.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::error::{Result, TaggrError};
use crate::transport::{HttpTransport, Transport};

/// Lazily built, process-wide transport handle
pub struct SessionManager {
    config: EndpointConfig,
    cell: OnceCell<Arc<dyn Transport>>,
}

impl SessionManager {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Build a manager around an existing transport, skipping construction
    /// and trust bootstrap entirely. Used by tests and embedders that manage
    /// their own transport.
    pub fn with_transport(config: EndpointConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            cell: OnceCell::new_with(Some(transport)),
        }
    }

    /// Get the shared transport, building it on first use.
    ///
    /// Local/development networks carry their own root key, fetched and
    /// pinned here before the handle is shared.
    pub async fn session(&self) -> Result<Arc<dyn Transport>> {
        let transport = self
            .cell
            .get_or_try_init(|| async {
                debug!(host = %self.config.network_host, "building network transport");
                let transport = HttpTransport::new(&self.config)
                    .map_err(|e| TaggrError::Session(e.to_string()))?;
                if self.config.is_local_network() {
                    transport
                        .bootstrap_trust()
                        .await
                        .map_err(|e| TaggrError::Session(format!("trust bootstrap failed: {e}")))?;
                }
                Ok::<_, TaggrError>(Arc::new(transport) as Arc<dyn Transport>)
            })
            .await?;
        Ok(Arc::clone(transport))
    }
}
