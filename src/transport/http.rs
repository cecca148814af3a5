//! HTTP transport against the network's v2 canister API
//!
//! One `reqwest` client per transport, built once with a timeout. Calls are
//! anonymous: queries and updates go to the canister's query/call endpoints,
//! update status is read back through read_state, and the status endpoint
//! supplies the root key pinned during trust bootstrap on local networks.

use std::time::Duration;

use async_trait::async_trait;
use candid::Principal;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::EndpointConfig;

use super::{
    envelope, CallStatus, QueryResponse, RequestId, Result, Transport, TransportError,
};

/// Default timeout for a single HTTP round-trip
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How far in the future submitted calls expire, in seconds
const INGRESS_EXPIRY_SECS: i64 = 240;

/// Production transport speaking CBOR over HTTP
pub struct HttpTransport {
    client: reqwest::Client,
    host: String,
    canister: Principal,
    canister_text: String,
    root_key: RwLock<Option<Vec<u8>>>,
}

impl HttpTransport {
    /// Build a transport bound to the configured host and canister.
    ///
    /// Performs no I/O; the root key is fetched separately by
    /// [`Transport::bootstrap_trust`] when the network requires it.
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let canister = Principal::from_text(&config.canister_id).map_err(|e| {
            TransportError::Envelope(format!(
                "invalid canister id {:?}: {e}",
                config.canister_id
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            host: config.network_host.trim_end_matches('/').to_string(),
            canister_text: canister.to_text(),
            canister,
            root_key: RwLock::new(None),
        })
    }

    /// The pinned root key, when trust bootstrap has run.
    pub async fn root_key(&self) -> Option<Vec<u8>> {
        self.root_key.read().await.clone()
    }

    async fn post_cbor(&self, url: &str, body: Vec<u8>) -> Result<(u16, Vec<u8>)> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/cbor")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?.to_vec();
        if !status.is_success() {
            return Err(TransportError::Server {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok((status.as_u16(), bytes))
    }

    fn ingress_expiry() -> u64 {
        let expiry = Utc::now() + chrono::Duration::seconds(INGRESS_EXPIRY_SECS);
        expiry
            .timestamp_nanos_opt()
            .map(|n| n as u64)
            .unwrap_or(u64::MAX)
    }

    fn nonce() -> [u8; 16] {
        rand::random()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn query(&self, method: &str, arg: &[u8]) -> Result<QueryResponse> {
        let envelope = envelope::encode_query(
            &self.canister,
            method,
            arg,
            Self::ingress_expiry(),
            &Self::nonce(),
        )?;
        let url = format!("{}/api/v2/canister/{}/query", self.host, self.canister_text);
        let (_, body) = self.post_cbor(&url, envelope).await?;
        envelope::parse_query_response(&body)
    }

    async fn submit(&self, method: &str, arg: &[u8]) -> Result<RequestId> {
        let (envelope, request_id) = envelope::encode_call(
            &self.canister,
            method,
            arg,
            Self::ingress_expiry(),
            &Self::nonce(),
        )?;
        let url = format!("{}/api/v2/canister/{}/call", self.host, self.canister_text);
        let (status, _) = self.post_cbor(&url, envelope).await?;
        debug!(method, %request_id, status, "update call accepted");
        Ok(request_id)
    }

    async fn request_status(&self, request_id: &RequestId) -> Result<CallStatus> {
        let envelope = envelope::encode_read_state(request_id, Self::ingress_expiry())?;
        let url = format!(
            "{}/api/v2/canister/{}/read_state",
            self.host, self.canister_text
        );
        let (_, body) = self.post_cbor(&url, envelope).await?;
        envelope::parse_request_status(&body, request_id)
    }

    async fn bootstrap_trust(&self) -> Result<()> {
        let url = format!("{}/api/v2/status", self.host);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?.to_vec();
        if !status.is_success() {
            return Err(TransportError::Server {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let key = envelope::parse_root_key(&bytes)?;
        debug!(key_len = key.len(), "pinned network root key");
        *self.root_key.write().await = Some(key);
        Ok(())
    }
}
