//! Endpoint configuration for the Taggr client
//!
//! Resolved once at startup and shared read-only for the process lifetime.
//! Missing environment variables never abort startup: the client degrades
//! into fallback mode where mutating operations succeed as mocked no-ops.

use tracing::warn;

/// Host used when `GYOTAKU_IC_HOST` is unset (local replica)
pub const DEFAULT_HOST: &str = "http://127.0.0.1:8080";
/// Canister used when `GYOTAKU_CANISTER_ID` is unset (management placeholder)
pub const DEFAULT_CANISTER_ID: &str = "aaaaa-aa";
/// Bucket URL template used when `GYOTAKU_BUCKET_URL_TEMPLATE` is unset or invalid
pub const DEFAULT_BUCKET_URL_TEMPLATE: &str = "https://{bucket}.raw.icp0.io/asset";

const BUCKET_PLACEHOLDER: &str = "{bucket}";

/// Resolved endpoint configuration, immutable for the process lifetime
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL of the network gateway (e.g. `https://icp0.io`)
    pub network_host: String,
    /// Textual principal of the Taggr canister
    pub canister_id: String,
    /// Asset URL template containing the `{bucket}` placeholder
    pub bucket_url_template: String,
    /// True when no real endpoint is configured; mutating operations
    /// short-circuit instead of calling the network
    pub fallback_mode: bool,
}

impl EndpointConfig {
    /// Build a configuration for a real endpoint.
    ///
    /// The `{bucket}` placeholder is an invariant of the template, checked
    /// here once; a template without it is replaced by the default so the
    /// per-call URL builder never has to fail.
    pub fn new(
        network_host: impl Into<String>,
        canister_id: impl Into<String>,
        bucket_url_template: impl Into<String>,
    ) -> Self {
        Self {
            network_host: network_host.into(),
            canister_id: canister_id.into(),
            bucket_url_template: normalize_template(bucket_url_template.into()),
            fallback_mode: false,
        }
    }

    /// Resolve configuration from `GYOTAKU_*` environment variables.
    ///
    /// A missing host or canister id switches the client into fallback mode
    /// with local defaults rather than failing at load time.
    pub fn from_env() -> Self {
        let host = env_trimmed("GYOTAKU_IC_HOST");
        let canister = env_trimmed("GYOTAKU_CANISTER_ID");
        let template = env_trimmed("GYOTAKU_BUCKET_URL_TEMPLATE");

        let fallback_mode = host.is_none() || canister.is_none();
        if host.is_none() {
            warn!("GYOTAKU_IC_HOST is not set, using {DEFAULT_HOST}");
        }
        if canister.is_none() {
            warn!("GYOTAKU_CANISTER_ID is not set, using {DEFAULT_CANISTER_ID}");
        }

        Self {
            network_host: host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            canister_id: canister.unwrap_or_else(|| DEFAULT_CANISTER_ID.to_string()),
            bucket_url_template: normalize_template(
                template.unwrap_or_else(|| DEFAULT_BUCKET_URL_TEMPLATE.to_string()),
            ),
            fallback_mode,
        }
    }

    /// Whether the host is a local/development replica.
    ///
    /// Local networks have their own root key; the session manager fetches
    /// and pins it before the first call.
    pub fn is_local_network(&self) -> bool {
        self.network_host.contains("127.0.0.1") || self.network_host.contains("localhost")
    }
}

/// Resolve the Taggr domain argument sent with feed and profile queries.
///
/// Optional; defaults to the main Taggr domain when `GYOTAKU_TAGGR_DOMAIN`
/// is unset.
pub fn taggr_domain() -> String {
    env_trimmed("GYOTAKU_TAGGR_DOMAIN").unwrap_or_else(|| "taggr".to_string())
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_template(template: String) -> String {
    if template.contains(BUCKET_PLACEHOLDER) {
        template
    } else {
        warn!(
            "bucket URL template {:?} is missing the {} placeholder, using {}",
            template, BUCKET_PLACEHOLDER, DEFAULT_BUCKET_URL_TEMPLATE
        );
        DEFAULT_BUCKET_URL_TEMPLATE.to_string()
    }
}
