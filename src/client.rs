//! Public client surface for the Taggr canister
//!
//! Every read operation is query-then-validate; every mutating operation
//! catches its own errors and folds them into a uniform [`CaptureResult`]
//! so callers never branch on error kinds. The only shared state behind
//! this facade is the lazily built network transport.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, error};

use crate::assets;
use crate::capture;
use crate::codec::{self, PurchaseReply, SubmitReply};
use crate::config::EndpointConfig;
use crate::error::Result;
use crate::query;
use crate::session::SessionManager;
use crate::transport::Transport;
use crate::types::{
    CaptureDescriptor, CaptureResult, CaptureSubmission, Post, PostMeta, TextPost, UserProfile,
};
use crate::update::{self, PollConfig};
use crate::validate;

/// Timeout for bucket asset fetches
const ASSET_TIMEOUT: Duration = Duration::from_secs(30);

/// Content of an archived capture, fetched or mocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureContent {
    pub html: String,
    /// True when the HTML is the deterministic fallback document
    pub mocked: bool,
}

/// Where to resolve a capture descriptor from
pub enum CaptureSource<'a> {
    /// Query the canister for the descriptor of this post
    Id(u64),
    /// Use the post's own file descriptors, no extra query
    Post(&'a Post),
}

impl From<u64> for CaptureSource<'_> {
    fn from(post_id: u64) -> Self {
        CaptureSource::Id(post_id)
    }
}

impl<'a> From<&'a Post> for CaptureSource<'a> {
    fn from(post: &'a Post) -> Self {
        CaptureSource::Post(post)
    }
}

/// Client for the Taggr canister
pub struct TaggrClient {
    config: EndpointConfig,
    sessions: SessionManager,
    poll: PollConfig,
    assets: reqwest::Client,
}

impl TaggrClient {
    /// Create a client for the given endpoint.
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            sessions: SessionManager::new(config.clone()),
            poll: PollConfig::default(),
            assets: reqwest::Client::builder()
                .timeout(ASSET_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            config,
        }
    }

    /// Override the update polling cadence.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Create a client around an existing transport, bypassing transport
    /// construction and trust bootstrap. Test seam.
    pub fn with_transport(config: EndpointConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            sessions: SessionManager::with_transport(config.clone(), transport),
            poll: PollConfig::default(),
            assets: reqwest::Client::builder()
                .timeout(ASSET_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            config,
        }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    // ==================== Read operations ====================

    /// Fetch a page of the personal feed for a domain.
    pub async fn personal_feed(
        &self,
        domain: &str,
        page: u64,
        offset: u64,
    ) -> Result<Vec<(Post, PostMeta)>> {
        let session = self.sessions.session().await?;
        let reply = query::query(
            session.as_ref(),
            "personal_feed",
            &[json!(domain), json!(page), json!(offset)],
        )
        .await?;
        Ok(validate::post_entries(&reply)?)
    }

    /// Fetch a user profile. A `None` handle resolves the caller's own
    /// profile; a `null` reply is a valid "no such user".
    pub async fn user_profile(
        &self,
        domain: &str,
        handle: Option<&str>,
    ) -> Result<Option<UserProfile>> {
        let handle_arg = match handle {
            Some(handle) => json!([handle]),
            None => json!([]),
        };
        let session = self.sessions.session().await?;
        let reply = query::query(session.as_ref(), "user", &[json!(domain), handle_arg]).await?;
        Ok(validate::user_profile(&reply)?)
    }

    /// Fetch a single post with its viewer metadata.
    pub async fn post_summary(&self, post_id: u64) -> Result<Option<(Post, PostMeta)>> {
        let session = self.sessions.session().await?;
        let reply = query::query(session.as_ref(), "posts", &[json!([post_id])]).await?;
        Ok(validate::post_entries(&reply)?.into_iter().next())
    }

    /// Fetch a post's whole thread.
    pub async fn thread(&self, post_id: u64) -> Result<Vec<(Post, PostMeta)>> {
        let session = self.sessions.session().await?;
        let reply = query::query(session.as_ref(), "thread", &[json!(post_id)]).await?;
        Ok(validate::post_entries(&reply)?)
    }

    /// Fetch the capture descriptor for a post, if it has one.
    pub async fn capture_descriptor(&self, post_id: u64) -> Result<Option<CaptureDescriptor>> {
        let session = self.sessions.session().await?;
        let reply = query::query(session.as_ref(), "capture_descriptor", &[json!(post_id)]).await?;
        Ok(validate::capture_descriptor(&reply)?)
    }

    // ==================== Mutating operations ====================

    /// Submit an archived page capture as a new post.
    ///
    /// In fallback mode the submission succeeds as a mocked no-op without
    /// touching the network. An empty snapshot is rejected before anything
    /// is encoded.
    pub async fn submit_capture(&self, submission: CaptureSubmission) -> CaptureResult {
        if self.config.fallback_mode {
            debug!("fallback mode: capture submission mocked");
            return CaptureResult::mocked_ok();
        }
        if submission.html.is_empty() {
            return CaptureResult::failure("content empty");
        }

        match self.submit_capture_inner(&submission).await {
            Ok(result) => result,
            Err(e) => CaptureResult::failure(e.to_string()),
        }
    }

    async fn submit_capture_inner(&self, submission: &CaptureSubmission) -> Result<CaptureResult> {
        let body = capture::format_capture_body(submission);
        let attachments = vec![("capture".to_string(), submission.html.clone().into_bytes())];
        let extension = match submission.visibility {
            Some(visibility) => Some(codec::encode_access_extension(
                visibility,
                submission.price,
            )?),
            None => None,
        };
        let arg = codec::encode_post_args(
            &body,
            attachments,
            None,
            submission.realm.as_deref(),
            extension,
        )?;
        self.submit_post(&arg).await
    }

    /// Submit a plain text post or comment.
    pub async fn submit_text_post(&self, post: TextPost) -> CaptureResult {
        if post.body.is_empty() {
            return CaptureResult::failure("body empty");
        }
        if self.config.fallback_mode {
            debug!("fallback mode: text post mocked");
            return CaptureResult::mocked_ok();
        }

        match self.submit_text_post_inner(&post).await {
            Ok(result) => result,
            Err(e) => CaptureResult::failure(e.to_string()),
        }
    }

    async fn submit_text_post_inner(&self, post: &TextPost) -> Result<CaptureResult> {
        let extension = match post.visibility {
            Some(visibility) => Some(codec::encode_access_extension(visibility, post.price)?),
            None => None,
        };
        let arg = codec::encode_post_args(
            &post.body,
            Vec::new(),
            post.parent,
            post.realm.as_deref(),
            extension,
        )?;
        self.submit_post(&arg).await
    }

    async fn submit_post(&self, arg: &[u8]) -> Result<CaptureResult> {
        let session = self.sessions.session().await?;
        let reply = update::update(session.as_ref(), &self.poll, "add_post", arg).await?;
        if reply.is_empty() {
            // Certified but no payload left: the post exists, id unknown.
            return Ok(CaptureResult::ok(None));
        }
        match codec::decode_submit_reply("add_post", &reply)? {
            SubmitReply::Ok(post_id) => Ok(CaptureResult::ok(Some(post_id))),
            SubmitReply::Err(message) => Ok(CaptureResult::failure(message)),
        }
    }

    /// Purchase access to a paid post.
    ///
    /// Unlike submissions, purchases cannot be meaningfully mocked: in
    /// fallback mode they fail immediately instead of pretending to spend
    /// credits.
    pub async fn purchase_post(&self, post_id: u64) -> CaptureResult {
        if self.config.fallback_mode {
            return CaptureResult::mocked_failure(
                "purchases unavailable without a configured endpoint",
            );
        }

        match self.purchase_post_inner(post_id).await {
            Ok(result) => result,
            Err(e) => CaptureResult::failure(e.to_string()),
        }
    }

    async fn purchase_post_inner(&self, post_id: u64) -> Result<CaptureResult> {
        let arg = codec::encode_purchase_args(post_id)?;
        let session = self.sessions.session().await?;
        let reply = update::update(session.as_ref(), &self.poll, "purchase_post", &arg).await?;
        if reply.is_empty() {
            return Ok(CaptureResult::ok(Some(post_id)));
        }
        match codec::decode_purchase_reply("purchase_post", &reply)? {
            PurchaseReply::Ok => Ok(CaptureResult::ok(Some(post_id))),
            PurchaseReply::Err(message) => Ok(CaptureResult::failure(message)),
        }
    }

    // ==================== Capture content ====================

    /// Fetch the archived HTML of a capture.
    ///
    /// The descriptor comes from the supplied post's files or, given only an
    /// id, from the canister. Whenever the capture cannot be resolved or
    /// fetched (no descriptor, non-2xx status, transport failure) the
    /// deterministic fallback document is returned with `mocked = true`;
    /// errors are logged here, never propagated.
    pub async fn capture_content<'a>(
        &self,
        source: impl Into<CaptureSource<'a>>,
    ) -> CaptureContent {
        let source = source.into();
        let post_id = match &source {
            CaptureSource::Id(post_id) => *post_id,
            CaptureSource::Post(post) => post.id,
        };

        let descriptor = match source {
            CaptureSource::Post(post) => post.capture_descriptor(),
            CaptureSource::Id(post_id) => match self.capture_descriptor(post_id).await {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    error!(post_id, error = %e, "capture descriptor lookup failed");
                    None
                }
            },
        };

        let Some(descriptor) = descriptor else {
            return CaptureContent {
                html: capture::fallback_capture_html(post_id),
                mocked: true,
            };
        };

        let url = assets::build_asset_url(
            &self.config,
            &descriptor.bucket_id,
            descriptor.offset,
            descriptor.len,
        );
        match assets::fetch_asset_text(&self.assets, &url).await {
            Ok(html) => CaptureContent { html, mocked: false },
            Err(e) => {
                error!(post_id, error = %e, "capture fetch failed");
                CaptureContent {
                    html: capture::fallback_capture_html(post_id),
                    mocked: true,
                }
            }
        }
    }
}
