//! Domain records produced by the response validators
//!
//! All of these are transient value objects: built fresh from a single
//! canister reply, handed to the caller, and discarded. None of them hold
//! references into shared state, so they are safe to move across tasks.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unknown remote keys carried through validation verbatim.
///
/// Preserved for forward compatibility with canister upgrades; the client
/// never inspects them.
pub type ExtensionFields = Map<String, Value>;

/// Post visibility, as stored in the canister's access control record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Draft,
    Public,
    FollowersOnly,
    Paid,
}

impl Visibility {
    /// Wire tag as it appears in canister replies
    pub fn as_tag(&self) -> &'static str {
        match self {
            Visibility::Draft => "draft",
            Visibility::Public => "public",
            Visibility::FollowersOnly => "followers_only",
            Visibility::Paid => "paid",
        }
    }

    /// Parse a wire tag. Exactly the four known tags are accepted.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag {
            "draft" => Some(Visibility::Draft),
            "public" => Some(Visibility::Public),
            "followers_only" => Some(Visibility::FollowersOnly),
            "paid" => Some(Visibility::Paid),
            _ => None,
        }
    }

    /// Caller policy for posts without an access control record.
    ///
    /// Validation never applies this default; consumers that need a
    /// visibility for a post with `access: None` use this single definition
    /// instead of re-deriving it ad hoc.
    pub fn default_for_missing() -> Self {
        Visibility::Public
    }
}

/// Access control attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessControl {
    pub visibility: Visibility,
    /// Price in credits, present for paid posts
    pub price: Option<u64>,
}

/// A Taggr post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: u64,
    pub body: String,
    /// Numeric id of the authoring user
    pub author: u64,
    pub tags: BTreeSet<String>,
    pub realm: Option<String>,
    /// Creation time in nanoseconds since the epoch
    pub timestamp: Option<u64>,
    /// Attached files keyed `<name>@<bucket>`, valued `(offset, len)`
    pub files: BTreeMap<String, (u64, u64)>,
    pub access: Option<AccessControl>,
    pub extension: ExtensionFields,
}

impl Post {
    /// Visibility of this post, applying the caller policy for posts
    /// without an access control record.
    pub fn effective_visibility(&self) -> Visibility {
        self.access
            .as_ref()
            .map(|access| access.visibility)
            .unwrap_or_else(Visibility::default_for_missing)
    }

    /// Resolve the capture attachment descriptor from this post's files.
    ///
    /// Keys are formatted `capture@<bucket>`; the first lexical match wins.
    pub fn capture_descriptor(&self) -> Option<CaptureDescriptor> {
        for (key, (offset, len)) in &self.files {
            if let Some(bucket_id) = key.strip_prefix("capture@") {
                if bucket_id.is_empty() {
                    continue;
                }
                return Some(CaptureDescriptor {
                    post_id: self.id,
                    bucket_id: bucket_id.to_string(),
                    offset: *offset,
                    len: *len,
                });
            }
        }
        None
    }
}

/// Moderation filters of a post's author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserFilter {
    pub age_days: u64,
    pub safe: bool,
    pub balance: u64,
    pub num_followers: u64,
}

/// Viewer-dependent metadata served alongside a post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostMeta {
    pub author_name: String,
    pub author_filters: UserFilter,
    pub viewer_blocked: bool,
    pub realm_color: Option<String>,
    pub nsfw: bool,
    pub max_downvotes_reached: bool,
    pub visibility: Option<Visibility>,
    pub price: Option<u64>,
    pub viewer_can_view: Option<bool>,
    pub viewer_has_purchased: Option<bool>,
    pub extension: ExtensionFields,
}

/// Payload of an inbox notification: plain text or a structured record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NotificationPayload {
    Text(String),
    Data(Map<String, Value>),
}

/// Inbox notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub payload: NotificationPayload,
    pub read: bool,
}

/// A Taggr user profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub about: String,
    /// Inbox notifications ordered by id
    pub notifications: Vec<Notification>,
    pub extension: ExtensionFields,
}

/// Location of an archived capture inside a storage bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureDescriptor {
    pub post_id: u64,
    pub bucket_id: String,
    pub offset: u64,
    pub len: u64,
}

/// Outcome of a mutating operation, uniform across capture submission,
/// text posts, and purchases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureResult {
    pub success: bool,
    /// Id of the created post when the canister reported one
    pub post_id: Option<u64>,
    pub error: Option<String>,
    /// True when the result was produced without a network call
    pub mocked: bool,
}

impl CaptureResult {
    pub(crate) fn ok(post_id: Option<u64>) -> Self {
        Self {
            success: true,
            post_id,
            error: None,
            mocked: false,
        }
    }

    pub(crate) fn mocked_ok() -> Self {
        Self {
            success: true,
            post_id: None,
            error: None,
            mocked: true,
        }
    }

    pub(crate) fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            post_id: None,
            error: Some(message.into()),
            mocked: false,
        }
    }

    pub(crate) fn mocked_failure(message: impl Into<String>) -> Self {
        Self {
            mocked: true,
            ..Self::failure(message)
        }
    }
}

/// Input for submitting an archived page capture
#[derive(Debug, Clone, Default)]
pub struct CaptureSubmission {
    /// Source URL of the captured page
    pub url: String,
    pub notes: Option<String>,
    pub realm: Option<String>,
    /// Pre-sanitized HTML snapshot; submitted verbatim as an attachment
    pub html: String,
    /// Capture time, RFC 3339
    pub captured_at: Option<String>,
    /// Content hash of the snapshot, as produced by the capturing tool
    pub content_hash: Option<String>,
    pub visibility: Option<Visibility>,
    /// Price in credits; only meaningful with `Visibility::Paid`
    pub price: Option<u64>,
}

/// Input for submitting a plain text post or comment
#[derive(Debug, Clone, Default)]
pub struct TextPost {
    pub body: String,
    pub realm: Option<String>,
    /// Parent post id when the post is a comment in a thread
    pub parent: Option<u64>,
    pub visibility: Option<Visibility>,
    pub price: Option<u64>,
}
