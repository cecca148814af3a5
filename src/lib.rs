//! Rust client for the Taggr canister
//!
//! Taggr serves two kinds of calls: low-latency read-only queries with
//! JSON-shaped replies, and state-mutating updates whose Candid-encoded
//! results only exist after the network certifies them. This crate wraps
//! both behind a typed surface: untyped replies are validated into domain
//! records before anything else sees them, and mutations return one uniform
//! result shape regardless of how they failed.
//!
//! # Example
//!
//! ```rust,no_run
//! use taggr_client::{EndpointConfig, TaggrClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TaggrClient::new(EndpointConfig::from_env());
//!
//! let feed = client.personal_feed("taggr", 0, 0).await?;
//! for (post, meta) in &feed {
//!     println!("#{} by {}", post.id, meta.author_name);
//! }
//!
//! if let Some((post, _)) = client.post_summary(42).await? {
//!     let content = client.capture_content(&post).await;
//!     println!("mocked: {}", content.mocked);
//! }
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod capture;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod query;
pub mod session;
pub mod transport;
pub mod types;
pub mod update;
pub mod validate;

pub use capture::{parse_capture_metadata, CaptureMetadata};
pub use client::{CaptureContent, CaptureSource, TaggrClient};
pub use config::{taggr_domain, EndpointConfig};
pub use error::{Result, TaggrError, ValidationError};
pub use session::SessionManager;
pub use types::{
    AccessControl, CaptureDescriptor, CaptureResult, CaptureSubmission, Notification,
    NotificationPayload, Post, PostMeta, TextPost, UserFilter, UserProfile, Visibility,
};
pub use update::PollConfig;
