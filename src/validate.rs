//! Response validators for untyped canister replies
//!
//! Query replies are JSON with no schema guarantee. Every validator here is
//! a total function from an untyped value to either a fully populated domain
//! record or a field-qualified [`ValidationError`]; nothing is silently
//! coerced and partial records are never produced. Keys the client does not
//! recognize are carried through verbatim in `extension` so newer canister
//! versions keep working.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::types::{
    AccessControl, CaptureDescriptor, ExtensionFields, Notification, NotificationPayload, Post,
    PostMeta, UserFilter, UserProfile, Visibility,
};

type Result<T> = std::result::Result<T, ValidationError>;

const POST_KEYS: &[&str] = &[
    "id", "body", "user", "tags", "realm", "timestamp", "files", "access",
];
const META_KEYS: &[&str] = &[
    "author_name",
    "author_filters",
    "viewer_blocked",
    "realm_color",
    "nsfw",
    "max_downvotes_reached",
    "visibility",
    "price",
    "viewer_can_view",
    "viewer_has_purchased",
];
const PROFILE_KEYS: &[&str] = &["id", "name", "about", "notifications"];

/// Validate a post record.
pub fn post(value: &Value) -> Result<Post> {
    let map = as_object(value, "post")?;

    let id = req_u64(map, "id", "post.id")?;
    let body = req_string(map, "body", "post.body")?;
    let author = req_u64(map, "user", "post.user")?;
    let tags = req_string_set(map, "tags", "post.tags")?;
    let realm = opt_string(map, "realm", "post.realm")?;
    let timestamp = opt_u64(map, "timestamp", "post.timestamp")?;
    let files = file_descriptors(map.get("files"))?;
    let access = match map.get("access") {
        None | Some(Value::Null) => None,
        Some(value) => Some(access_control(value)?),
    };

    Ok(Post {
        id,
        body,
        author,
        tags,
        realm,
        timestamp,
        files,
        access,
        extension: extension_fields(map, POST_KEYS),
    })
}

/// Validate the viewer-dependent metadata served alongside a post.
pub fn post_meta(value: &Value) -> Result<PostMeta> {
    let map = as_object(value, "meta")?;

    let author_name = req_string(map, "author_name", "meta.author_name")?;
    let author_filters = user_filter(
        map.get("author_filters")
            .unwrap_or(&Value::Null),
    )?;
    let viewer_blocked = req_bool(map, "viewer_blocked", "meta.viewer_blocked")?;
    let realm_color = opt_string(map, "realm_color", "meta.realm_color")?;
    let nsfw = req_bool(map, "nsfw", "meta.nsfw")?;
    let max_downvotes_reached = req_bool(map, "max_downvotes_reached", "meta.max_downvotes_reached")?;
    let visibility = match map.get("visibility") {
        None | Some(Value::Null) => None,
        Some(value) => Some(visibility(value, "meta.visibility")?),
    };
    let price = opt_u64(map, "price", "meta.price")?;
    let viewer_can_view = opt_bool(map, "viewer_can_view", "meta.viewer_can_view")?;
    let viewer_has_purchased = opt_bool(map, "viewer_has_purchased", "meta.viewer_has_purchased")?;

    Ok(PostMeta {
        author_name,
        author_filters,
        viewer_blocked,
        realm_color,
        nsfw,
        max_downvotes_reached,
        visibility,
        price,
        viewer_can_view,
        viewer_has_purchased,
        extension: extension_fields(map, META_KEYS),
    })
}

/// Validate the author moderation filters.
///
/// The canister omits filter fields that are zero/false; absent fields
/// default, present fields must have the right kind.
pub fn user_filter(value: &Value) -> Result<UserFilter> {
    let map = as_object(value, "author_filters")?;

    Ok(UserFilter {
        age_days: opt_u64(map, "age_days", "author_filters.age_days")?.unwrap_or(0),
        safe: opt_bool(map, "safe", "author_filters.safe")?.unwrap_or(false),
        balance: opt_u64(map, "balance", "author_filters.balance")?.unwrap_or(0),
        num_followers: opt_u64(map, "num_followers", "author_filters.num_followers")?.unwrap_or(0),
    })
}

/// Validate an access control record.
pub fn access_control(value: &Value) -> Result<AccessControl> {
    let map = as_object(value, "access")?;
    let visibility = visibility(
        map.get("visibility").unwrap_or(&Value::Null),
        "access.visibility",
    )?;
    let price = opt_u64(map, "price", "access.price")?;
    Ok(AccessControl { visibility, price })
}

fn visibility(value: &Value, field: &str) -> Result<Visibility> {
    let tag = value
        .as_str()
        .ok_or_else(|| ValidationError::new(field, "expected a string"))?;
    Visibility::parse_tag(tag)
        .ok_or_else(|| ValidationError::new(field, format!("unknown visibility {tag:?}")))
}

/// Validate a reply that is a JSON array of `[post, meta]` pairs.
///
/// One malformed pair fails the whole batch; partial batches are never
/// returned.
pub fn post_entries(value: &Value) -> Result<Vec<(Post, PostMeta)>> {
    let entries = value
        .as_array()
        .ok_or_else(|| ValidationError::new("posts", "expected an array"))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| post_entry(entry, index))
        .collect()
}

fn post_entry(value: &Value, index: usize) -> Result<(Post, PostMeta)> {
    let pair = value
        .as_array()
        .filter(|pair| pair.len() == 2)
        .ok_or_else(|| {
            ValidationError::new(format!("posts[{index}]"), "expected a [post, meta] pair")
        })?;
    Ok((post(&pair[0])?, post_meta(&pair[1])?))
}

/// Validate a user profile reply. A `null` reply is a valid "no such user".
pub fn user_profile(value: &Value) -> Result<Option<UserProfile>> {
    if value.is_null() {
        return Ok(None);
    }
    let map = as_object(value, "user")?;

    let id = req_u64(map, "id", "user.id")?;
    let name = req_string(map, "name", "user.name")?;
    let about = req_string(map, "about", "user.about")?;
    let notifications = notifications(map.get("notifications"))?;

    Ok(Some(UserProfile {
        id,
        name,
        about,
        notifications,
        extension: extension_fields(map, PROFILE_KEYS),
    }))
}

/// Validate the notifications object: decimal-string ids mapping to
/// `[payload, read]` pairs. A missing or non-object value yields an empty
/// inbox; inside the object, every entry must be well-formed.
fn notifications(value: Option<&Value>) -> Result<Vec<Notification>> {
    let map = match value.and_then(Value::as_object) {
        Some(map) => map,
        None => return Ok(Vec::new()),
    };

    let mut notifications = Vec::with_capacity(map.len());
    for (key, entry) in map {
        let id: u64 = key.parse().map_err(|_| {
            ValidationError::new(
                format!("notifications.{key}"),
                "notification id is not numeric",
            )
        })?;
        let pair = entry
            .as_array()
            .filter(|pair| pair.len() == 2)
            .ok_or_else(|| {
                ValidationError::new(
                    format!("notifications.{key}"),
                    "expected a [payload, read] pair",
                )
            })?;

        let payload = match &pair[0] {
            Value::Null => NotificationPayload::Data(Map::new()),
            Value::String(text) => NotificationPayload::Text(text.clone()),
            Value::Object(data) => NotificationPayload::Data(data.clone()),
            _ => {
                return Err(ValidationError::new(
                    format!("notifications.{key}.payload"),
                    "expected a string or object",
                ))
            }
        };
        let read = pair[1].as_bool().ok_or_else(|| {
            ValidationError::new(format!("notifications.{key}.read"), "expected a boolean")
        })?;

        notifications.push(Notification { id, payload, read });
    }

    notifications.sort_by_key(|n| n.id);
    Ok(notifications)
}

/// Validate a capture descriptor reply. A `null` reply means the post has
/// no archived capture.
pub fn capture_descriptor(value: &Value) -> Result<Option<CaptureDescriptor>> {
    if value.is_null() {
        return Ok(None);
    }
    let map = as_object(value, "descriptor")?;

    Ok(Some(CaptureDescriptor {
        post_id: req_u64(map, "post_id", "descriptor.post_id")?,
        bucket_id: req_string(map, "bucket_id", "descriptor.bucket_id")?,
        offset: req_u64(map, "offset", "descriptor.offset")?,
        len: req_u64(map, "len", "descriptor.len")?,
    }))
}

fn file_descriptors(value: Option<&Value>) -> Result<BTreeMap<String, (u64, u64)>> {
    let map = match value {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(value) => as_object(value, "post.files")?,
    };

    let mut files = BTreeMap::new();
    for (key, entry) in map {
        let field = format!("post.files.{key}");
        let pair = entry
            .as_array()
            .filter(|pair| pair.len() == 2)
            .ok_or_else(|| ValidationError::new(&field, "expected an [offset, len] pair"))?;
        let offset = pair[0]
            .as_u64()
            .ok_or_else(|| ValidationError::new(&field, "offset is not a finite number"))?;
        let len = pair[1]
            .as_u64()
            .ok_or_else(|| ValidationError::new(&field, "len is not a finite number"))?;
        files.insert(key.clone(), (offset, len));
    }
    Ok(files)
}

// =============================================================================
// Field helpers
// =============================================================================

fn as_object<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(field, "expected an object"))
}

fn req_u64(map: &Map<String, Value>, key: &str, field: &str) -> Result<u64> {
    map.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| ValidationError::new(field, "expected a finite non-negative number"))
}

fn req_string(map: &Map<String, Value>, key: &str, field: &str) -> Result<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::new(field, "expected a string"))
}

fn req_bool(map: &Map<String, Value>, key: &str, field: &str) -> Result<bool> {
    map.get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| ValidationError::new(field, "expected a boolean"))
}

fn req_string_set(map: &Map<String, Value>, key: &str, field: &str) -> Result<BTreeSet<String>> {
    let entries = map
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ValidationError::new(field, "expected an array of strings"))?;

    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ValidationError::new(field, "expected an array of strings"))
        })
        .collect()
}

fn opt_u64(map: &Map<String, Value>, key: &str, field: &str) -> Result<Option<u64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| ValidationError::new(field, "expected a finite non-negative number")),
    }
}

fn opt_string(map: &Map<String, Value>, key: &str, field: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ValidationError::new(field, "expected a string")),
    }
}

fn opt_bool(map: &Map<String, Value>, key: &str, field: &str) -> Result<Option<bool>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| ValidationError::new(field, "expected a boolean")),
    }
}

/// Copy every key the validator did not consume, verbatim.
fn extension_fields(map: &Map<String, Value>, known: &[&str]) -> ExtensionFields {
    map.iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
