//! Candid codec for mutating calls
//!
//! Update arguments use the canonical interface encoding shared with the
//! canister: post creation always sends the 5-tuple
//! `(text, vec (text, blob), opt nat64, opt text, opt blob)` and decodes a
//! tagged `Ok/Err` result; purchases send a single `nat64`.

use candid::{CandidType, Decode, Encode};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Result, TaggrError};
use crate::types::Visibility;

/// Named binary attachment sent with a post
pub type Attachment = (String, Vec<u8>);

/// Encode the argument tuple for `add_post`.
pub fn encode_post_args(
    body: &str,
    attachments: Vec<Attachment>,
    parent: Option<u64>,
    realm: Option<&str>,
    extension: Option<Vec<u8>>,
) -> Result<Vec<u8>> {
    let realm = realm.map(|r| r.to_string());
    Encode!(&body, &attachments, &parent, &realm, &extension)
        .map_err(|e| TaggrError::protocol("add_post", format!("argument encoding failed: {e}")))
}

/// Encode the argument for `purchase_post`.
pub fn encode_purchase_args(post_id: u64) -> Result<Vec<u8>> {
    Encode!(&post_id).map_err(|e| {
        TaggrError::protocol("purchase_post", format!("argument encoding failed: {e}"))
    })
}

/// Tagged result of the post-creation calls
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub enum SubmitReply {
    Ok(u64),
    Err(String),
}

/// Tagged result of `purchase_post`
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub enum PurchaseReply {
    Ok,
    Err(String),
}

/// Decode the reply of a post-creation call.
pub fn decode_submit_reply(method: &str, bytes: &[u8]) -> Result<SubmitReply> {
    Decode!(bytes, SubmitReply)
        .map_err(|e| TaggrError::protocol(method, format!("undecodable reply: {e}")))
}

/// Decode the reply of a purchase call.
pub fn decode_purchase_reply(method: &str, bytes: &[u8]) -> Result<PurchaseReply> {
    Decode!(bytes, PurchaseReply)
        .map_err(|e| TaggrError::protocol(method, format!("undecodable reply: {e}")))
}

/// Encode the access-control extension blob attached to restricted posts.
///
/// The blob is opaque to the call tuple; the canister interprets it as a
/// JSON object.
pub fn encode_access_extension(visibility: Visibility, price: Option<u64>) -> Result<Vec<u8>> {
    let value = match price {
        Some(price) => json!({ "visibility": visibility, "price": price }),
        None => json!({ "visibility": visibility }),
    };
    serde_json::to_vec(&value)
        .map_err(|e| TaggrError::protocol("add_post", format!("extension encoding failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_reply_decodes_ok() {
        let bytes = Encode!(&SubmitReply::Ok(42)).unwrap();
        assert_eq!(
            decode_submit_reply("add_post", &bytes).unwrap(),
            SubmitReply::Ok(42)
        );
    }

    #[test]
    fn test_submit_reply_decodes_err() {
        let bytes = Encode!(&SubmitReply::Err("blocked".to_string())).unwrap();
        assert_eq!(
            decode_submit_reply("add_post", &bytes).unwrap(),
            SubmitReply::Err("blocked".to_string())
        );
    }

    #[test]
    fn test_submit_reply_rejects_garbage() {
        assert!(decode_submit_reply("add_post", b"not candid").is_err());
    }

    #[test]
    fn test_purchase_reply_decodes_unit_ok() {
        let bytes = Encode!(&PurchaseReply::Ok).unwrap();
        assert_eq!(
            decode_purchase_reply("purchase_post", &bytes).unwrap(),
            PurchaseReply::Ok
        );
    }

    #[test]
    fn test_post_args_encode_round_trips() {
        let bytes = encode_post_args(
            "Captured URL: https://e.example/a",
            vec![("capture".to_string(), b"<p>x</p>".to_vec())],
            None,
            Some("gyotaku"),
            None,
        )
        .unwrap();

        let (body, attachments, parent, realm, extension) = candid::decode_args::<(
            String,
            Vec<Attachment>,
            Option<u64>,
            Option<String>,
            Option<Vec<u8>>,
        )>(&bytes)
        .unwrap();
        assert_eq!(body, "Captured URL: https://e.example/a");
        assert_eq!(attachments[0].0, "capture");
        assert_eq!(attachments[0].1, b"<p>x</p>");
        assert_eq!(parent, None);
        assert_eq!(realm.as_deref(), Some("gyotaku"));
        assert_eq!(extension, None);
    }

    #[test]
    fn test_access_extension_shape() {
        let bytes = encode_access_extension(Visibility::Paid, Some(25)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["visibility"], "paid");
        assert_eq!(value["price"], 25);

        let bytes = encode_access_extension(Visibility::FollowersOnly, None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["visibility"], "followers_only");
        assert!(value.get("price").is_none());
    }
}
