//! Wire envelopes for the network's HTTP interface
//!
//! Builds CBOR call envelopes, derives request ids with the
//! representation-independent hash, and reads certified state out of the
//! hash tree carried by read-state replies.
//!
//! Envelope format: `{ content: { request_type, sender, canister_id,
//! method_name, arg, ingress_expiry, nonce } }`, CBOR-encoded with the
//! self-describing tag. Calls are anonymous; no signature fields are
//! attached.

use std::collections::BTreeMap;

use candid::Principal;
use serde::Serialize;
use serde_cbor::Value;
use sha2::{Digest, Sha256};

use super::{CallStatus, QueryResponse, RequestId, Result, TransportError};

// =============================================================================
// Envelope construction
// =============================================================================

/// Build the envelope for a read-only call.
pub(crate) fn encode_query(
    canister: &Principal,
    method: &str,
    arg: &[u8],
    ingress_expiry: u64,
    nonce: &[u8],
) -> Result<Vec<u8>> {
    let content = call_content("query", canister, method, arg, ingress_expiry, nonce);
    to_cbor(&wrap(content))
}

/// Build the envelope for a mutating call, together with its request id.
pub(crate) fn encode_call(
    canister: &Principal,
    method: &str,
    arg: &[u8],
    ingress_expiry: u64,
    nonce: &[u8],
) -> Result<(Vec<u8>, RequestId)> {
    let request_id = request_id(&[
        ("request_type", Raw::Text("call")),
        ("canister_id", Raw::Blob(canister.as_slice())),
        ("method_name", Raw::Text(method)),
        ("arg", Raw::Blob(arg)),
        ("sender", Raw::Blob(Principal::anonymous().as_slice())),
        ("ingress_expiry", Raw::Nat(ingress_expiry)),
        ("nonce", Raw::Blob(nonce)),
    ]);
    let content = call_content("call", canister, method, arg, ingress_expiry, nonce);
    Ok((to_cbor(&wrap(content))?, request_id))
}

/// Build the envelope asking for the status of a submitted call.
pub(crate) fn encode_read_state(request_id: &RequestId, ingress_expiry: u64) -> Result<Vec<u8>> {
    let path = Value::Array(vec![
        Value::Bytes(b"request_status".to_vec()),
        Value::Bytes(request_id.0.to_vec()),
    ]);
    let mut content = BTreeMap::new();
    insert_text(&mut content, "request_type", "read_state");
    insert_bytes(&mut content, "sender", Principal::anonymous().as_slice());
    content.insert(
        Value::Text("paths".to_string()),
        Value::Array(vec![path]),
    );
    content.insert(
        Value::Text("ingress_expiry".to_string()),
        Value::Integer(ingress_expiry as i128),
    );
    to_cbor(&wrap(Value::Map(content)))
}

fn call_content(
    request_type: &str,
    canister: &Principal,
    method: &str,
    arg: &[u8],
    ingress_expiry: u64,
    nonce: &[u8],
) -> Value {
    let mut content = BTreeMap::new();
    insert_text(&mut content, "request_type", request_type);
    insert_bytes(&mut content, "canister_id", canister.as_slice());
    insert_text(&mut content, "method_name", method);
    insert_bytes(&mut content, "arg", arg);
    insert_bytes(&mut content, "sender", Principal::anonymous().as_slice());
    content.insert(
        Value::Text("ingress_expiry".to_string()),
        Value::Integer(ingress_expiry as i128),
    );
    insert_bytes(&mut content, "nonce", nonce);
    Value::Map(content)
}

fn wrap(content: Value) -> Value {
    let mut envelope = BTreeMap::new();
    envelope.insert(Value::Text("content".to_string()), content);
    Value::Map(envelope)
}

fn insert_text(map: &mut BTreeMap<Value, Value>, key: &str, value: &str) {
    map.insert(Value::Text(key.to_string()), Value::Text(value.to_string()));
}

fn insert_bytes(map: &mut BTreeMap<Value, Value>, key: &str, value: &[u8]) {
    map.insert(Value::Text(key.to_string()), Value::Bytes(value.to_vec()));
}

/// Serialize as self-describing CBOR, the format the network expects.
fn to_cbor(value: &Value) -> Result<Vec<u8>> {
    let mut serializer = serde_cbor::ser::Serializer::new(Vec::new());
    serializer
        .self_describe()
        .map_err(|e| TransportError::Envelope(format!("tagging failed: {e}")))?;
    value
        .serialize(&mut serializer)
        .map_err(|e| TransportError::Envelope(format!("failed to encode envelope: {e}")))?;
    Ok(serializer.into_inner())
}

// =============================================================================
// Request ids (representation-independent hashing)
// =============================================================================

/// Hashable raw representation of a content field value
pub(crate) enum Raw<'a> {
    Blob(&'a [u8]),
    Text(&'a str),
    Nat(u64),
}

/// Derive the request id of a content map.
///
/// Each field contributes `sha256(key) || sha256(representation(value))`;
/// pairs are sorted and the concatenation hashed once more.
pub(crate) fn request_id(fields: &[(&str, Raw<'_>)]) -> RequestId {
    let mut pairs: Vec<([u8; 32], [u8; 32])> = fields
        .iter()
        .map(|(key, value)| (sha256(key.as_bytes()), hash_raw(value)))
        .collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    for (key_hash, value_hash) in pairs {
        hasher.update(key_hash);
        hasher.update(value_hash);
    }
    RequestId(hasher.finalize().into())
}

fn hash_raw(value: &Raw<'_>) -> [u8; 32] {
    match value {
        Raw::Blob(bytes) => sha256(bytes),
        Raw::Text(text) => sha256(text.as_bytes()),
        Raw::Nat(n) => sha256(&leb128(*n)),
    }
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Unsigned LEB128 encoding
fn leb128(mut n: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (n & 0x7f) as u8;
        n >>= 7;
        if n == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn decode_leb128(bytes: &[u8]) -> Option<u64> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for byte in bytes {
        value |= u64::from(byte & 0x7f).checked_shl(shift)?;
        if byte & 0x80 == 0 {
            return Some(value);
        }
        shift += 7;
    }
    None
}

// =============================================================================
// Reply parsing
// =============================================================================

/// Parse the body of a query call reply.
pub(crate) fn parse_query_response(bytes: &[u8]) -> Result<QueryResponse> {
    let value: Value = serde_cbor::from_slice(bytes)
        .map_err(|e| TransportError::Envelope(format!("failed to decode query reply: {e}")))?;
    let map = as_map(&value, "query reply")?;

    match get_text(map, "status") {
        Some("replied") => {
            let reply = get_field(map, "reply")
                .ok_or_else(|| TransportError::Envelope("query reply missing reply".into()))?;
            let reply_map = as_map(reply, "query reply.reply")?;
            match get_field(reply_map, "arg") {
                Some(Value::Bytes(arg)) => Ok(QueryResponse::Replied { arg: arg.clone() }),
                _ => Err(TransportError::Envelope("query reply missing arg".into())),
            }
        }
        Some("rejected") => Ok(QueryResponse::Rejected {
            code: get_u64(map, "reject_code").unwrap_or(0),
            message: get_text(map, "reject_message")
                .unwrap_or("unknown rejection")
                .to_string(),
        }),
        other => Err(TransportError::Envelope(format!(
            "unexpected query status: {other:?}"
        ))),
    }
}

/// Parse a read-state reply into the status of the given request.
///
/// The reply carries a certificate whose hash tree holds the request status
/// under `request_status/<id>/...`. The tree is read as certified data; an
/// absent status path means the network does not know the request yet.
pub(crate) fn parse_request_status(bytes: &[u8], request_id: &RequestId) -> Result<CallStatus> {
    let value: Value = serde_cbor::from_slice(bytes)
        .map_err(|e| TransportError::Envelope(format!("failed to decode read_state reply: {e}")))?;
    let map = as_map(&value, "read_state reply")?;
    let certificate = match get_field(map, "certificate") {
        Some(Value::Bytes(bytes)) => bytes,
        _ => return Err(TransportError::Envelope("reply missing certificate".into())),
    };

    let certificate: Value = serde_cbor::from_slice(certificate)
        .map_err(|e| TransportError::Envelope(format!("failed to decode certificate: {e}")))?;
    let tree = get_field(as_map(&certificate, "certificate")?, "tree")
        .ok_or_else(|| TransportError::Envelope("certificate missing tree".into()))?;

    let status_path: &[&[u8]] = &[b"request_status", &request_id.0, b"status"];
    let status = match lookup_path(tree, status_path) {
        Some(bytes) => std::str::from_utf8(bytes)
            .map_err(|_| TransportError::Envelope("status is not utf-8".into()))?,
        None => return Ok(CallStatus::Unknown),
    };

    match status {
        "received" => Ok(CallStatus::Received),
        "processing" => Ok(CallStatus::Processing),
        "replied" => {
            let reply_path: &[&[u8]] = &[b"request_status", &request_id.0, b"reply"];
            let arg = lookup_path(tree, reply_path)
                .ok_or_else(|| TransportError::Envelope("replied status missing reply".into()))?;
            Ok(CallStatus::Replied { arg: arg.to_vec() })
        }
        "rejected" => {
            let code_path: &[&[u8]] = &[b"request_status", &request_id.0, b"reject_code"];
            let message_path: &[&[u8]] = &[b"request_status", &request_id.0, b"reject_message"];
            let code = lookup_path(tree, code_path)
                .and_then(decode_leb128)
                .unwrap_or(0);
            let message = lookup_path(tree, message_path)
                .and_then(|bytes| std::str::from_utf8(bytes).ok())
                .unwrap_or("unknown rejection")
                .to_string();
            Ok(CallStatus::Rejected { code, message })
        }
        "done" => Ok(CallStatus::Done),
        other => Err(TransportError::Envelope(format!(
            "unexpected request status: {other}"
        ))),
    }
}

/// Extract the network root key from a status endpoint reply.
pub(crate) fn parse_root_key(bytes: &[u8]) -> Result<Vec<u8>> {
    let value: Value = serde_cbor::from_slice(bytes)
        .map_err(|e| TransportError::Envelope(format!("failed to decode status reply: {e}")))?;
    match get_field(as_map(&value, "status reply")?, "root_key") {
        Some(Value::Bytes(key)) => Ok(key.clone()),
        _ => Err(TransportError::Envelope(
            "status reply missing root_key".into(),
        )),
    }
}

// =============================================================================
// Hash tree lookup
// =============================================================================

// Tree nodes are tagged arrays: [0] empty, [1, l, r] fork,
// [2, label, subtree] labeled, [3, leaf] leaf, [4, hash] pruned.

fn lookup_path<'a>(tree: &'a Value, path: &[&[u8]]) -> Option<&'a [u8]> {
    match path.split_first() {
        None => match node_tag(tree)? {
            (3, items) => match &items[1] {
                Value::Bytes(leaf) => Some(leaf),
                _ => None,
            },
            _ => None,
        },
        Some((label, rest)) => lookup_label(tree, label).and_then(|sub| lookup_path(sub, rest)),
    }
}

fn lookup_label<'a>(tree: &'a Value, label: &[u8]) -> Option<&'a Value> {
    match node_tag(tree)? {
        (1, items) => {
            lookup_label(&items[1], label).or_else(|| lookup_label(&items[2], label))
        }
        (2, items) => match &items[1] {
            Value::Bytes(node_label) if node_label.as_slice() == label => Some(&items[2]),
            _ => None,
        },
        _ => None,
    }
}

fn node_tag(tree: &Value) -> Option<(i128, &Vec<Value>)> {
    let items = match tree {
        Value::Array(items) => items,
        _ => return None,
    };
    let tag = match items.first() {
        Some(Value::Integer(tag)) => *tag,
        _ => return None,
    };
    let arity = match tag {
        0 => 1,
        1 | 2 => 3,
        3 | 4 => 2,
        _ => return None,
    };
    if items.len() != arity {
        return None;
    }
    Some((tag, items))
}

// =============================================================================
// Untyped map helpers
// =============================================================================

fn as_map<'a>(value: &'a Value, what: &str) -> Result<&'a BTreeMap<Value, Value>> {
    match value {
        Value::Map(map) => Ok(map),
        _ => Err(TransportError::Envelope(format!("{what} is not a map"))),
    }
}

fn get_field<'a>(map: &'a BTreeMap<Value, Value>, key: &str) -> Option<&'a Value> {
    map.get(&Value::Text(key.to_string()))
}

fn get_text<'a>(map: &'a BTreeMap<Value, Value>, key: &str) -> Option<&'a str> {
    match get_field(map, key) {
        Some(Value::Text(text)) => Some(text),
        _ => None,
    }
}

fn get_u64(map: &BTreeMap<Value, Value>, key: &str) -> Option<u64> {
    match get_field(map, key) {
        Some(Value::Integer(n)) => u64::try_from(*n).ok(),
        _ => None,
    }
}
