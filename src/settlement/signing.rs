//! Request signing for the VNPay redirect gateway.
//!
//! Both directions use the same scheme: parameters sorted by key,
//! percent-encoded, joined as `key=value` pairs with `&`, then signed with
//! HMAC-SHA512 under the merchant's shared secret. The lower-case hex digest
//! travels as the `vnp_SecureHash` parameter. Verification is constant-time.

use crate::error::Result;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Parameter carrying the signature.
pub const SECURE_HASH_PARAM: &str = "vnp_SecureHash";
/// Optional companion parameter naming the hash algorithm; excluded from the
/// signed data just like the signature itself.
pub const SECURE_HASH_TYPE_PARAM: &str = "vnp_SecureHashType";

/// Build the canonical string the signature is computed over.
///
/// `BTreeMap` iteration gives the required key order. Parameters with empty
/// values are omitted, matching what the gateway signs on its side. The
/// returned string doubles as the redirect query string.
pub fn hash_data(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode one key or value the way the gateway expects
/// (form encoding, spaces as `+`).
fn percent_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Compute the HMAC-SHA512 signature over `data`, hex encoded lower-case.
pub fn sign(data: &str, secret: &str) -> Result<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|_| crate::error::QuaysideError::internal("HMAC error"))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Produce the full signed query string for an outbound redirect.
pub fn signed_query(params: &BTreeMap<String, String>, secret: &str) -> Result<String> {
    let data = hash_data(params);
    let signature = sign(&data, secret)?;
    Ok(format!("{data}&{SECURE_HASH_PARAM}={signature}"))
}

/// Verify an inbound parameter set against its `vnp_SecureHash`.
///
/// The signature parameters are removed, the digest recomputed over the
/// remainder, and compared in constant time. A missing or undecodable
/// signature simply fails verification.
pub fn verify(params: &BTreeMap<String, String>, secret: &str) -> Result<bool> {
    let Some(provided) = params.get(SECURE_HASH_PARAM) else {
        return Ok(false);
    };
    let Ok(provided_bytes) = hex::decode(provided) else {
        tracing::debug!(target: "quayside::settlement", "callback signature is not valid hex");
        return Ok(false);
    };

    let unsigned: BTreeMap<String, String> = params
        .iter()
        .filter(|(k, _)| k.as_str() != SECURE_HASH_PARAM && k.as_str() != SECURE_HASH_TYPE_PARAM)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let expected = sign(&hash_data(&unsigned), secret)?;
    let expected_bytes = hex::decode(&expected)
        .map_err(|_| crate::error::QuaysideError::internal("Hex decode error"))?;

    Ok(constant_time_compare(&expected_bytes, &provided_bytes))
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
