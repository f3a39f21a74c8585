//! HMAC request signing as the workspace API expects it.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::Credentials;
use crate::transport::TransportError;

type HmacSha256 = Hmac<Sha256>;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Headers attached to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub nonce: String,
    pub content_md5: String,
    pub content_type: String,
}

/// Milliseconds since the epoch; the service rejects stale or repeated nonces.
pub fn nonce() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

pub fn md5_hex(body: &[u8]) -> String {
    format!("{:x}", md5::compute(body))
}

/// The text that gets signed. Every line, including the last, ends in `\n`.
pub fn canonical_message(
    method: &str,
    path: &str,
    md5_hex: &str,
    content_type: &str,
    nonce: &str,
) -> String {
    format!("{method}\n{path}\n{md5_hex}\n{content_type}\n{nonce}\n")
}

/// Base64 of the lowercase hex HMAC-SHA256 of `message`.
pub fn signature(secret: &str, message: &str) -> Result<String, TransportError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TransportError::Signing(e.to_string()))?;
    mac.update(message.as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(STANDARD.encode(hex::encode(digest)))
}

pub fn sign(
    credentials: &Credentials,
    method: &str,
    path: &str,
    body: &[u8],
    content_type: &str,
    nonce: &str,
) -> Result<SignedHeaders, TransportError> {
    let body_md5 = md5_hex(body);
    let message = canonical_message(method, path, &body_md5, content_type, nonce);
    let signature = signature(&credentials.api_secret, &message)?;
    Ok(SignedHeaders {
        authorization: format!("{}:{}", credentials.api_key, signature),
        nonce: nonce.to_string(),
        content_md5: STANDARD.encode(&body_md5),
        content_type: content_type.to_string(),
    })
}
