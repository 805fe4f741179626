//! Request signing. The body is authenticated with HMAC-SHA256 and the digest travels in the
//! `X-Signature-256` header as `sha256=<hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SubmitError;

pub const SIGNATURE_HEADER: &str = "X-Signature-256";
const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `body` keyed with `secret`.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, SubmitError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SubmitError::InvalidKey)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn signature_header(digest: &str) -> String {
    format!("{SIGNATURE_PREFIX}{digest}")
}

/// Checks a `sha256=<hex>` header against `body` in constant time.
#[cfg(test)]
pub fn verify(secret: &[u8], body: &[u8], header: &str) -> bool {
    let Some(digest) = header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
