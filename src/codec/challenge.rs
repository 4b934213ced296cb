//! HMAC-SHA512 challenge answers.
//!
//! The server proves the client holds the shared secret by sending a nonce.
//! The answer is the lower-case hex HMAC-SHA512 of the challenge, keyed with
//! the application key followed by the HMAC key.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::{IinkError, Result};

type HmacSha512 = Hmac<Sha512>;

/// Compute the answer to an HMAC challenge
pub fn compute_hmac(challenge: &str, application_key: &str, hmac_key: &str) -> Result<String> {
    let key = format!("{application_key}{hmac_key}");
    let mut mac = HmacSha512::new_from_slice(key.as_bytes())
        .map_err(|e| IinkError::Crypto(format!("Invalid HMAC key: {e}")))?;
    mac.update(challenge.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
