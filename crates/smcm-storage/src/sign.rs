//! Time-boxed signed read URLs.
//!
//! A signature covers exactly `{blob key}\n{expiry unix seconds}` under
//! HMAC-SHA256 with the storage signing secret, encoded as unpadded
//! URL-safe base64. Verification decodes the presented signature and
//! compares it in constant time before checking the expiry window.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not match")]
    Invalid,
    #[error("signed URL has expired")]
    Expired,
}

/// Signs and verifies blob read URLs. Holds the signing secret; the secret
/// is never logged and has no `Debug` exposure.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl UrlSigner {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Compute the signature for `key` valid until `expires_unix`.
    #[must_use]
    pub fn sign(&self, key: &str, expires_unix: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires_unix.to_string().as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Verify a presented signature against `key` and `expires_unix`.
    ///
    /// The signature is checked first (constant-time), then the expiry,
    /// so a forged-but-expired URL still reports `Invalid`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Invalid`] on mismatch or undecodable input,
    /// [`SignatureError::Expired`] when `now_unix` is past the expiry.
    pub fn verify(
        &self,
        key: &str,
        expires_unix: i64,
        signature: &str,
        now_unix: i64,
    ) -> Result<(), SignatureError> {
        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignatureError::Invalid)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires_unix.to_string().as_bytes());
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(presented.as_slice()).unwrap_u8() != 1 {
            return Err(SignatureError::Invalid);
        }
        if now_unix > expires_unix {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }
}
