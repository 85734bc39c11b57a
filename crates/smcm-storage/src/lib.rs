//! Blob asset manager: local-disk blob store plus signed read URLs.
//!
//! Blobs live under a configured root at `{owner}/{brand}/{uuid}{ext}`.
//! Reads go through time-boxed HMAC-signed URLs (see [`sign`]); the store
//! itself never serves bytes without a verified signature — that check
//! belongs to the HTTP layer, which calls [`BlobStore::verify_read`].

pub mod sign;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

pub use sign::{SignatureError, UrlSigner};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob `{0}` not found")]
    NotFound(String),
    #[error("invalid blob key")]
    InvalidKey,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Local-disk blob store with signed-URL minting.
///
/// Constructed once at startup from [`smcm_core::AppConfig`] values and
/// shared read-only across request handlers.
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
    public_base_url: String,
    signer: UrlSigner,
    default_ttl_secs: u64,
}

impl BlobStore {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        signer: UrlSigner,
        default_ttl_secs: u64,
    ) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
            signer,
            default_ttl_secs,
        }
    }

    /// Derive a fresh blob key for an upload: `{owner}/{brand}/{uuid}{ext}`.
    ///
    /// The owner segment is caller-controlled (it comes from the identity
    /// header), so it is mapped onto a fixed-safe alphabet. The key must
    /// survive a URL round trip unchanged — wildcard path captures are
    /// percent-decoded on the way back in, so encoded bytes in the stored
    /// key would never match the served key. The extension is taken from
    /// `file_name` only when it is plain ASCII alphanumeric.
    #[must_use]
    pub fn derive_key(owner: &str, brand_id: Uuid, file_name: &str) -> String {
        let owner = sanitize_owner(owner);
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        format!("{owner}/{brand_id}/{}{ext}", Uuid::new_v4())
    }

    /// Reject keys that could escape the storage root.
    fn ensure_key_safe(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.len() > 1024 {
            return Err(StorageError::InvalidKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StorageError::InvalidKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidKey);
        }
        Ok(())
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(key.split('/'));
        path
    }

    /// Write blob bytes durably under `key`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for unsafe keys or
    /// [`StorageError::Io`] on filesystem failure.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        Self::ensure_key_safe(key)?;
        let path = self.blob_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        tracing::debug!(key, size = bytes.len(), "stored blob");
        Ok(())
    }

    /// Read blob bytes for a key whose signature has already been verified.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the blob does not exist,
    /// [`StorageError::InvalidKey`] / [`StorageError::Io`] otherwise.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        Self::ensure_key_safe(key)?;
        match fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob. A missing blob is not an error — deletes are
    /// best-effort and may run after a partial upload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] / [`StorageError::Io`].
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        Self::ensure_key_safe(key)?;
        match fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The durable (unsigned) URL for a blob, stored alongside the document.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/blobs/{key}", self.public_base_url)
    }

    /// Mint a read-only signed URL valid for `ttl_secs` (the configured
    /// default when `None`, normally one hour).
    #[must_use]
    pub fn signed_read_url(&self, key: &str, ttl_secs: Option<u64>) -> String {
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        let expires = now_unix() + i64::try_from(ttl).unwrap_or(i64::MAX);
        let sig = self.signer.sign(key, expires);
        format!("{}?exp={expires}&sig={sig}", self.public_url(key))
    }

    /// Verify a presented `exp`/`sig` pair for `key` against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] when the signature is wrong or expired.
    pub fn verify_read(
        &self,
        key: &str,
        expires_unix: i64,
        signature: &str,
    ) -> Result<(), SignatureError> {
        self.signer.verify(key, expires_unix, signature, now_unix())
    }
}

/// Map a caller-controlled owner id onto `[A-Za-z0-9_-]`, one replacement
/// char per rejected char so distinct ids stay distinguishable. Excluding
/// `.` keeps `..` out of the segment entirely.
fn sanitize_owner(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path) -> BlobStore {
        BlobStore::new(
            root,
            "http://localhost:3000",
            UrlSigner::new("test-signing-secret"),
            3600,
        )
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());

        let key = "u1/5f2c7a1e-0000-0000-0000-000000000000/img.png";
        store.put(key, b"png-bytes").await.expect("put");
        let bytes = store.get(key).await.expect("get");
        assert_eq!(bytes, b"png-bytes");

        store.delete(key).await.expect("delete");
        assert!(matches!(
            store.get(key).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_of_missing_blob_is_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(store(dir.path()).delete("u1/b1/missing.png").await.is_ok());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        for key in ["../escape", "/abs/path", "a/../../b", "a\\b", ""] {
            assert!(
                matches!(store.put(key, b"x").await, Err(StorageError::InvalidKey)),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn derive_key_shapes_owner_brand_uuid_ext() {
        let brand = Uuid::new_v4();
        let key = BlobStore::derive_key("user-1", brand, "photo.PNG");
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user-1");
        assert_eq!(parts[1], brand.to_string());
        assert!(parts[2].ends_with(".png"));
    }

    #[test]
    fn derive_key_owner_segment_needs_no_url_encoding() {
        // Identity-provider ids carry pipes, ats, and dots; the stored key
        // must be byte-identical to what a percent-decoded URL path yields.
        let brand = Uuid::new_v4();
        let key = BlobStore::derive_key("auth0|alice@example.com", brand, "a.png");
        let owner = key.split('/').next().expect("owner segment");
        assert_eq!(owner, "auth0-alice-example-com");
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./".contains(c)));
        assert!(!key.contains('%'));
    }

    #[test]
    fn sanitize_owner_never_yields_empty_or_traversal_segments() {
        assert_eq!(sanitize_owner(""), "user");
        assert_eq!(sanitize_owner(".."), "--");
        assert_eq!(sanitize_owner("../x"), "----x");
    }

    #[test]
    fn derive_key_drops_suspicious_extensions() {
        let brand = Uuid::new_v4();
        let key = BlobStore::derive_key("u", brand, "noext");
        assert!(!key.contains('.'));
        let key = BlobStore::derive_key("u", brand, "weird.p/ng");
        assert!(!key.ends_with("p/ng"));
    }

    #[test]
    fn signed_read_url_carries_exp_and_sig() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let url = store.signed_read_url("u1/b1/a.png", Some(60));
        assert!(url.starts_with("http://localhost:3000/blobs/u1/b1/a.png?exp="));
        assert!(url.contains("&sig="));
    }

    #[test]
    fn minted_url_verifies_within_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let url = store.signed_read_url("u1/b1/a.png", Some(60));

        let query = url.split_once('?').expect("query").1;
        let mut exp = 0_i64;
        let mut sig = String::new();
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("exp", v)) => exp = v.parse().expect("exp"),
                Some(("sig", v)) => sig = v.to_string(),
                _ => {}
            }
        }
        assert!(store.verify_read("u1/b1/a.png", exp, &sig).is_ok());
        assert!(store.verify_read("u1/b1/other.png", exp, &sig).is_err());
    }
}
