use std::path::{Component, Path, PathBuf};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::ports::{FileResolver, Visibility};

type HmacSha256 = Hmac<Sha256>;

/// Uploads stored under a local directory and served below `base_url`.
///
/// Public files get a plain URL. Private files get an expiring URL signed
/// with HMAC-SHA256 over `<reference>:<expires>`.
#[derive(Debug, Clone)]
pub struct LocalFileResolver {
    root: PathBuf,
    base_url: String,
    signing_key: Vec<u8>,
}

impl LocalFileResolver {
    /// Serves files below `root` at `base_url`.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            signing_key: Vec::new(),
        }
    }

    /// Key used to sign private URLs.
    pub fn with_signing_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.signing_key = key.into();
        self
    }

    /// Upload directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn signature(&self, reference: &str, expires: i64) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|err| anyhow!("invalid signing key: {err}"))?;
        mac.update(reference.as_bytes());
        mac.update(b":");
        mac.update(expires.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Only plain relative paths may address uploads.
fn is_safe_reference(reference: &str) -> bool {
    !reference.is_empty()
        && Path::new(reference)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

#[async_trait]
impl FileResolver for LocalFileResolver {
    async fn resolve_url(
        &self,
        reference: &str,
        visibility: Visibility,
        ttl: Duration,
    ) -> Result<Option<String>> {
        if !is_safe_reference(reference) {
            debug!(reference, "rejecting unsafe file reference");
            return Ok(None);
        }

        let exists = tokio::fs::metadata(self.root.join(reference))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !exists {
            return Ok(None);
        }

        let url = format!("{}/{reference}", self.base_url);
        match visibility {
            Visibility::Public => Ok(Some(url)),
            Visibility::Private => {
                let expires = (Utc::now() + ttl).timestamp();
                let signature = self.signature(reference, expires)?;
                Ok(Some(format!(
                    "{url}?expires={expires}&signature={signature}"
                )))
            }
        }
    }
}
