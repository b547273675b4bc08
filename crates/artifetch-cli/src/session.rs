use std::sync::Arc;

use artifetch::{BackendError, BlobStore, ContainerClient, DedupClient, DomainId, HttpSession, Session};
use async_trait::async_trait;

/// Session for runs without a service URL. Only file-share artifacts can be
/// downloaded through it.
pub struct OfflineSession;

fn offline(what: &str) -> BackendError {
    BackendError::Unavailable(format!("{what} requires --service-url"))
}

#[async_trait]
impl Session for OfflineSession {
    fn container_client(&self) -> Result<Arc<dyn ContainerClient>, BackendError> {
        Err(offline("the container service"))
    }

    async fn blob_store(&self) -> Result<Arc<dyn BlobStore>, BackendError> {
        Err(offline("the blob store"))
    }

    async fn dedup_client(&self, domain: &DomainId) -> Result<Arc<dyn DedupClient>, BackendError> {
        Err(offline(&format!("content-addressable domain '{domain}'")))
    }
}

pub fn connect(service_url: Option<&str>, token_env: &str) -> anyhow::Result<Arc<dyn Session>> {
    let Some(url) = service_url else {
        return Ok(Arc::new(OfflineSession));
    };
    let token = std::env::var(token_env).ok().filter(|t| !t.is_empty());
    if token.is_none() {
        tracing::warn!(variable = token_env, "no access token set, sending anonymous requests");
    }
    Ok(Arc::new(HttpSession::new(url, token)?))
}
