//! REST client for the file container service.

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::io;
    use std::sync::Arc;

    use async_trait::async_trait;
    use futures_util::TryStreamExt;
    use reqwest::header::{ACCEPT, HeaderMap};
    use serde::Deserialize;

    use crate::data::{ArtifactItem, DomainId, ItemKind, ProjectRef};
    use crate::effects::backend::{BlobStore, ByteStream, ContainerClient, DedupClient, ItemPage, Session};
    use crate::error::BackendError;

    const API_VERSION: &str = "6.0-preview.4";
    const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ContainerItemDto {
        path: String,
        item_type: String,
        #[serde(default)]
        file_length: u64,
        #[serde(default)]
        blob_metadata: Option<BlobMetadataDto>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct BlobMetadataDto {
        artifact_hash: Option<String>,
    }

    #[derive(Deserialize)]
    struct ListResponse {
        value: Vec<ContainerItemDto>,
    }

    impl From<ContainerItemDto> for ArtifactItem {
        fn from(dto: ContainerItemDto) -> Self {
            let kind = if dto.item_type.eq_ignore_ascii_case("folder") {
                ItemKind::Folder
            } else {
                ItemKind::File
            };
            ArtifactItem {
                path: dto.path,
                kind,
                length: dto.file_length,
                blob_id: dto.blob_metadata.and_then(|m| m.artifact_hash),
            }
        }
    }

    fn map_error(e: reqwest::Error) -> BackendError {
        if e.is_connect() || e.is_timeout() {
            BackendError::Unavailable(e.to_string())
        } else if e.is_decode() {
            BackendError::Protocol(e.to_string())
        } else {
            BackendError::Io(io::Error::other(e))
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(message));
        }
        Err(BackendError::Service {
            status: status.as_u16(),
            message,
        })
    }

    /// Container client speaking the `_apis/resources/Containers` REST API.
    pub struct HttpContainerClient {
        client: reqwest::Client,
        base_url: String,
        token: Option<String>,
    }

    impl HttpContainerClient {
        pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, BackendError> {
            let client = reqwest::Client::builder()
                .user_agent(concat!("artifetch/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(map_error)?;
            Ok(Self {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                token,
            })
        }

        fn container_url(&self, container_id: u64) -> String {
            format!("{}/_apis/resources/Containers/{}", self.base_url, container_id)
        }

        fn request(&self, container_id: u64, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
            let mut request = self
                .client
                .get(self.container_url(container_id))
                .query(&[("api-version", API_VERSION)])
                .query(query);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            request
        }

        pub(crate) fn list_request(
            &self,
            project: &ProjectRef,
            container_id: u64,
            root: &str,
            continuation: Option<&str>,
        ) -> reqwest::RequestBuilder {
            let mut query = vec![("itemPath", root), ("scope", project.scope())];
            if let Some(token) = continuation {
                query.push(("continuationToken", token));
            }
            self.request(container_id, &query)
        }
    }

    fn continuation(headers: &HeaderMap) -> Option<String> {
        headers
            .get(CONTINUATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .filter(|v| !v.is_empty())
    }

    #[async_trait]
    impl ContainerClient for HttpContainerClient {
        async fn list_items(
            &self,
            project: &ProjectRef,
            container_id: u64,
            root: &str,
            continuation_token: Option<&str>,
        ) -> Result<ItemPage, BackendError> {
            let response = self
                .list_request(project, container_id, root, continuation_token)
                .send()
                .await
                .map_err(map_error)?;
            let response = check_status(response).await?;
            let continuation = continuation(response.headers());
            let body: ListResponse = response.json().await.map_err(map_error)?;
            Ok(ItemPage {
                items: body.value.into_iter().map(ArtifactItem::from).collect(),
                continuation,
            })
        }

        async fn download_item(
            &self,
            project: &ProjectRef,
            container_id: u64,
            path: &str,
        ) -> Result<ByteStream, BackendError> {
            let response = self
                .request(
                    container_id,
                    &[("itemPath", path), ("scope", project.scope()), ("$format", "OctetStream")],
                )
                .header(ACCEPT, "application/octet-stream")
                .send()
                .await
                .map_err(map_error)?;
            let response = check_status(response).await?;
            Ok(Box::pin(response.bytes_stream().map_err(io::Error::other)))
        }
    }

    /// Session backed only by the container REST API. The content-addressable
    /// services are reported unavailable, so container downloads fall back to
    /// direct item streams.
    pub struct HttpSession {
        container: Arc<HttpContainerClient>,
    }

    impl HttpSession {
        pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, BackendError> {
            Ok(Self {
                container: Arc::new(HttpContainerClient::new(base_url, token)?),
            })
        }
    }

    #[async_trait]
    impl Session for HttpSession {
        fn container_client(&self) -> Result<Arc<dyn ContainerClient>, BackendError> {
            Ok(self.container.clone())
        }

        async fn blob_store(&self) -> Result<Arc<dyn BlobStore>, BackendError> {
            Err(BackendError::Unavailable(
                "no content-addressable blob store configured".to_string(),
            ))
        }

        async fn dedup_client(&self, domain: &DomainId) -> Result<Arc<dyn DedupClient>, BackendError> {
            Err(BackendError::Unavailable(format!(
                "no content-addressable client configured for domain '{domain}'"
            )))
        }
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::{HttpContainerClient, HttpSession};
