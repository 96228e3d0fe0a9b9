//! Remote object store over REST.
//!
//! Objects live under `{base}/o/{path}`, which is also their durable
//! download URL. `GET {base}/o?prefix=<folder>` lists object paths.

use async_trait::async_trait;
use futures::StreamExt;
use migrator_engine::{error::Result, BlobStore, Error};
use reqwest::{header::CONTENT_TYPE, Method, StatusCode, Url};

use super::{remote_error, RestClient};

const OBJECTS: &str = "o";

/// [`BlobStore`] backed by a REST object store.
#[derive(Debug, Clone)]
pub struct RestBlobStore {
    client: RestClient,
}

impl RestBlobStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    fn object_url(&self, path: &str) -> Url {
        self.client
            .endpoint(std::iter::once(OBJECTS).chain(path.split('/').filter(|s| !s.is_empty())))
    }
}

#[async_trait]
impl BlobStore for RestBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let size = bytes.len();
        self.client
            .request(Method::PUT, self.object_url(path))
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(remote_error)?;

        tracing::debug!(path, size, "Uploaded object");
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        Ok(self.object_url(path).to_string())
    }

    async fn get(&self, url: &str, max_size: u64) -> Result<Vec<u8>> {
        let url = Url::parse(url).map_err(|e| Error::Attachment(format!("invalid URL '{url}': {e}")))?;
        let response = self
            .client
            .request(Method::GET, url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| Error::Attachment(e.to_string()))?;

        if let Some(size) = response.content_length() {
            if size > max_size {
                return Err(Error::AttachmentTooLarge {
                    size,
                    limit: max_size,
                });
            }
        }

        // Content-Length can be absent or wrong, so count while streaming.
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Attachment(e.to_string()))?;
            let size = (bytes.len() + chunk.len()) as u64;
            if size > max_size {
                return Err(Error::AttachmentTooLarge {
                    size,
                    limit: max_size,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .request(Method::DELETE, self.object_url(path))
            .send()
            .await
            .map_err(remote_error)?;

        if response.status() != StatusCode::NOT_FOUND {
            response.error_for_status().map_err(remote_error)?;
        }
        Ok(())
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        self.client
            .request(Method::GET, self.client.endpoint([OBJECTS]))
            .query(&[("prefix", prefix.as_str())])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(remote_error)?
            .json()
            .await
            .map_err(remote_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> RestBlobStore {
        let client = RestClient::new(reqwest::Client::new(), &server.uri(), None).unwrap();
        RestBlobStore::new(client)
    }

    #[tokio::test]
    async fn put_sends_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/o/employeeImages/ana.jpg"))
            .and(header("content-type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .put("employeeImages/ana.jpg", vec![0xFF, 0xD8], "image/jpeg")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn download_url_points_at_object() {
        let server = MockServer::start().await;
        let url = store(&server).download_url("employeeImages/ana.jpg").await.unwrap();
        assert_eq!(url, format!("{}/o/employeeImages/ana.jpg", server.uri()));
    }

    #[tokio::test]
    async fn get_enforces_size_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/o/employeeImages/big.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 64]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/o/employeeImages/small.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let store = store(&server);
        let big = format!("{}/o/employeeImages/big.jpg", server.uri());
        let small = format!("{}/o/employeeImages/small.jpg", server.uri());

        assert!(matches!(
            store.get(&big, 16).await,
            Err(Error::AttachmentTooLarge { limit: 16, .. })
        ));
        assert_eq!(store.get(&small, 16).await, Ok(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/o"))
            .and(query_param("prefix", "employeeImages/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!(["employeeImages/a.jpg", "employeeImages/b.jpg"])),
            )
            .mount(&server)
            .await;

        let paths = store(&server).list("employeeImages").await.unwrap();
        assert_eq!(paths, vec!["employeeImages/a.jpg", "employeeImages/b.jpg"]);
    }

    #[tokio::test]
    async fn missing_object_delete_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/o/employeeImages/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(store(&server).delete("employeeImages/gone.jpg").await, Ok(()));
    }
}
