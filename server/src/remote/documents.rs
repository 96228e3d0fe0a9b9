//! Remote document store over REST.
//!
//! | Request | Meaning |
//! |---|---|
//! | `GET {base}/{collection}` | list documents |
//! | `GET {base}/{collection}/{id}` | read one document |
//! | `PUT {base}/{collection}/{id}` | create or replace |
//! | `DELETE {base}/{collection}/{id}` | delete, missing is fine |
//! | `DELETE {base}/{collection}` | delete all, returns `{deleted}` |

use async_trait::async_trait;
use migrator_engine::{error::Result, Error, RemoteDocument, RemoteStore};
use reqwest::{Method, StatusCode};
use serde::Deserialize;

use super::{remote_error, RestClient};

#[derive(Debug, Deserialize)]
struct DeleteAllResponse {
    deleted: usize,
}

/// [`RemoteStore`] speaking JSON `{id, fields}` documents over HTTP.
#[derive(Debug, Clone)]
pub struct RestDocumentStore {
    client: RestClient,
}

impl RestDocumentStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteStore for RestDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<RemoteDocument>> {
        let url = self.client.endpoint([collection]);
        let response = self
            .client
            .request(Method::GET, url)
            .send()
            .await
            .map_err(remote_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let documents: Vec<RemoteDocument> = response
            .error_for_status()
            .map_err(remote_error)?
            .json()
            .await
            .map_err(remote_error)?;

        tracing::debug!(collection, documents = documents.len(), "Listed remote documents");
        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<RemoteDocument>> {
        let url = self.client.endpoint([collection, id]);
        let response = self
            .client
            .request(Method::GET, url)
            .send()
            .await
            .map_err(remote_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document = response
            .error_for_status()
            .map_err(remote_error)?
            .json()
            .await
            .map_err(remote_error)?;
        Ok(Some(document))
    }

    async fn set(&self, collection: &str, document: RemoteDocument) -> Result<()> {
        if document.id.is_empty() || document.id.contains('/') {
            return Err(Error::Remote(format!("invalid document id '{}'", document.id)));
        }
        let url = self.client.endpoint([collection, document.id.as_str()]);
        self.client
            .request(Method::PUT, url)
            .json(&document)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(remote_error)?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let url = self.client.endpoint([collection, id]);
        let response = self
            .client
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(remote_error)?;

        if response.status() != StatusCode::NOT_FOUND {
            response.error_for_status().map_err(remote_error)?;
        }
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<usize> {
        let url = self.client.endpoint([collection]);
        let body: DeleteAllResponse = self
            .client
            .request(Method::DELETE, url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(remote_error)?
            .json()
            .await
            .map_err(remote_error)?;
        Ok(body.deleted)
    }
}
