//! REST adapters for the remote document and object stores.

mod blobs;
mod documents;

pub use blobs::*;
pub use documents::*;

use migrator_engine::{error::Result, Error};
use reqwest::{Client, Method, RequestBuilder, Url};

/// Convert a transport failure into the engine's remote-store error.
fn remote_error(e: reqwest::Error) -> Error {
    Error::Remote(e.to_string())
}

/// HTTP client bound to one base URL, sending an optional bearer token.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl RestClient {
    pub fn new(http: Client, base: &str, token: Option<String>) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| Error::Remote(format!("invalid base URL '{base}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Remote(format!("'{base}' cannot be a base URL")));
        }
        Ok(Self { http, base, token })
    }

    /// `base` with `segments` appended, each percent-encoded.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}
