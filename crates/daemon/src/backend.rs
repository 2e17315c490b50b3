// Remote backend client: fetch a document, push its updated content.
//
// Neither call propagates errors: fetch failures become `None`, push
// failures become `false`, and both are logged here.

use noteedit_common::protocol::backend::{
    ArticleEnvelope, UpdateArticleRequest, GET_ARTICLE_PATH, UPDATE_ARTICLE_PATH,
};
use noteedit_common::types::Document;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("backend URL `{0}` cannot be used as a base")]
    NotABase(String),
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    get_url: Url,
    update_url: Url,
}

impl BackendClient {
    /// Build a client for the backend rooted at `base_url`.
    ///
    /// A base with a path prefix (`http://host/notes`) keeps the prefix.
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let mut base = Url::parse(base_url)
            .map_err(|source| BackendError::InvalidUrl { url: base_url.to_string(), source })?;
        if base.cannot_be_a_base() {
            return Err(BackendError::NotABase(base_url.to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |path: &str| {
            base.join(path)
                .map_err(|source| BackendError::InvalidUrl { url: base_url.to_string(), source })
        };
        Ok(Self {
            http: reqwest::Client::new(),
            get_url: join(GET_ARTICLE_PATH)?,
            update_url: join(UPDATE_ARTICLE_PATH)?,
        })
    }

    /// Fetch document `id`. Any status other than 200, a transport error or
    /// an undecodable body yields `None`.
    pub async fn fetch_document(&self, id: &str) -> Option<Document> {
        let response = match self.http.get(self.get_url.clone()).query(&[("id", id)]).send().await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(doc_id = id, error = %error, "document fetch failed");
                return None;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(doc_id = id, status = status.as_u16(), "backend rejected document fetch");
            return None;
        }

        match response.json::<ArticleEnvelope>().await {
            Ok(envelope) => {
                let document = envelope.into_document();
                debug!(doc_id = %document.id, title = %document.title, "fetched document");
                Some(document)
            }
            Err(error) => {
                warn!(doc_id = id, error = %error, "backend returned an undecodable document");
                None
            }
        }
    }

    /// Push `document.content` for `document.id`. Returns true only when the
    /// backend answered 200.
    pub async fn push_update(&self, document: &Document) -> bool {
        let request = UpdateArticleRequest::for_document(document);
        match self.http.post(self.update_url.clone()).json(&request).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!(doc_id = %document.id, "pushed document update");
                true
            }
            Ok(response) => {
                warn!(
                    doc_id = %document.id,
                    status = response.status().as_u16(),
                    "backend rejected document update"
                );
                false
            }
            Err(error) => {
                warn!(doc_id = %document.id, error = %error, "document update failed");
                false
            }
        }
    }
}
