// Remote backend API: article fetch envelope and update payload.

use serde::{Deserialize, Serialize};

use crate::types::{Document, DocumentId};

/// Path of the fetch endpoint, relative to the backend base URL.
pub const GET_ARTICLE_PATH: &str = "api/article/get";
/// Path of the update endpoint, relative to the backend base URL.
pub const UPDATE_ARTICLE_PATH: &str = "api/article/update";

/// Response body of `GET api/article/get?id=`: `{ "data": { "article": {..} } }`.
///
/// Only `data.article` is read; any sibling fields the backend adds are
/// ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ArticleEnvelope {
    pub data: ArticleData,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ArticleData {
    pub article: Document,
}

impl ArticleEnvelope {
    pub fn into_document(self) -> Document {
        self.data.article
    }
}

/// JSON body of `POST api/article/update`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpdateArticleRequest<'a> {
    pub id: &'a DocumentId,
    pub content: &'a str,
}

impl<'a> UpdateArticleRequest<'a> {
    pub fn for_document(document: &'a Document) -> Self {
        Self { id: &document.id, content: &document.content }
    }
}
