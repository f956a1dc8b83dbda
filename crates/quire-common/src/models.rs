use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// Blog author: either populated by the server or a bare user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Populated {
        #[serde(rename = "_id")]
        id: String,
        name: String,
        #[serde(default)]
        email: String,
    },
    Id(String),
}

impl Author {
    pub fn id(&self) -> &str {
        match self {
            Author::Populated { id, .. } => id,
            Author::Id(id) => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Author::Populated { name, .. } => Some(name),
            Author::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "authorId", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Blog {
    pub fn author_name(&self) -> Option<&str> {
        self.author.as_ref().and_then(Author::name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A cover image file about to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverUpload {
    pub file_name: String,
    pub mime: String,
    pub data: Bytes,
}

/// Multipart payload for creating or updating a blog.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogSubmission {
    /// Set for updates only.
    pub blog_id: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub user_id: String,
    /// Optional on update, where the existing cover is kept.
    pub image: Option<CoverUpload>,
}

/// What survives a restart: the user and the cookie header that
/// authenticates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}
