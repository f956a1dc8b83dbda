use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;

use crate::config::Config;
use crate::endpoints;
use crate::error::QuireError;
use crate::models::{Blog, BlogSubmission, LoginRequest, RegisterRequest, User};
use crate::response::{ApiFailure, ApiReply};

/// The blog server, as the rest of quire sees it.
///
/// Workflows only talk to this trait, so tests can hand them a mock that
/// records calls instead of a live server.
#[trait_variant::make(Send)]
pub trait BlogApi {
    /// Create an account. The server may echo the new user back.
    async fn register(&self, request: &RegisterRequest) -> Result<Option<User>, QuireError>;

    async fn login(&self, request: &LoginRequest) -> Result<User, QuireError>;

    async fn logout(&self) -> Result<(), QuireError>;

    async fn create_blog(&self, submission: &BlogSubmission) -> Result<(), QuireError>;

    async fn update_blog(&self, submission: &BlogSubmission) -> Result<(), QuireError>;

    async fn list_user_blogs(&self, user_id: &str) -> Result<Vec<Blog>, QuireError>;

    async fn list_blogs(&self) -> Result<Vec<Blog>, QuireError>;

    /// Only an HTTP 200 counts as deleted.
    async fn delete_blog(&self, blog_id: &str) -> Result<(), QuireError>;

    /// `None` when the server does not know the blog.
    async fn fetch_blog(&self, blog_id: &str) -> Result<Option<Blog>, QuireError>;

    /// Opaque credential currently held, for persisting with the session.
    fn credential(&self) -> Option<String>;

    /// Re-arm a credential captured by [`BlogApi::credential`].
    fn restore_credential(&self, credential: &str);
}

/// [`BlogApi`] over HTTP. Credentials are cookies kept in a shared jar.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self, QuireError> {
        let base = Url::parse(&config.endpoint)
            .map_err(|e| QuireError::Config(format!("invalid api url {}: {e}", config.endpoint)))?;
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .build()?;
        Ok(Self { client, jar, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        endpoints::join(self.base.as_str(), path)
    }

    /// Send a request and hand back the raw status and body. Only transport
    /// errors fail here.
    async fn exchange(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<(u16, String), QuireError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(path, status, "response received");
        Ok((status, body))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, QuireError> {
        let (status, body) = self.exchange(path, request).await?;
        ApiReply::from_body(path, status, &body)?
            .into_result()
            .map_err(|failure| QuireError::Api { status, failure })
    }

    fn blog_form(submission: &BlogSubmission) -> Result<Form, QuireError> {
        let mut form = Form::new();
        if let Some(id) = &submission.blog_id {
            form = form.text("blogId", id.clone());
        }
        form = form
            .text("title", submission.title.clone())
            .text("content", submission.content.clone())
            .text("tags", serde_json::Value::from(submission.tags.clone()).to_string())
            .text("userId", submission.user_id.clone());
        if let Some(cover) = &submission.image {
            let part = Part::bytes(cover.data.to_vec())
                .file_name(cover.file_name.clone())
                .mime_str(&cover.mime)?;
            form = form.part("image", part);
        }
        Ok(form)
    }
}

impl BlogApi for HttpClient {
    async fn register(&self, request: &RegisterRequest) -> Result<Option<User>, QuireError> {
        debug!(email = %request.email, "registering");
        let req = self.client.post(self.url(endpoints::REGISTER)).json(request);
        self.call(endpoints::REGISTER, req).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<User, QuireError> {
        debug!(email = %request.email, "logging in");
        let req = self.client.post(self.url(endpoints::LOGIN)).json(request);
        self.call(endpoints::LOGIN, req).await
    }

    async fn logout(&self) -> Result<(), QuireError> {
        let req = self.client.post(self.url(endpoints::LOGOUT));
        let _: IgnoredAny = self.call(endpoints::LOGOUT, req).await?;
        Ok(())
    }

    async fn create_blog(&self, submission: &BlogSubmission) -> Result<(), QuireError> {
        debug!(title = %submission.title, "creating blog");
        let form = Self::blog_form(submission)?;
        let req = self.client.post(self.url(endpoints::ADD_BLOG)).multipart(form);
        let _: IgnoredAny = self.call(endpoints::ADD_BLOG, req).await?;
        Ok(())
    }

    async fn update_blog(&self, submission: &BlogSubmission) -> Result<(), QuireError> {
        debug!(blog_id = ?submission.blog_id, "updating blog");
        let form = Self::blog_form(submission)?;
        let req = self.client.put(self.url(endpoints::UPDATE_BLOG)).multipart(form);
        let _: IgnoredAny = self.call(endpoints::UPDATE_BLOG, req).await?;
        Ok(())
    }

    async fn list_user_blogs(&self, user_id: &str) -> Result<Vec<Blog>, QuireError> {
        let path = endpoints::user_blogs(user_id);
        let req = self.client.get(self.url(&path));
        let blogs: Option<Vec<Blog>> = self.call(&path, req).await?;
        Ok(blogs.unwrap_or_default())
    }

    async fn list_blogs(&self) -> Result<Vec<Blog>, QuireError> {
        let req = self.client.get(self.url(endpoints::LIST_BLOGS));
        let blogs: Option<Vec<Blog>> = self.call(endpoints::LIST_BLOGS, req).await?;
        Ok(blogs.unwrap_or_default())
    }

    async fn delete_blog(&self, blog_id: &str) -> Result<(), QuireError> {
        let path = endpoints::delete_blog(blog_id);
        debug!(blog_id, "deleting blog");
        let req = self.client.delete(self.url(&path));
        let (status, body) = self.exchange(&path, req).await?;
        delete_outcome(&path, status, &body)
    }

    async fn fetch_blog(&self, blog_id: &str) -> Result<Option<Blog>, QuireError> {
        let path = endpoints::fetch_blog(blog_id);
        let req = self.client.get(self.url(&path));
        let (status, body) = self.exchange(&path, req).await?;
        fetch_outcome(&path, status, &body)
    }

    fn credential(&self) -> Option<String> {
        self.jar
            .cookies(&self.base)
            .and_then(|header| header.to_str().ok().map(str::to_string))
    }

    fn restore_credential(&self, credential: &str) {
        for cookie in credential.split("; ").filter(|c| !c.trim().is_empty()) {
            self.jar.add_cookie_str(cookie, &self.base);
        }
    }
}

/// Only an HTTP 200 counts as deleted. Any other success status is a refusal
/// without a reason.
fn delete_outcome(path: &str, status: u16, body: &str) -> Result<(), QuireError> {
    match ApiReply::<IgnoredAny>::from_body(path, status, body)? {
        ApiReply::Ok { .. } if status == 200 => Ok(()),
        ApiReply::Ok { .. } => Err(QuireError::Api {
            status,
            failure: ApiFailure::Unspecified,
        }),
        ApiReply::Fail(failure) => Err(QuireError::Api { status, failure }),
    }
}

/// A 404 means the blog is gone, not that the request failed.
fn fetch_outcome(path: &str, status: u16, body: &str) -> Result<Option<Blog>, QuireError> {
    match ApiReply::from_body(path, status, body)? {
        ApiReply::Ok { data } => Ok(data),
        ApiReply::Fail(_) if status == 404 => Ok(None),
        ApiReply::Fail(failure) => Err(QuireError::Api { status, failure }),
    }
}
