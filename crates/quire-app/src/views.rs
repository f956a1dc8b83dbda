//! Read-side views: my blogs, explore and a single blog.
//!
//! Each view starts `Loading` and settles on `Ready`, `Empty` or `Error`.
//! A blog that does not exist is `Empty`, not an error.

use chrono::{DateTime, Utc};
use quire_common::{Blog, BlogApi, QuireError, SessionPersistence};
use quire_editor_core::{parse, serialize, stats};

use crate::auth::SessionStore;
use crate::notify::Notifier;

pub const MY_BLOGS_EXCERPT: usize = 100;
pub const EXPLORE_EXCERPT: usize = 120;

pub const DELETED: &str = "Blog deleted successfully";
pub const DELETE_FAILED: &str = "Failed to delete blog";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Error(String),
    Empty,
    Ready(T),
}

impl<T> ViewState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }
}

/// Plain text of stored markup, whitespace collapsed.
pub fn plain_text(content: &str) -> String {
    parse(content)
        .plain_text()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A blog as a list shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogCard {
    pub id: Option<String>,
    pub title: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl BlogCard {
    pub fn from_blog(blog: &Blog, excerpt_len: usize) -> Self {
        Self {
            id: blog.id.clone(),
            title: blog.title.clone(),
            excerpt: stats::excerpt(&plain_text(&blog.content), excerpt_len),
            tags: blog.tags.clone(),
            image: blog.image.clone(),
            author: blog.author_name().map(str::to_string),
            created_at: blog.created_at,
        }
    }
}

fn settle(blogs: Vec<Blog>) -> ViewState<Vec<Blog>> {
    if blogs.is_empty() {
        ViewState::Empty
    } else {
        ViewState::Ready(blogs)
    }
}

async fn report<P: SessionPersistence>(
    err: &QuireError,
    store: &SessionStore<P>,
    notifier: &impl Notifier,
) -> String {
    let message = err.user_message();
    tracing::warn!("request failed: {err}");
    notifier.error(&message);
    store.invalidate_on(err).await;
    message
}

/// The logged-in user's blogs, newest first.
#[derive(Debug, Clone)]
pub struct MyBlogs {
    pub state: ViewState<Vec<Blog>>,
}

impl Default for MyBlogs {
    fn default() -> Self {
        Self::new()
    }
}

impl MyBlogs {
    pub fn new() -> Self {
        Self {
            state: ViewState::Loading,
        }
    }

    pub async fn load<A, P>(&mut self, api: &A, store: &SessionStore<P>, notifier: &impl Notifier)
    where
        A: BlogApi + Sync,
        P: SessionPersistence,
    {
        self.state = ViewState::Loading;
        let Some(user) = store.current_user() else {
            self.state = ViewState::Error(QuireError::NotAuthenticated.to_string());
            return;
        };
        self.state = match api.list_user_blogs(&user.id).await {
            Ok(mut blogs) => {
                // Undated blogs sort last.
                blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                tracing::debug!(count = blogs.len(), "my blogs loaded");
                settle(blogs)
            }
            Err(e) => ViewState::Error(report(&e, store, notifier).await),
        };
    }

    pub fn cards(&self) -> Vec<BlogCard> {
        self.state
            .ready()
            .map(|blogs| {
                blogs
                    .iter()
                    .map(|b| BlogCard::from_blog(b, MY_BLOGS_EXCERPT))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Delete one blog and drop it from the list. Returns whether it went.
    pub async fn delete<A, P>(
        &mut self,
        api: &A,
        store: &SessionStore<P>,
        notifier: &impl Notifier,
        blog_id: &str,
    ) -> bool
    where
        A: BlogApi + Sync,
        P: SessionPersistence,
    {
        match api.delete_blog(blog_id).await {
            Ok(()) => {
                if let ViewState::Ready(blogs) = &mut self.state {
                    blogs.retain(|b| b.id.as_deref() != Some(blog_id));
                    if blogs.is_empty() {
                        self.state = ViewState::Empty;
                    }
                }
                tracing::info!(blog_id, "blog deleted");
                notifier.success(DELETED);
                true
            }
            // The server answered but not with a plain 200.
            Err(QuireError::Api { status, .. }) if (200..300).contains(&status) => {
                tracing::warn!(blog_id, status, "unexpected delete status");
                notifier.error(DELETE_FAILED);
                false
            }
            Err(e) => {
                report(&e, store, notifier).await;
                false
            }
        }
    }
}

/// Every blog, narrowed by a search term.
#[derive(Debug, Clone)]
pub struct Explore {
    pub state: ViewState<Vec<Blog>>,
    search: String,
}

impl Default for Explore {
    fn default() -> Self {
        Self::new()
    }
}

impl Explore {
    pub fn new() -> Self {
        Self {
            state: ViewState::Loading,
            search: String::new(),
        }
    }

    pub async fn load<A, P>(&mut self, api: &A, store: &SessionStore<P>, notifier: &impl Notifier)
    where
        A: BlogApi + Sync,
        P: SessionPersistence,
    {
        self.state = ViewState::Loading;
        self.state = match api.list_blogs().await {
            Ok(blogs) => settle(blogs),
            Err(e) => ViewState::Error(report(&e, store, notifier).await),
        };
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Blogs whose title, text or author name contains the search term,
    /// ignoring case.
    pub fn visible(&self) -> Vec<&Blog> {
        let Some(blogs) = self.state.ready() else {
            return Vec::new();
        };
        let term = self.search.trim().to_lowercase();
        blogs
            .iter()
            .filter(|blog| {
                term.is_empty()
                    || blog.title.to_lowercase().contains(&term)
                    || plain_text(&blog.content).to_lowercase().contains(&term)
                    || blog
                        .author_name()
                        .is_some_and(|name| name.to_lowercase().contains(&term))
            })
            .collect()
    }

    pub fn cards(&self) -> Vec<BlogCard> {
        self.visible()
            .into_iter()
            .map(|b| BlogCard::from_blog(b, EXPLORE_EXCERPT))
            .collect()
    }
}

/// A single blog, ready to read.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogDetail {
    pub blog: Blog,
    /// Body re-serialized from the stored markup.
    pub body_html: String,
    pub word_count: usize,
    pub reading_minutes: usize,
}

impl BlogDetail {
    pub fn from_blog(blog: Blog) -> Self {
        let doc = parse(&blog.content);
        let word_count = stats::word_count(&doc.plain_text());
        Self {
            body_html: serialize(&doc),
            word_count,
            reading_minutes: stats::reading_minutes(word_count),
            blog,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlogView {
    pub id: String,
    pub state: ViewState<BlogDetail>,
}

impl BlogView {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: ViewState::Loading,
        }
    }

    pub async fn load<A, P>(&mut self, api: &A, store: &SessionStore<P>, notifier: &impl Notifier)
    where
        A: BlogApi + Sync,
        P: SessionPersistence,
    {
        self.state = ViewState::Loading;
        self.state = match api.fetch_blog(&self.id).await {
            Ok(Some(blog)) => ViewState::Ready(BlogDetail::from_blog(blog)),
            Ok(None) => ViewState::Empty,
            Err(e) => ViewState::Error(report(&e, store, notifier).await),
        };
    }
}
