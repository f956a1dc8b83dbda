//! Drafting a blog: title, tags, cover and body, up to submission.
//!
//! A session moves `Editing ⇄ Previewing` freely. Submission runs
//! `Editing → Submitting → Succeeded`, or falls back to `Editing` with the
//! server's message when the request fails. While `Submitting`, another
//! submission is refused.

mod cover;
pub use cover::CoverImage;

mod preview;
pub use preview::Preview;

use miette::Diagnostic;
use quire_common::{Blog, BlogApi, BlogSubmission, QuireError, SessionPersistence, User};
use quire_editor_core::{Editor, UndoManager};

use crate::auth::SessionStore;
use crate::guards::Route;
use crate::notify::Notifier;
use crate::validation::{BlogForm, MAX_TAGS, Validation};
use crate::views::{BlogView, ViewState};

pub const POSTED: &str = "Blog posted successfully";
pub const UPDATED: &str = "Blog updated successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthoringState {
    Editing,
    Previewing,
    Submitting,
    Succeeded,
}

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum AuthoringError {
    #[error("blog is not ready: {0}")]
    #[diagnostic(code(quire::authoring::invalid))]
    Invalid(Validation),

    #[error("a submission is already in flight")]
    #[diagnostic(code(quire::authoring::in_flight))]
    InFlight,

    #[error("this draft was already submitted")]
    #[diagnostic(code(quire::authoring::submitted))]
    AlreadySubmitted,

    #[error("not logged in")]
    #[diagnostic(code(quire::authoring::not_authenticated), help("run `quire login` first"))]
    NotAuthenticated,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Api(QuireError),
}

#[derive(Debug, Clone)]
pub struct AuthoringSession {
    title: String,
    tags: Vec<String>,
    cover: Option<CoverImage>,
    editor: Editor,
    /// Set when editing a blog the server already has.
    blog_id: Option<String>,
    state: AuthoringState,
    last_error: Option<String>,
}

impl Default for AuthoringSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthoringSession {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            tags: Vec::new(),
            cover: None,
            editor: Editor::new(),
            blog_id: None,
            state: AuthoringState::Editing,
            last_error: None,
        }
    }

    /// Open a fetched blog for editing. Its cover is kept unless replaced.
    pub fn for_existing(blog: &Blog) -> Self {
        let mut editor = Editor::from_markup(&blog.content);
        editor.clear_history();
        Self {
            title: blog.title.clone(),
            tags: blog.tags.clone(),
            cover: blog.image.clone().map(CoverImage::Existing),
            editor,
            blog_id: blog.id.clone(),
            state: AuthoringState::Editing,
            last_error: None,
        }
    }

    /// Fetch a stored blog and open it for editing. Failures are reported
    /// through `notifier` once, as any view load is; a missing blog is `Empty`.
    pub async fn load_existing<A, P>(
        api: &A,
        store: &SessionStore<P>,
        notifier: &impl Notifier,
        blog_id: &str,
    ) -> ViewState<Self>
    where
        A: BlogApi + Sync,
        P: SessionPersistence,
    {
        let mut view = BlogView::new(blog_id);
        view.load(api, store, notifier).await;
        match view.state {
            ViewState::Ready(detail) => ViewState::Ready(Self::for_existing(&detail.blog)),
            ViewState::Empty => ViewState::Empty,
            ViewState::Error(message) => ViewState::Error(message),
            ViewState::Loading => ViewState::Loading,
        }
    }

    pub fn state(&self) -> AuthoringState {
        self.state
    }

    pub fn is_update(&self) -> bool {
        self.blog_id.is_some()
    }

    pub fn blog_id(&self) -> Option<&str> {
        self.blog_id.as_deref()
    }

    /// Message from the last failed submission.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Add a trimmed tag. Blank input, duplicates and a sixth tag are
    /// refused.
    pub fn add_tag(&mut self, text: &str) -> bool {
        let tag = text.trim();
        if tag.is_empty() || self.tags.len() >= MAX_TAGS || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        match self.tags.iter().position(|t| t == tag) {
            Some(index) => {
                self.tags.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn cover(&self) -> Option<&CoverImage> {
        self.cover.as_ref()
    }

    pub fn set_cover_image(&mut self, cover: CoverImage) {
        self.cover = Some(cover);
    }

    pub fn clear_cover_image(&mut self) {
        self.cover = None;
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    /// Replace the body with parsed markup, e.g. from a file.
    pub fn load_body(&mut self, markup: &str) {
        self.editor = Editor::from_markup(markup);
    }

    pub fn word_count(&self) -> usize {
        self.editor.word_count()
    }

    pub fn reading_minutes(&self) -> usize {
        self.editor.estimated_reading_minutes()
    }

    /// Flip between editing and previewing. Does nothing mid-submission or
    /// after success.
    pub fn toggle_preview(&mut self) -> bool {
        self.state = match self.state {
            AuthoringState::Editing => AuthoringState::Previewing,
            AuthoringState::Previewing => AuthoringState::Editing,
            _ => return false,
        };
        true
    }

    pub fn preview(&self) -> Preview {
        Preview {
            title: self.title.clone(),
            tags: self.tags.clone(),
            word_count: self.word_count(),
            reading_minutes: self.reading_minutes(),
            cover_src: self.cover.as_ref().map(CoverImage::preview_src),
            body_html: self.editor.serialize(),
        }
    }

    pub fn validate(&self) -> Validation {
        BlogForm {
            title: &self.title,
            body: self.editor.document(),
            has_cover: self.cover.is_some(),
            tags: &self.tags,
        }
        .validate()
    }

    /// Validate, take the submission lock and build the payload.
    pub fn begin_submit(&mut self, user: Option<&User>) -> Result<BlogSubmission, AuthoringError> {
        match self.state {
            AuthoringState::Submitting => return Err(AuthoringError::InFlight),
            AuthoringState::Succeeded => return Err(AuthoringError::AlreadySubmitted),
            AuthoringState::Editing | AuthoringState::Previewing => {}
        }
        let validation = self.validate();
        if !validation.valid() {
            return Err(AuthoringError::Invalid(validation));
        }
        let user = user.ok_or(AuthoringError::NotAuthenticated)?;
        let submission = BlogSubmission {
            blog_id: self.blog_id.clone(),
            title: self.title.clone(),
            content: self.editor.serialize(),
            tags: self.tags.clone(),
            user_id: user.id.clone(),
            image: self.cover.as_ref().and_then(CoverImage::upload),
        };
        self.state = AuthoringState::Submitting;
        self.last_error = None;
        tracing::debug!(blog_id = ?self.blog_id, "submission started");
        Ok(submission)
    }

    /// Record how the request went and release the lock.
    pub fn finish_submit(&mut self, outcome: Result<(), QuireError>) -> Result<Route, AuthoringError> {
        match outcome {
            Ok(()) => {
                self.state = AuthoringState::Succeeded;
                Ok(Route::MyBlogs)
            }
            Err(e) => {
                self.state = AuthoringState::Editing;
                self.last_error = Some(e.user_message());
                Err(AuthoringError::Api(e))
            }
        }
    }

    /// Create or update the blog on the server.
    pub async fn submit<A, P>(
        &mut self,
        api: &A,
        store: &SessionStore<P>,
        notifier: &impl Notifier,
    ) -> Result<Route, AuthoringError>
    where
        A: BlogApi + Sync,
        P: SessionPersistence,
    {
        let user = store.current_user();
        let submission = self.begin_submit(user.as_ref())?;
        let outcome = if submission.blog_id.is_some() {
            api.update_blog(&submission).await
        } else {
            api.create_blog(&submission).await
        };
        if let Err(e) = &outcome {
            store.invalidate_on(e).await;
        }
        match self.finish_submit(outcome) {
            Ok(route) => {
                tracing::info!(title = %submission.title, "blog submitted");
                notifier.success(if self.is_update() { UPDATED } else { POSTED });
                Ok(route)
            }
            Err(e) => {
                if let Some(message) = &self.last_error {
                    notifier.error(message);
                }
                Err(e)
            }
        }
    }
}
