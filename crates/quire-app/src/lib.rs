//! quire-app: the client's workflows without any front end.
//!
//! - `auth` - session store, restore, login, register and logout
//! - `guards` - routes and session gates
//! - `validation` - form schemas
//! - `authoring` - drafting and submitting a blog
//! - `views` - my blogs, explore and blog detail

pub mod auth;
pub mod authoring;
pub mod guards;
pub mod notify;
pub mod validation;
pub mod views;

#[cfg(test)]
pub(crate) mod mock;

pub use auth::{AuthError, AuthState, RestoreResult, SessionStore};
pub use authoring::{AuthoringError, AuthoringSession, AuthoringState, CoverImage, Preview};
pub use guards::{Guarded, Route, require_auth, require_no_auth};
pub use notify::{Notification, NotificationLog, Notifier, TracingNotifier};
pub use validation::{LoginForm, RegisterForm, Validation};
pub use views::{BlogCard, BlogDetail, BlogView, Explore, MyBlogs, ViewState};
