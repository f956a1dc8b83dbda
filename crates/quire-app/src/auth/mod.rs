mod state;
pub use state::AuthState;

mod store;
pub use store::SessionStore;

use miette::Diagnostic;
use quire_common::{BlogApi, QuireError, SessionPersistence, StoredSession};

use crate::guards::Route;
use crate::notify::Notifier;
use crate::validation::{LoginForm, RegisterForm, Validation};

pub const LOGIN_SUCCESS: &str = "Successfully Logged into quire";
pub const REGISTER_SUCCESS: &str = "Signed Up Successfully";
pub const LOGOUT_SUCCESS: &str = "Logout Successful!";

/// Result of attempting to restore a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreResult {
    /// Session was successfully restored
    Restored,
    /// No saved session was found
    NoSession,
    /// Session was found but unreadable and has been cleared
    SessionExpired,
}

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum AuthError {
    #[error("invalid form: {0}")]
    #[diagnostic(code(quire::auth::invalid))]
    Invalid(Validation),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Api(QuireError),

    /// The server accepted the login but the session could not be kept.
    #[error("could not store session")]
    #[diagnostic(code(quire::auth::storage))]
    Storage(#[source] QuireError),
}

/// Validate, log in, and keep the returned user with the credential the
/// server handed out. Returns where to go next.
pub async fn login<A, P>(
    api: &A,
    store: &SessionStore<P>,
    notifier: &impl Notifier,
    form: &LoginForm,
) -> Result<Route, AuthError>
where
    A: BlogApi + Sync,
    P: SessionPersistence,
{
    let validation = form.validate();
    if !validation.valid() {
        return Err(AuthError::Invalid(validation));
    }
    let user = match api.login(&form.to_request()).await {
        Ok(user) => user,
        Err(e) => {
            notifier.error(&e.user_message());
            return Err(AuthError::Api(e));
        }
    };
    let session = StoredSession {
        user,
        credential: api.credential(),
    };
    if let Err(e) = store.set_session(session).await {
        notifier.error(&e.user_message());
        return Err(AuthError::Storage(e));
    }
    tracing::info!("logged in");
    notifier.success(LOGIN_SUCCESS);
    Ok(Route::Home)
}

/// Create an account. No session is created; the user logs in next.
pub async fn register<A>(
    api: &A,
    notifier: &impl Notifier,
    form: &RegisterForm,
) -> Result<Route, AuthError>
where
    A: BlogApi + Sync,
{
    let validation = form.validate();
    if !validation.valid() {
        return Err(AuthError::Invalid(validation));
    }
    match api.register(&form.to_request()).await {
        Ok(_) => {
            tracing::info!("registered");
            notifier.success(REGISTER_SUCCESS);
            Ok(Route::Login)
        }
        Err(e) => {
            notifier.error(&e.user_message());
            Err(AuthError::Api(e))
        }
    }
}

/// Log out on the server, then locally. When the server refuses, the user
/// stays logged in and there is nowhere to go.
pub async fn logout<A, P>(
    api: &A,
    store: &SessionStore<P>,
    notifier: &impl Notifier,
) -> Result<Route, AuthError>
where
    A: BlogApi + Sync,
    P: SessionPersistence,
{
    if let Err(e) = api.logout().await {
        tracing::warn!("logout failed: {e}");
        notifier.error(&e.user_message());
        return Err(AuthError::Api(e));
    }
    if let Err(e) = store.clear_session().await {
        notifier.error(&e.user_message());
        return Err(AuthError::Storage(e));
    }
    tracing::info!("logged out");
    notifier.success(LOGOUT_SUCCESS);
    Ok(Route::Login)
}
