//! Shared plumbing for quire: the server boundary, models, configuration and
//! session persistence.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod response;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use crate::client::{BlogApi, HttpClient};
pub use crate::config::{
    Config, FileSessionStore, MemorySessionStore, SessionPersistence, DEFAULT_ENDPOINT,
};
pub use crate::error::{ParseError, QuireError};
pub use crate::models::{
    Author, Blog, BlogSubmission, CoverUpload, LoginRequest, RegisterRequest, StoredSession, User,
};
pub use crate::response::{ApiFailure, ApiReply};
