//! Session storage and the access guard
//!
//! This module gates protected dashboard views on the stored bearer token.
//!
//! # Module Structure
//!
//! - [`auth::session`](crate::auth::session) - token storage (`SessionStore`, in-memory and file-backed)
//! - [`auth::guard`](crate::auth::guard) - `AccessGuard`, the session check trait and the navigator seam
//! - [`auth::jwt`](crate::auth::jwt) - signature/expiry validated session check and token fingerprints
//!
//! # Policy
//!
//! The guard fails closed: a missing token, an empty token or unreadable
//! storage are all "unauthenticated". There is no error state; the guard
//! redirects to the login path (default `/auth`) once per transition and
//! renders the fallback view, or nothing.
//!
//! # Usage
//!
//! ```ignore
//! use voxa::auth::{guard::AccessGuard, session::FileSessionStore};
//!
//! let store = Arc::new(FileSessionStore::new("~/.voxa/session.json"));
//! let mut guard = AccessGuard::for_store(store, navigator);
//!
//! match guard.guard(|| render_dashboard(), None).await {
//!     Rendered::Protected(view) => show(view),
//!     _ => {}
//! }
//! ```

/// Access guard for protected views.
pub mod guard;
/// JWT validated session check and token fingerprints.
pub mod jwt;
/// Bearer token storage.
pub mod session;

pub use guard::{
    AccessGuard, GuardPhase, Navigator, Rendered, SessionCheck, StoredTokenCheck,
    DEFAULT_LOGIN_PATH,
};
pub use jwt::{token_fingerprint, JwtSessionCheck, TokenVerifier};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore, SessionWriter};
