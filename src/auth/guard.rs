use crate::auth::session::{Session, SessionStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Login path used when no redirect target is configured.
pub const DEFAULT_LOGIN_PATH: &str = "/auth";

/// Decides whether the current user is authenticated.
///
/// The check is async so a network-validated check can replace the stored
/// token check without changing the guard contract. Implementations fail
/// closed: any problem reading or validating the session is `false`.
#[async_trait]
pub trait SessionCheck: Send + Sync {
    async fn is_authenticated(&self) -> bool;
}

/// Authenticated whenever the session storage holds a non-empty token.
pub struct StoredTokenCheck {
    store: Arc<dyn SessionStore>,
}

impl StoredTokenCheck {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SessionCheck for StoredTokenCheck {
    async fn is_authenticated(&self) -> bool {
        Session::read(self.store.as_ref()).is_authenticated()
    }
}

/// Performs client-side redirects.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Where the guard is in its session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPhase {
    /// The check has not resolved yet.
    Loading,
    Authenticated,
    Unauthenticated,
}

/// What a guarded view renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<V> {
    /// No output (loading, or unauthenticated without a fallback).
    Nothing,
    /// The fallback view of an unauthenticated user.
    Fallback(V),
    /// The protected view.
    Protected(V),
}

impl<V> Rendered<V> {
    pub fn is_protected(&self) -> bool {
        matches!(self, Rendered::Protected(_))
    }

    pub fn into_inner(self) -> Option<V> {
        match self {
            Rendered::Nothing => None,
            Rendered::Fallback(v) | Rendered::Protected(v) => Some(v),
        }
    }
}

/// Gates one protected view on the session check.
///
/// A guard instance performs a single session read on first use; the
/// redirect to the login path fires once per transition into the
/// unauthenticated phase, never on re-render.
pub struct AccessGuard {
    check: Arc<dyn SessionCheck>,
    navigator: Arc<dyn Navigator>,
    redirect_to: String,
    phase: GuardPhase,
}

impl AccessGuard {
    pub fn new(check: Arc<dyn SessionCheck>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            check,
            navigator,
            redirect_to: DEFAULT_LOGIN_PATH.to_string(),
            phase: GuardPhase::Loading,
        }
    }

    /// Guard backed by the stored token check.
    pub fn for_store(store: Arc<dyn SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self::new(Arc::new(StoredTokenCheck::new(store)), navigator)
    }

    /// Overrides the redirect target.
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = path.into();
        self
    }

    pub fn phase(&self) -> GuardPhase {
        self.phase
    }

    pub fn redirect_target(&self) -> &str {
        &self.redirect_to
    }

    /// Resolves the session check if it hasn't been resolved yet.
    pub async fn evaluate(&mut self) -> GuardPhase {
        if self.phase == GuardPhase::Loading {
            self.reevaluate().await
        } else {
            self.phase
        }
    }

    /// Re-runs the session check, e.g. after the storage changed.
    pub async fn reevaluate(&mut self) -> GuardPhase {
        let next = if self.check.is_authenticated().await {
            GuardPhase::Authenticated
        } else {
            GuardPhase::Unauthenticated
        };
        self.transition(next);
        next
    }

    fn transition(&mut self, next: GuardPhase) {
        if next == GuardPhase::Unauthenticated && self.phase != GuardPhase::Unauthenticated {
            info!("Session is not authenticated, redirecting to {}", self.redirect_to);
            self.navigator.navigate(&self.redirect_to);
        } else {
            debug!("Guard phase {:?} -> {:?}", self.phase, next);
        }
        self.phase = next;
    }

    /// Renders for the current phase without re-checking the session.
    ///
    /// `children` is only invoked when authenticated.
    pub fn render<V>(&self, children: impl FnOnce() -> V, fallback: Option<V>) -> Rendered<V> {
        match self.phase {
            GuardPhase::Loading => Rendered::Nothing,
            GuardPhase::Authenticated => Rendered::Protected(children()),
            GuardPhase::Unauthenticated => match fallback {
                Some(view) => Rendered::Fallback(view),
                None => Rendered::Nothing,
            },
        }
    }

    /// Evaluates on first use, then renders.
    pub async fn guard<V>(
        &mut self,
        children: impl FnOnce() -> V,
        fallback: Option<V>,
    ) -> Rendered<V> {
        self.evaluate().await;
        self.render(children, fallback)
    }
}
