//! Route gates in front of protected views.
//!
//! Guards only read the session. The one side effect is the expiry clearing
//! that [`SessionManager::is_session_active`] performs on a stale session.
//! Role checks come from unverified claims and are a navigation convenience;
//! the server still authorizes every call.

use crate::session::SessionManager;

/// Where unauthenticated visitors are sent.
pub const SIGN_IN_ROUTE: &str = "/login";

/// Default authenticated area.
pub const LANDING_ROUTE: &str = "/app";

/// Outcome of evaluating a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToSignIn,
    RedirectToLanding,
}

impl GuardDecision {
    /// Target route for redirects; `None` when the view may render.
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::RedirectToSignIn => Some(SIGN_IN_ROUTE),
            Self::RedirectToLanding => Some(LANDING_ROUTE),
        }
    }
}

/// Gate attached to a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Any active session.
    RequireSession,
    /// Active session whose identity token carries the role.
    RequireRole(String),
    /// The sign-in view itself; active sessions skip it.
    SignInPage,
}

impl Guard {
    pub fn require_role(role: impl Into<String>) -> Self {
        Self::RequireRole(role.into())
    }

    pub fn evaluate(&self, session: &SessionManager) -> GuardDecision {
        let active = session.is_session_active();
        let decision = match self {
            Self::RequireSession if active => GuardDecision::Allow,
            Self::RequireSession => GuardDecision::RedirectToSignIn,
            Self::RequireRole(_) if !active => GuardDecision::RedirectToSignIn,
            Self::RequireRole(role) if session.has_role(role) => GuardDecision::Allow,
            Self::RequireRole(_) => GuardDecision::RedirectToLanding,
            Self::SignInPage if active => GuardDecision::RedirectToLanding,
            Self::SignInPage => GuardDecision::Allow,
        };
        if decision != GuardDecision::Allow {
            tracing::debug!(guard = ?self, ?decision, "guard redirect");
        }
        decision
    }
}
