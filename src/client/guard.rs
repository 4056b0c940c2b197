//! Route guard
//!
//! Each protected page checks the guard itself when it mounts; nothing
//! enforces it centrally. Public paths are matched by prefix.

use super::session::SessionManager;

pub const LOGIN_ROUTE: &str = "/auth/login";
pub const HOME_ROUTE: &str = "/";
pub const REDIRECT_ROUTE: &str = "/connect/discord/redirect";

pub const PUBLIC_ROUTES: &[&str] = &[
    LOGIN_ROUTE,
    REDIRECT_ROUTE,
    "/auth/callback",
    "/auth/error",
    "/auth/success",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

pub fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTES.iter().any(|route| path.starts_with(route))
}

/// Decide whether a page at `path` may render
pub fn check(path: &str, session: &SessionManager) -> GuardDecision {
    if is_public_route(path) || session.is_authenticated() {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect(LOGIN_ROUTE)
    }
}

/// The login page sends already-authenticated users home
pub fn check_login_page(session: &SessionManager) -> GuardDecision {
    if session.is_authenticated() {
        GuardDecision::Redirect(HOME_ROUTE)
    } else {
        GuardDecision::Allow
    }
}

/// Backend URL that starts the provider login
pub fn login_url(backend_url: &str, provider: &str) -> String {
    format!(
        "{}/api/connect/{}",
        backend_url.trim_end_matches('/'),
        urlencoding::encode(provider)
    )
}
