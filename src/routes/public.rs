use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in): the index and login views, the credential flows,
/// and the health probe.
///
/// Security Mandate:
/// Nothing in this module may release grade, roster, or account data. The only
/// state transition available here is opening a session via valid credentials
/// (POST /login) and releasing one (GET /logout).
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Renders the index view.
        .route("/", get(handlers::index))
        // GET /login?error / ?logout
        // Renders the login view; the flags select the notice shown above the form.
        // POST /login
        // Verifies credentials, opens a session, sets the session cookie and
        // redirects to /dashboard. Failures redirect back to /login?error.
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_submit),
        )
        // GET /logout
        // Invalidates the current session (if any), clears the cookie, and
        // redirects to /login?logout. Deliberately outside the authenticated
        // router: logout must complete even with an expired or absent session.
        .route("/logout", get(handlers::logout))
}
