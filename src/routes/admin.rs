use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the 'admin' role.
/// These endpoints cover account management, course setup, enrollment, and
/// statistical oversight.
///
/// Access Control:
/// This entire router is nested behind the authentication middleware; the
/// `role='admin'` permission is then explicitly checked inside every handler
/// before any repository access. This prevents unauthorized access to
/// account-management functions even for valid non-admin sessions.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/dashboard
        // The administrative landing page: aggregate statistics, rendered.
        .route("/dashboard", get(handlers::admin_dashboard))
        // GET /admin/stats
        // The same aggregate counters (users, courses, enrollments, grades) as JSON.
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/users
        // Lists every account in the system.
        // POST /admin/users
        // Creates an account. Passwords are bcrypt-hashed before storage.
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        // POST /admin/courses
        // Creates a course assigned to a professor.
        .route("/courses", post(handlers::create_course))
        // POST /admin/enrollments
        // Enrolls a student on a course. Idempotent via the composite primary key.
        .route("/enrollments", post(handlers::enroll_student))
}
