use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has successfully passed the
/// authentication layer: the role dispatch entry point, the profile endpoint,
/// and the student and professor feature sets.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware being
/// present on the router layer above this module. This guarantees that all handlers
/// receive a validated `AuthUser` struct containing the user's ID and role. Role
/// restrictions beyond "is authenticated" (student-only, professor-only) are
/// enforced inside the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /dashboard
        // The role dispatch entry point: redirects the principal to their role's
        // landing page, or back to /login when the stored role is unrecognized.
        .route("/dashboard", get(handlers::dashboard))
        // GET /me
        // Retrieves the currently authenticated user's profile data.
        .route("/me", get(handlers::get_me))
        // --- Student Feature Set ---
        // GET /student/dashboard
        // The student landing page: the student's own grades, rendered.
        .route("/student/dashboard", get(handlers::student_dashboard))
        // GET /student/grades
        // The same grade data as JSON, enriched with course code and title.
        .route("/student/grades", get(handlers::get_student_grades))
        // --- Professor Feature Set ---
        // GET /professor/dashboard
        // The professor landing page: the courses they teach, rendered.
        .route("/professor/dashboard", get(handlers::professor_dashboard))
        // GET /professor/courses
        // The professor's taught courses as JSON.
        .route("/professor/courses", get(handlers::get_professor_courses))
        // GET /professor/courses/{id}/roster
        // The enrolled students on one of the professor's courses, with grades
        // where recorded. **Strict ownership check** against the course.
        .route(
            "/professor/courses/{id}/roster",
            get(handlers::get_course_roster),
        )
        // POST /professor/courses/{id}/grades
        // Records (or re-records) a grade. Ownership and enrollment are enforced
        // in the repository query; one grade per (student, course).
        .route(
            "/professor/courses/{id}/grades",
            post(handlers::record_grade),
        )
}
