use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles & Dashboard Dispatch ---

/// Role
///
/// Closed enumeration classifying a principal as administrator, professor, or student.
/// The database stores roles as free-form strings; `Role::parse` is the single point
/// where a stored value enters the closed set. Anything unrecognized stays outside
/// the enum and takes the login fallback at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Professor,
    Student,
}

impl Role {
    /// Parses a stored role value. Case-insensitive: legacy rows carrying
    /// uppercase values ('ADMIN') still classify.
    pub fn parse(value: &str) -> Option<Role> {
        if value.eq_ignore_ascii_case("admin") {
            Some(Role::Admin)
        } else if value.eq_ignore_ascii_case("professor") {
            Some(Role::Professor)
        } else if value.eq_ignore_ascii_case("student") {
            Some(Role::Student)
        } else {
            None
        }
    }

    /// The canonical lowercase storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Professor => "professor",
            Role::Student => "student",
        }
    }

    /// The landing page each role is sent to after login.
    pub fn landing_route(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Professor => "/professor/dashboard",
            Role::Student => "/student/dashboard",
        }
    }
}

/// dashboard_destination
///
/// The role router: a pure, stateless total function mapping a (possibly absent)
/// role to exactly one redirect target. Recognized roles go to their landing page;
/// an absent or unrecognized role falls back to the login page.
pub fn dashboard_destination(role: Option<Role>) -> &'static str {
    match role {
        Some(role) => role.landing_route(),
        None => "/login",
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents the user's canonical identity record stored in the `users` table,
/// minus credentials. This is the shape resolved during authentication and the
/// only user shape that is ever serialized outward.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    // The user's primary identifier (university email).
    pub email: String,
    pub full_name: String,
    // The RBAC field: 'admin', 'professor' or 'student'. Kept as the raw stored
    // string; classification happens through `Role::parse`.
    pub role: String,
}

/// UserCredentials
///
/// Internal row used exclusively by the login flow: the identity record joined
/// with its bcrypt password hash. Never serialized; the hash must not leave
/// the repository/handler boundary.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub password_hash: String,
}

/// Session
///
/// A server-side login session row. The `id` doubles as the cookie token;
/// rows past `expires_at` are treated as absent by the resolution query.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Course
///
/// A taught course from the `courses` table. `professor_id` is the FK used for
/// all Owner-Only checks on grade entry and roster access.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    // Short registrar code, e.g. "CS4102".
    pub code: String,
    pub title: String,
    pub professor_id: Uuid,
    pub year: i32,
}

/// Grade
///
/// A recorded grade from the `grades` table. One row per (student, course);
/// re-recording updates the row in place.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Grade {
    // BigInt (i64) surrogate key due to the high volume potential.
    pub id: i64,
    pub student_id: Uuid,
    pub course_id: Uuid,
    // Percentage score, 0.0 to 100.0. Range is enforced at the handler boundary.
    pub score: f64,
    #[ts(type = "string")]
    pub recorded_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Form payload for the login endpoint (POST /login). The password is verified
/// against the stored bcrypt hash and never persisted or logged.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CreateUserRequest
///
/// Input payload for administrative account creation (POST /admin/users).
/// The plaintext password is hashed in the handler before it reaches storage.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
}

/// CreateCourseRequest
///
/// Input payload for course creation (POST /admin/courses).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCourseRequest {
    pub code: String,
    pub title: String,
    pub professor_id: Uuid,
    pub year: i32,
}

/// EnrollStudentRequest
///
/// Input payload for enrolling a student on a course (POST /admin/enrollments).
/// The (student, course) pair is the composite key; enrollment is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EnrollStudentRequest {
    pub student_id: Uuid,
    pub course_id: Uuid,
}

/// RecordGradeRequest
///
/// Input payload for a professor recording a grade
/// (POST /professor/courses/{id}/grades).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RecordGradeRequest {
    pub student_id: Uuid,
    pub score: f64,
}

// --- Dashboard & Profile Schemas (Output) ---

/// UserProfile
///
/// Output schema for the authenticated user's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

/// GradeView
///
/// A student's grade enriched with course details (a join operation).
/// This is the shape the student dashboard and GET /student/grades return.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct GradeView {
    pub course_id: Uuid,
    pub course_code: String,
    pub course_title: String,
    pub score: f64,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// RosterEntry
///
/// One enrolled student on a course roster, with their grade if one has been
/// recorded. `score` is None for enrolled-but-ungraded students (LEFT JOIN).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct RosterEntry {
    pub student_id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// AdminDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_courses: i64,
    pub total_enrollments: i64,
    pub total_grades: i64,
}
