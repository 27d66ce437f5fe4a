use crate::models::{
    AdminDashboardStats, Course, CreateCourseRequest, EnrollStudentRequest, Grade, GradeView,
    RosterEntry, Session, User, UserCredentials,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact with
/// the data layer without knowing the specific implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable and usable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    // Login lookup: identity joined with its password hash. Internal use only.
    async fn get_user_credentials(&self, email: &str) -> Option<UserCredentials>;
    // Admin action: creates an account with an already-hashed password.
    async fn create_user(&self, user: User, password_hash: String) -> Option<User>;
    async fn list_users(&self) -> Vec<User>;

    // --- Sessions ---
    // Creates a session expiring ttl_minutes from now.
    async fn create_session(&self, user_id: Uuid, ttl_minutes: i64) -> Option<Session>;
    // Resolves a session token to its user. Expired sessions resolve to None.
    async fn get_session_user(&self, session_id: Uuid) -> Option<User>;
    // Returns true if a session row was actually removed.
    async fn delete_session(&self, session_id: Uuid) -> bool;
    // Startup maintenance: drops all sessions past their expiry.
    async fn purge_expired_sessions(&self) -> u64;

    // --- Courses & Enrollment ---
    async fn create_course(&self, req: CreateCourseRequest) -> Option<Course>;
    async fn get_course(&self, id: Uuid) -> Option<Course>;
    async fn get_courses_for_professor(&self, professor_id: Uuid) -> Vec<Course>;
    // Idempotent operation: returns true if a row was inserted, false otherwise (conflict).
    async fn enroll_student(&self, enrollment: EnrollStudentRequest) -> bool;

    // --- Grades ---
    /// Upserts a grade. The row is only written when the course belongs to
    /// `professor_id` AND the student is enrolled; otherwise returns None.
    async fn record_grade(
        &self,
        course_id: Uuid,
        professor_id: Uuid,
        student_id: Uuid,
        score: f64,
    ) -> Option<Grade>;
    async fn get_grades_for_student(&self, student_id: Uuid) -> Vec<GradeView>;
    async fn get_course_roster(&self, course_id: Uuid) -> Vec<RosterEntry>;

    // --- Stats ---
    async fn get_stats(&self) -> AdminDashboardStats;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// get_user
    ///
    /// Retrieves identity data (id, email, name, role) needed for authentication
    /// and authorization.
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>("SELECT id, email, full_name, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// get_user_credentials
    ///
    /// Login lookup by email, including the stored bcrypt hash. The hash never
    /// travels further than the login handler's verify call.
    async fn get_user_credentials(&self, email: &str) -> Option<UserCredentials> {
        sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, role, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user_credentials error: {:?}", e);
            None
        })
    }

    /// create_user
    ///
    /// Inserts a new account record. Returns None on constraint violations
    /// (duplicate email) so the handler can map to a conflict response.
    async fn create_user(&self, user: User, password_hash: String) -> Option<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, full_name, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, full_name, role
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.role)
        .bind(&password_hash)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_user error: {:?}", e);
            None
        })
    }

    /// list_users
    ///
    /// Administrative listing of every account.
    async fn list_users(&self) -> Vec<User> {
        match sqlx::query_as::<_, User>(
            "SELECT id, email, full_name, role FROM users ORDER BY full_name ASC",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            }
        }
    }

    /// create_session
    ///
    /// Opens a login session. The expiry is computed server-side so that the
    /// cookie Max-Age and the row lifetime always agree.
    async fn create_session(&self, user_id: Uuid, ttl_minutes: i64) -> Option<Session> {
        let now = Utc::now();
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, created_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(now)
        .bind(now + Duration::minutes(ttl_minutes))
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_session error: {:?}", e);
            None
        })
    }

    /// get_session_user
    ///
    /// Resolves a session token to the owning user. The expiry check lives in
    /// the query: an expired session is indistinguishable from a missing one.
    async fn get_session_user(&self, session_id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.full_name, u.role
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_session_user error: {:?}", e);
            None
        })
    }

    /// delete_session
    ///
    /// Logout: removes the session row. Deleting an unknown token is not an
    /// error, it simply affects zero rows.
    async fn delete_session(&self, session_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_session error: {:?}", e);
                false
            }
        }
    }

    /// purge_expired_sessions
    ///
    /// Removes every session past its expiry. Called once at startup.
    async fn purge_expired_sessions(&self) -> u64 {
        match sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected(),
            Err(e) => {
                tracing::error!("purge_expired_sessions error: {:?}", e);
                0
            }
        }
    }

    /// create_course
    ///
    /// Inserts a new course. Returns None on constraint violations (unknown
    /// professor, duplicate code for the year).
    async fn create_course(&self, req: CreateCourseRequest) -> Option<Course> {
        sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (id, code, title, professor_id, year)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, code, title, professor_id, year
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&req.code)
        .bind(&req.title)
        .bind(req.professor_id)
        .bind(req.year)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_course error: {:?}", e);
            None
        })
    }

    /// get_course
    ///
    /// Simple retrieval by ID. Ownership decisions are made by the caller.
    async fn get_course(&self, id: Uuid) -> Option<Course> {
        sqlx::query_as::<_, Course>(
            "SELECT id, code, title, professor_id, year FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_course error: {:?}", e);
            None
        })
    }

    /// get_courses_for_professor
    ///
    /// Lists the courses taught by one professor, newest first.
    async fn get_courses_for_professor(&self, professor_id: Uuid) -> Vec<Course> {
        match sqlx::query_as::<_, Course>(
            r#"
            SELECT id, code, title, professor_id, year
            FROM courses
            WHERE professor_id = $1
            ORDER BY year DESC, code ASC
            "#,
        )
        .bind(professor_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(courses) => courses,
            Err(e) => {
                tracing::error!("get_courses_for_professor error: {:?}", e);
                vec![]
            }
        }
    }

    /// enroll_student
    ///
    /// Inserts an enrollment. Uses `ON CONFLICT DO NOTHING` to ensure **idempotency**.
    /// The function returns true only if a new row was inserted (`rows_affected > 0`).
    async fn enroll_student(&self, enrollment: EnrollStudentRequest) -> bool {
        let result = sqlx::query(
            "INSERT INTO enrollments (student_id, course_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(enrollment.student_id)
        .bind(enrollment.course_id)
        .execute(&self.pool)
        .await;
        match result {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                // A true conflict (already enrolled) does not error, only database
                // errors (unknown student/course) are caught here.
                tracing::error!("enroll_student error: {:?}", e);
                false
            }
        }
    }

    /// record_grade
    ///
    /// Upserts a grade. The guarded SELECT feeding the INSERT enforces both the
    /// **Owner-Only** check (the course must belong to `professor_id`) and the
    /// enrollment requirement; when either fails, no row is written and the
    /// conflict branch never fires.
    async fn record_grade(
        &self,
        course_id: Uuid,
        professor_id: Uuid,
        student_id: Uuid,
        score: f64,
    ) -> Option<Grade> {
        sqlx::query_as::<_, Grade>(
            r#"
            INSERT INTO grades (student_id, course_id, score, recorded_at, updated_at)
            SELECT $1, $2, $3, NOW(), NOW()
            WHERE EXISTS (
                SELECT 1 FROM courses c WHERE c.id = $2 AND c.professor_id = $4
            )
            AND EXISTS (
                SELECT 1 FROM enrollments e WHERE e.student_id = $1 AND e.course_id = $2
            )
            ON CONFLICT (student_id, course_id)
            DO UPDATE SET score = EXCLUDED.score, updated_at = NOW()
            RETURNING id, student_id, course_id, score, recorded_at, updated_at
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .bind(score)
        .bind(professor_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("record_grade error: {:?}", e);
            None
        })
    }

    /// get_grades_for_student
    ///
    /// Retrieves a student's grades enriched with course code and title
    /// (a join operation).
    async fn get_grades_for_student(&self, student_id: Uuid) -> Vec<GradeView> {
        match sqlx::query_as::<_, GradeView>(
            r#"
            SELECT g.course_id, c.code AS course_code, c.title AS course_title,
                   g.score, g.updated_at
            FROM grades g
            JOIN courses c ON c.id = g.course_id
            WHERE g.student_id = $1
            ORDER BY c.year DESC, c.code ASC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(grades) => grades,
            Err(e) => {
                tracing::error!("get_grades_for_student error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_course_roster
    ///
    /// Lists every enrolled student on a course with their grade, if recorded.
    /// The LEFT JOIN keeps ungraded students on the roster with a NULL score.
    async fn get_course_roster(&self, course_id: Uuid) -> Vec<RosterEntry> {
        match sqlx::query_as::<_, RosterEntry>(
            r#"
            SELECT u.id AS student_id, u.full_name, u.email, g.score
            FROM enrollments e
            JOIN users u ON u.id = e.student_id
            LEFT JOIN grades g
                   ON g.student_id = e.student_id AND g.course_id = e.course_id
            WHERE e.course_id = $1
            ORDER BY u.full_name ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(roster) => roster,
            Err(e) => {
                tracing::error!("get_course_roster error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_stats
    ///
    /// Compiles all necessary counters for the administrative dashboard in a single call.
    async fn get_stats(&self) -> AdminDashboardStats {
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        let total_courses = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        let total_enrollments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        let total_grades = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM grades")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        AdminDashboardStats {
            total_users,
            total_courses,
            total_enrollments,
            total_grades,
        }
    }
}
