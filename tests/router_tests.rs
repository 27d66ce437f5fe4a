use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use grades_portal::{
    AppState,
    config::AppConfig,
    create_router,
    models::{
        AdminDashboardStats, Course, CreateCourseRequest, EnrollStudentRequest, Grade, GradeView,
        RosterEntry, Session, User, UserCredentials,
    },
    repository::Repository,
};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// --- Mock Repository ---

// Fixed identities used across the router tests.
const USER_ID: Uuid = Uuid::from_u128(11);
const SESSION_ID: Uuid = Uuid::from_u128(77);

/// A mock repository holding one account and one issuable session. Which role
/// the account has is the only thing most tests need to vary.
struct SingleUserRepo {
    user: User,
    password_hash: String,
}

impl SingleUserRepo {
    fn with_role(role: &str) -> Self {
        Self {
            user: User {
                id: USER_ID,
                email: "user@example.edu".to_string(),
                full_name: "Uli User".to_string(),
                role: role.to_string(),
            },
            password_hash: bcrypt::hash("passw0rd", 4).unwrap(),
        }
    }
}

#[async_trait]
impl Repository for SingleUserRepo {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        (id == self.user.id).then(|| self.user.clone())
    }
    async fn get_user_credentials(&self, email: &str) -> Option<UserCredentials> {
        (email == self.user.email).then(|| UserCredentials {
            id: self.user.id,
            email: self.user.email.clone(),
            role: self.user.role.clone(),
            password_hash: self.password_hash.clone(),
        })
    }
    async fn create_user(&self, user: User, _password_hash: String) -> Option<User> {
        Some(user)
    }
    async fn list_users(&self) -> Vec<User> {
        vec![self.user.clone()]
    }
    async fn create_session(&self, user_id: Uuid, _ttl_minutes: i64) -> Option<Session> {
        Some(Session {
            id: SESSION_ID,
            user_id,
            ..Session::default()
        })
    }
    async fn get_session_user(&self, session_id: Uuid) -> Option<User> {
        (session_id == SESSION_ID).then(|| self.user.clone())
    }
    async fn delete_session(&self, _session_id: Uuid) -> bool {
        true
    }
    async fn purge_expired_sessions(&self) -> u64 {
        0
    }
    async fn create_course(&self, _req: CreateCourseRequest) -> Option<Course> {
        None
    }
    async fn get_course(&self, _id: Uuid) -> Option<Course> {
        None
    }
    async fn get_courses_for_professor(&self, _professor_id: Uuid) -> Vec<Course> {
        vec![]
    }
    async fn enroll_student(&self, _enrollment: EnrollStudentRequest) -> bool {
        true
    }
    async fn record_grade(
        &self,
        _course_id: Uuid,
        _professor_id: Uuid,
        _student_id: Uuid,
        _score: f64,
    ) -> Option<Grade> {
        None
    }
    async fn get_grades_for_student(&self, _student_id: Uuid) -> Vec<GradeView> {
        vec![]
    }
    async fn get_course_roster(&self, _course_id: Uuid) -> Vec<RosterEntry> {
        vec![]
    }
    async fn get_stats(&self) -> AdminDashboardStats {
        AdminDashboardStats {
            total_users: 1,
            ..AdminDashboardStats::default()
        }
    }
}

// --- Test Utilities ---

/// Builds the full application router (AppConfig::default() is Env::Local,
/// so the x-user-id bypass is active) around the given mock repository.
fn app(repo: SingleUserRepo) -> Router {
    create_router(AppState {
        repo: Arc::new(repo),
        config: AppConfig::default(),
    })
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location_of(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response carries no Location header")
        .to_str()
        .unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_index_renders() {
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("University Grades Portal"));
}

#[tokio::test]
async fn test_login_page_shows_logout_notice() {
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(
            Request::builder()
                .uri("/login?logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("You have been signed out."));
}

#[tokio::test]
async fn test_dashboard_requires_authentication() {
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/login");
}

#[tokio::test]
async fn test_dashboard_dispatches_admin_via_bypass() {
    let response = app(SingleUserRepo::with_role("admin"))
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .header("x-user-id", USER_ID.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/admin/dashboard");
}

#[tokio::test]
async fn test_full_login_then_dashboard_flow() {
    // 1. Submit credentials.
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=user%40example.edu&password=passw0rd"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/dashboard");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set the session cookie")
        .to_str()
        .unwrap()
        .to_string();
    // Only the name=value pair travels back on subsequent requests.
    let cookie_pair = cookie.split(';').next().unwrap().to_string();
    assert_eq!(cookie_pair, format!("session_token={}", SESSION_ID));

    // 2. Follow the redirect with the issued cookie.
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .header(header::COOKIE, cookie_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/student/dashboard");
}

#[tokio::test]
async fn test_login_bad_credentials_redirects_to_error() {
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=user%40example.edu&password=wrong"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/login?error");
}

#[tokio::test]
async fn test_logout_always_redirects_with_cleared_cookie() {
    // Without any session cookie at all.
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(Request::builder().uri("/logout").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/login?logout");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_admin_stats_forbidden_for_student_session() {
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(
            Request::builder()
                .uri("/admin/stats")
                .header("x-user-id", USER_ID.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_stats_ok_for_admin_session() {
    let response = app(SingleUserRepo::with_role("admin"))
        .oneshot(
            Request::builder()
                .uri("/admin/stats")
                .header("x-user-id", USER_ID.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let stats: AdminDashboardStats = serde_json::from_str(&body).unwrap();
    assert_eq!(stats.total_users, 1);
}

#[tokio::test]
async fn test_student_dashboard_renders_for_student() {
    let response = app(SingleUserRepo::with_role("student"))
        .oneshot(
            Request::builder()
                .uri("/student/dashboard")
                .header("x-user-id", USER_ID.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Uli User"));
    assert!(body.contains("No grades recorded yet."));
}
