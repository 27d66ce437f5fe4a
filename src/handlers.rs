use crate::{
    AppState,
    auth::{self, AuthUser},
    models::{
        AdminDashboardStats, Course, CreateCourseRequest, CreateUserRequest,
        EnrollStudentRequest, Grade, GradeView, LoginRequest, RecordGradeRequest, Role,
        RosterEntry, User, UserProfile, dashboard_destination,
    },
};
use askama::Template;
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Templates ---

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: bool,
    logged_out: bool,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
struct AdminDashboardTemplate {
    stats: AdminDashboardStats,
}

#[derive(Template)]
#[template(path = "professor_dashboard.html")]
struct ProfessorDashboardTemplate {
    full_name: String,
    courses: Vec<Course>,
}

#[derive(Template)]
#[template(path = "student_dashboard.html")]
struct StudentDashboardTemplate {
    full_name: String,
    grades: Vec<GradeView>,
}

/// Renders a template to a response, mapping template failures to a 500.
fn render<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("template render error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// --- Filter Structs ---

/// LoginPageQuery
///
/// Accepted query flags for the login page: `?error` after a failed attempt,
/// `?logout` after a completed logout. Only presence matters.
#[derive(Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
    pub logout: Option<String>,
}

// --- View & Flow Handlers ---

/// index
///
/// [Public Route] Renders the index view.
pub async fn index() -> Response {
    render(IndexTemplate {})
}

/// login_page
///
/// [Public Route] Renders the login view. The `?error` and `?logout` flags
/// select the notice shown above the form.
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Response {
    render(LoginTemplate {
        error: query.error.is_some(),
        logged_out: query.logout.is_some(),
    })
}

/// login_submit
///
/// [Public Route] Verifies submitted credentials and opens a session.
///
/// *Flow*: resolves the stored credentials by email, verifies the password
/// against the bcrypt hash, creates the session row, sets the cookie and
/// redirects to /dashboard. Every failure path redirects back to /login?error;
/// unknown email and wrong password are deliberately indistinguishable.
pub async fn login_submit(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> Response {
    let Some(credentials) = state.repo.get_user_credentials(&payload.email).await else {
        return Redirect::to("/login?error").into_response();
    };

    let verified = bcrypt::verify(&payload.password, &credentials.password_hash).unwrap_or(false);
    if !verified {
        return Redirect::to("/login?error").into_response();
    }

    match state
        .repo
        .create_session(credentials.id, state.config.session_ttl_minutes)
        .await
    {
        Some(session) => {
            let cookie = auth::session_cookie(session.id, state.config.session_ttl_minutes);
            ([(header::SET_COOKIE, cookie)], Redirect::to("/dashboard")).into_response()
        }
        None => {
            tracing::error!("login_submit: session creation failed for {}", credentials.id);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// logout
///
/// [Public Route] Invalidates the current session and clears the cookie.
///
/// Deliberately does not use the AuthUser extractor: logout must complete for
/// any caller, whether their session is live, expired, or absent. The single
/// exit path always clears the cookie and always redirects to /login?logout.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(session_id) = auth::session_token(&headers) {
        // Result ignored: deleting an unknown/expired session is still a clean logout.
        state.repo.delete_session(session_id).await;
    }
    (
        [(header::SET_COOKIE, auth::cleared_session_cookie())],
        Redirect::to("/login?logout"),
    )
}

/// dashboard
///
/// [Authenticated Route] Dispatches the authenticated principal to their role's
/// landing page. The match over the closed Role enumeration lives in
/// `models::dashboard_destination`; a stored role outside the enumeration
/// falls back to the login page.
pub async fn dashboard(AuthUser { role, .. }: AuthUser) -> Redirect {
    Redirect::to(dashboard_destination(Role::parse(&role)))
}

// --- Profile Handlers ---

/// get_me
///
/// [Authenticated Route] Provides the authenticated user's profile information.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, StatusCode> {
    match state.repo.get_user(id).await {
        Some(user) => Ok(Json(UserProfile {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        })),
        // The account disappeared between session resolution and this lookup.
        None => Err(StatusCode::NOT_FOUND),
    }
}

// --- Student Handlers ---

/// student_dashboard
///
/// [Authenticated Route] Renders the student landing page with the student's
/// own grades.
///
/// *RBAC*: Strict enforcement of the student role before any data access.
pub async fn student_dashboard(
    AuthUser { id, role }: AuthUser,
    State(state): State<AppState>,
) -> Response {
    if Role::parse(&role) != Some(Role::Student) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let full_name = match state.repo.get_user(id).await {
        Some(user) => user.full_name,
        None => return StatusCode::NOT_FOUND.into_response(),
    };
    let grades = state.repo.get_grades_for_student(id).await;
    render(StudentDashboardTemplate { full_name, grades })
}

/// get_student_grades
///
/// [Authenticated Route] Lists the authenticated student's grades, enriched
/// with course details.
#[utoipa::path(
    get,
    path = "/student/grades",
    responses((status = 200, description = "My Grades", body = [GradeView]))
)]
pub async fn get_student_grades(
    AuthUser { id, role }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<GradeView>>, StatusCode> {
    if Role::parse(&role) != Some(Role::Student) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_grades_for_student(id).await))
}

// --- Professor Handlers ---

/// professor_dashboard
///
/// [Authenticated Route] Renders the professor landing page with the courses
/// they teach.
pub async fn professor_dashboard(
    AuthUser { id, role }: AuthUser,
    State(state): State<AppState>,
) -> Response {
    if Role::parse(&role) != Some(Role::Professor) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let full_name = match state.repo.get_user(id).await {
        Some(user) => user.full_name,
        None => return StatusCode::NOT_FOUND.into_response(),
    };
    let courses = state.repo.get_courses_for_professor(id).await;
    render(ProfessorDashboardTemplate { full_name, courses })
}

/// get_professor_courses
///
/// [Authenticated Route] Lists the courses taught by the authenticated professor.
#[utoipa::path(
    get,
    path = "/professor/courses",
    responses((status = 200, description = "My Courses", body = [Course]))
)]
pub async fn get_professor_courses(
    AuthUser { id, role }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Course>>, StatusCode> {
    if Role::parse(&role) != Some(Role::Professor) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_courses_for_professor(id).await))
}

/// get_course_roster
///
/// [Authenticated Route] Lists the enrolled students on one of the professor's
/// courses, with grades where recorded.
///
/// *Authorization*: professor role required, and the course must belong to the
/// requesting professor.
#[utoipa::path(
    get,
    path = "/professor/courses/{id}/roster",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Roster", body = [RosterEntry]),
        (status = 403, description = "Not Teaching This Course"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_course_roster(
    AuthUser { id: user_id, role }: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<RosterEntry>>, StatusCode> {
    if Role::parse(&role) != Some(Role::Professor) {
        return Err(StatusCode::FORBIDDEN);
    }
    let course = state
        .repo
        .get_course(course_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    if course.professor_id != user_id {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_course_roster(course_id).await))
}

/// record_grade
///
/// [Authenticated Route] Records (or re-records) a grade for a student on a course.
///
/// *Authorization*: The repository query enforces the **Owner-Only** check (the
/// course must belong to the requesting professor) and the enrollment requirement.
/// If either fails, the query affects 0 rows and a 404 is returned.
#[utoipa::path(
    post,
    path = "/professor/courses/{id}/grades",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = RecordGradeRequest,
    responses(
        (status = 200, description = "Recorded", body = Grade),
        (status = 404, description = "Not Found, Not Owner, or Not Enrolled"),
        (status = 422, description = "Score Out Of Range")
    )
)]
pub async fn record_grade(
    AuthUser { id: user_id, role }: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<RecordGradeRequest>,
) -> Result<Json<Grade>, StatusCode> {
    if Role::parse(&role) != Some(Role::Professor) {
        return Err(StatusCode::FORBIDDEN);
    }
    if !(0.0..=100.0).contains(&payload.score) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    match state
        .repo
        .record_grade(course_id, user_id, payload.student_id, payload.score)
        .await
    {
        Some(grade) => Ok(Json(grade)),
        // Unknown course, not the owner, or the student is not enrolled.
        None => Err(StatusCode::NOT_FOUND),
    }
}

// --- Admin Handlers ---

/// admin_dashboard
///
/// [Admin Route] Renders the administrative landing page with aggregate statistics.
pub async fn admin_dashboard(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Response {
    if Role::parse(&role) != Some(Role::Admin) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let stats = state.repo.get_stats().await;
    render(AdminDashboardTemplate { stats })
}

/// get_admin_stats
///
/// [Admin Route] Retrieves core application statistics for the dashboard.
///
/// *Authorization*: Explicitly checks for the admin role.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = AdminDashboardStats))
)]
pub async fn get_admin_stats(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, StatusCode> {
    if Role::parse(&role) != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_stats().await))
}

/// list_users
///
/// [Admin Route] Lists every account in the system.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn list_users(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, StatusCode> {
    if Role::parse(&role) != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.list_users().await))
}

/// create_user
///
/// [Admin Route] Creates an account. The plaintext password is hashed here;
/// only the bcrypt hash reaches the repository.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Created", body = User),
        (status = 409, description = "Email Already Registered")
    )
)]
pub async fn create_user(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<User>, StatusCode> {
    if Role::parse(&role) != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_user = User {
        id: Uuid::new_v4(),
        email: payload.email,
        full_name: payload.full_name,
        role: payload.role.as_str().to_string(),
    };

    match state.repo.create_user(new_user, password_hash).await {
        Some(user) => Ok(Json(user)),
        // Most likely a duplicate email; the unique constraint rejected the row.
        None => Err(StatusCode::CONFLICT),
    }
}

/// create_course
///
/// [Admin Route] Creates a course assigned to a professor.
#[utoipa::path(
    post,
    path = "/admin/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 200, description = "Created", body = Course),
        (status = 400, description = "Unknown Professor or Duplicate Code")
    )
)]
pub async fn create_course(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<Json<Course>, StatusCode> {
    if Role::parse(&role) != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    match state.repo.create_course(payload).await {
        Some(course) => Ok(Json(course)),
        None => Err(StatusCode::BAD_REQUEST),
    }
}

/// enroll_student
///
/// [Admin Route] Enrolls a student on a course.
///
/// *Idempotency*: The repository method uses the composite primary key on
/// `enrollments` to enforce the **one-enrollment-per-student-per-course** rule,
/// returning a 409 Conflict on a duplicate.
#[utoipa::path(
    post,
    path = "/admin/enrollments",
    request_body = EnrollStudentRequest,
    responses(
        (status = 200, description = "Enrolled"),
        (status = 409, description = "Duplicate")
    )
)]
pub async fn enroll_student(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<EnrollStudentRequest>,
) -> Result<StatusCode, StatusCode> {
    if Role::parse(&role) != Some(Role::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }
    match state.repo.enroll_student(payload).await {
        true => Ok(StatusCode::OK),
        false => Err(StatusCode::CONFLICT),
    }
}
