//! api-server — HTTP API for the course administration workspace.
//!
//! Serves course and student CRUD plus the roster endpoints (assign a
//! student, read a course's materialized roster). State is in-memory and
//! seeded with one default course and one default student; restarting the
//! process resets it.
//!
//! - CORS: Configurable via CORS_ALLOW_ORIGIN (origin string) for the admin frontend.
//! - Logging: pretty (default) or JSON via LOG_FORMAT.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use domain::adapters::memory_repo::{InMemoryCourseRepo, InMemoryStudentRepo};
use domain::service::RosterService;
use domain::{
    CoreError, Course, CourseRepository, CourseUpdate, IdGenerator, NewCourse, NewStudent,
    RecordId, Student, StudentRepository, StudentUpdate,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// UUID v4 identifier source for freshly created records.
#[derive(Clone)]
struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> RecordId {
        RecordId::new(Uuid::new_v4().to_string())
    }
}

#[derive(Clone)]
struct AppState {
    courses: Arc<InMemoryCourseRepo>,
    students: Arc<InMemoryStudentRepo>,
    roster: Arc<RosterService<Arc<InMemoryCourseRepo>, Arc<InMemoryStudentRepo>>>,
    ids: Arc<UuidIds>,
}

impl AppState {
    fn new() -> Self {
        let courses = Arc::new(InMemoryCourseRepo::new());
        let students = Arc::new(InMemoryStudentRepo::new());
        // The roster service shares the store instances with the handlers,
        // so every assign/read sees the stores' current contents.
        let roster = Arc::new(RosterService::new(
            Arc::clone(&courses),
            Arc::clone(&students),
        ));
        Self {
            courses,
            students,
            roster,
            ids: Arc::new(UuidIds),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);

    let state = AppState::new();
    if let Err(e) = seed_defaults(&state) {
        eprintln!("Failed to seed default records: {}", e);
        std::process::exit(1);
    }

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = app_router(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(%addr, "api-server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind port");
    axum::serve(listener, app).await.expect("server error");
}

fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/api/courses", get(list_courses).post(create_course))
        .route(
            "/api/courses/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/api/courses/:id/students", get(course_students))
        .route("/api/courses/assign-student/:id", put(assign_student))
        .route("/api/students", get(list_students).post(create_student))
        .route(
            "/api/students/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
        .with_state(state)
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

/// Seed the stores the way a fresh deployment starts: one course, one
/// student, no enrollments.
fn seed_defaults(state: &AppState) -> Result<(), CoreError> {
    let course = Course::new(
        state.ids.next_id(),
        NewCourse {
            name: "Introduction to Web Development".into(),
            description: "Learn the basics of HTML, CSS, and JavaScript".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 5, 1),
            lesson_count: 12,
        },
    );
    state.courses.create(course)?;

    let student = Student::new(
        state.ids.next_id(),
        NewStudent {
            fullname: "John Smith".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1995, 5, 15),
            gender: Some("male".into()),
            city: Some("New York".into()),
            social_network_links: Some("https://linkedin.com/in/johnsmith".into()),
        },
    );
    state.students.create(student)?;
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCourseReq {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    lesson_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCourseReq {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignStudentReq {
    /// Accepts a JSON string or number; normalized to the canonical string
    /// id form on deserialization.
    #[serde(default)]
    student_id: Option<RecordId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStudentReq {
    #[serde(default)]
    fullname: String,
    #[serde(default)]
    date_of_birth: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    social_network_links: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStudentReq {
    #[serde(default)]
    fullname: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CourseOut {
    id: RecordId,
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    lesson_count: u32,
    students: Vec<RecordId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StudentOut {
    id: RecordId,
    fullname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    social_network_links: Option<String>,
}

fn course_to_out(course: Course) -> CourseOut {
    CourseOut {
        id: course.id,
        name: course.name,
        description: course.description,
        start_date: course.start_date.map(http_common::format_date),
        lesson_count: course.lesson_count,
        students: course.students,
    }
}

fn student_to_out(student: Student) -> StudentOut {
    StudentOut {
        id: student.id,
        fullname: student.fullname,
        date_of_birth: student.date_of_birth.map(http_common::format_date),
        gender: student.gender,
        city: student.city,
        social_network_links: student.social_network_links,
    }
}

/// Dates arrive as optional `YYYY-MM-DD` strings. Empty or unparseable
/// values are treated as absent rather than rejected; validation here is
/// existence checks only.
fn parse_opt_date(s: Option<&str>) -> Option<NaiveDate> {
    s.filter(|s| !s.is_empty())
        .and_then(|s| http_common::parse_date(s).ok())
}

fn internal_error(context: &str, e: &CoreError) -> axum::response::Response {
    error!(err = ?e, "{} error", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(http_common::json_err("internal")),
    )
        .into_response()
}

// ============ Course handlers ============

async fn list_courses(State(state): State<AppState>) -> impl IntoResponse {
    match state.courses.list() {
        Ok(courses) => {
            let out: Vec<CourseOut> = courses.into_iter().map(course_to_out).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => internal_error("list courses", &e),
    }
}

async fn create_course(
    State(state): State<AppState>,
    Json(body): Json<CreateCourseReq>,
) -> impl IntoResponse {
    let course = Course::new(
        state.ids.next_id(),
        NewCourse {
            name: body.name,
            description: body.description,
            start_date: parse_opt_date(body.start_date.as_deref()),
            lesson_count: body.lesson_count,
        },
    );
    match state.courses.create(course.clone()) {
        Ok(()) => {
            info!(course = %course.id, "create course ok");
            (StatusCode::CREATED, Json(course_to_out(course))).into_response()
        }
        Err(e) => internal_error("create course", &e),
    }
}

async fn get_course(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let id = RecordId::new(id);
    match state.courses.get(&id) {
        Ok(Some(course)) => (StatusCode::OK, Json(course_to_out(course))).into_response(),
        Ok(None) => {
            warn!(course = %id, "course 404");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message(
                    "not_found",
                    "Course not found",
                )),
            )
                .into_response()
        }
        Err(e) => internal_error("get course", &e),
    }
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCourseReq>,
) -> impl IntoResponse {
    let id = RecordId::new(id);
    let changes = CourseUpdate {
        name: body.name,
        description: body.description,
        start_date: parse_opt_date(body.start_date.as_deref()),
    };
    match state.courses.update(&id, &changes) {
        Ok(course) => {
            info!(course = %id, "update course ok");
            (StatusCode::OK, Json(course_to_out(course))).into_response()
        }
        Err(CoreError::CourseNotFound) => {
            warn!(course = %id, "update course 404");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message(
                    "not_found",
                    "Course not found",
                )),
            )
                .into_response()
        }
        Err(e) => internal_error("update course", &e),
    }
}

async fn delete_course(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let id = RecordId::new(id);
    // Unconditional: deleting an absent course still reports success.
    match state.courses.delete(&id) {
        Ok(()) => {
            info!(course = %id, "delete course ok");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => internal_error("delete course", &e),
    }
}

async fn course_students(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = RecordId::new(id);
    match state.roster.roster_of(&id) {
        Ok(students) => {
            let out: Vec<StudentOut> = students.into_iter().map(student_to_out).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(CoreError::CourseNotFound) => {
            warn!(course = %id, "roster 404");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message(
                    "not_found",
                    "Course not found",
                )),
            )
                .into_response()
        }
        Err(e) => internal_error("course roster", &e),
    }
}

async fn assign_student(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(body): Json<AssignStudentReq>,
) -> impl IntoResponse {
    let course_id = RecordId::new(course_id);
    let student_id = body.student_id.unwrap_or_default();
    match state.roster.assign(&course_id, &student_id) {
        Ok(course) => {
            info!(course = %course.id, student = %student_id, "assign ok");
            (StatusCode::OK, Json(course_to_out(course))).into_response()
        }
        Err(CoreError::CourseNotFound) => {
            warn!(course = %course_id, "assign: course 404");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message(
                    "not_found",
                    "Course not found",
                )),
            )
                .into_response()
        }
        Err(CoreError::StudentNotFound) => {
            warn!(course = %course_id, student = %student_id, "assign: student 404");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message(
                    "not_found",
                    "Student not found",
                )),
            )
                .into_response()
        }
        Err(CoreError::MissingStudentId) => {
            warn!(course = %course_id, "assign: missing student id");
            (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_error_with_message(
                    "invalid_request",
                    "Student ID is required",
                )),
            )
                .into_response()
        }
        Err(e) => internal_error("assign student", &e),
    }
}

// ============ Student handlers ============

async fn list_students(State(state): State<AppState>) -> impl IntoResponse {
    match state.students.list() {
        Ok(students) => {
            let out: Vec<StudentOut> = students.into_iter().map(student_to_out).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => internal_error("list students", &e),
    }
}

async fn create_student(
    State(state): State<AppState>,
    Json(body): Json<CreateStudentReq>,
) -> impl IntoResponse {
    let student = Student::new(
        state.ids.next_id(),
        NewStudent {
            fullname: body.fullname,
            date_of_birth: parse_opt_date(body.date_of_birth.as_deref()),
            gender: body.gender,
            city: body.city,
            social_network_links: body.social_network_links,
        },
    );
    match state.students.create(student.clone()) {
        Ok(()) => {
            info!(student = %student.id, "create student ok");
            (StatusCode::CREATED, Json(student_to_out(student))).into_response()
        }
        Err(e) => internal_error("create student", &e),
    }
}

async fn get_student(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let id = RecordId::new(id);
    match state.students.get(&id) {
        Ok(Some(student)) => (StatusCode::OK, Json(student_to_out(student))).into_response(),
        Ok(None) => {
            warn!(student = %id, "student 404");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message(
                    "not_found",
                    "Student not found",
                )),
            )
                .into_response()
        }
        Err(e) => internal_error("get student", &e),
    }
}

async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStudentReq>,
) -> impl IntoResponse {
    let id = RecordId::new(id);
    let changes = StudentUpdate {
        fullname: body.fullname,
        city: body.city,
    };
    match state.students.update(&id, &changes) {
        Ok(student) => {
            info!(student = %id, "update student ok");
            (StatusCode::OK, Json(student_to_out(student))).into_response()
        }
        Err(CoreError::StudentNotFound) => {
            warn!(student = %id, "update student 404");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message(
                    "not_found",
                    "Student not found",
                )),
            )
                .into_response()
        }
        Err(e) => internal_error("update student", &e),
    }
}

async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = RecordId::new(id);
    match state.students.delete(&id) {
        Ok(()) => {
            info!(student = %id, "delete student ok");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => internal_error("delete student", &e),
    }
}
