// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{analytics, auth, exams, reports, sessions, student, students},
    state::AppState,
    utils::jwt::{auth_middleware, student_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Public: login.
/// * Any signed-in user: session context, logout.
/// * Teacher: roster, exams, analytics, reports.
/// * Student: dashboard and exam sessions.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = [
        state.config.public_url.as_str(),
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ]
    .iter()
    .filter_map(|o| o.trim_end_matches('/').parse().ok())
    .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route("/logout", post(auth::logout))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let student_admin_routes = Router::new()
        .route("/", get(students::list_students).post(students::save_student))
        .route("/import", post(students::import_students))
        .route("/classes", get(students::list_classes))
        .route("/{school_no}", delete(students::delete_student));

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::save_exam))
        .route(
            "/import",
            get(exams::import_exam_from_query).post(exams::import_exam),
        )
        .route("/pool", get(exams::question_pool))
        .route("/generate", post(exams::generate_questions))
        .route("/{id}", get(exams::get_exam).delete(exams::delete_exam))
        .route("/{id}/status", put(exams::update_exam_status))
        .route("/{id}/share", get(exams::share_exam));

    let analytics_routes = Router::new()
        .route("/overview", get(analytics::get_overview))
        .route("/exams/{id}/questions", get(analytics::exam_questions))
        .route("/exams/{id}/leaderboard", get(analytics::exam_results))
        .route("/classes/{class_group}", get(analytics::class_summary))
        .route("/students/{school_no}", get(analytics::student_summary));

    let report_routes = Router::new()
        .route("/exams/{id}/paper", get(reports::exam_paper))
        .route("/exams/{id}/results", get(reports::exam_results))
        .route("/exams/{id}/questions", get(reports::question_analysis))
        .route("/classes/{class_group}", get(reports::class_report))
        .route("/results/{id}/card", get(reports::report_card));

    // Auth first, then the role check.
    let teacher_routes = Router::new()
        .nest("/students", student_admin_routes)
        .nest("/exams", exam_routes)
        .nest("/analytics", analytics_routes)
        .nest("/reports", report_routes)
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let student_routes = Router::new()
        .route("/student/dashboard", get(student::dashboard))
        .route("/student/exams/{id}/session", post(student::start_exam))
        .route(
            "/sessions/{id}",
            get(sessions::get_session).delete(sessions::abandon),
        )
        .route("/sessions/{id}/answers", put(sessions::answer))
        .route("/sessions/{id}/next", post(sessions::next))
        .route("/sessions/{id}/previous", post(sessions::previous))
        .route("/sessions/{id}/finish", post(sessions::finish))
        .route("/sessions/{id}/cancel", post(sessions::cancel))
        .route("/sessions/{id}/confirm", post(sessions::confirm))
        .route("/sessions/{id}/close", post(sessions::close))
        .layer(middleware::from_fn(student_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(teacher_routes)
        .merge(student_routes);

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
