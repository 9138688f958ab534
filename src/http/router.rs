use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{attendance, core, records, students};
use super::types::AppState;

/// Routes by the first path segment, with or without a trailing slash.
/// `/students` and `/attendance` have their own handlers; the remaining
/// collections share the generic CRUD ones. Anything else, including
/// deeper paths and unsupported verbs, is a JSON 404.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let status = get(core::status).fallback(core::not_found);
    let students = get(students::list)
        .post(students::import)
        .fallback(core::not_found);
    let attendance = get(attendance::list)
        .post(attendance::append)
        .fallback(core::not_found);
    let collection = get(records::list)
        .post(records::create)
        .put(records::replace)
        .delete(records::remove)
        .fallback(core::not_found);

    Router::new()
        .route("/status", status.clone())
        .route("/status/", status)
        .route("/students", students.clone())
        .route("/students/", students)
        .route("/attendance", attendance.clone())
        .route("/attendance/", attendance)
        .route("/{collection}", collection.clone())
        .route("/{collection}/", collection)
        .fallback(core::not_found)
        .layer(cors)
        .with_state(state)
}
