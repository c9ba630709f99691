pub mod admin_courses;
pub mod admin_exercises;
pub mod admin_students;
pub mod admin_tutors;
pub mod api;
pub mod courses;
pub mod hooks;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::course::CourseId;
use crate::state::CampusState;

pub(crate) fn internal() -> Response {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

pub(crate) fn not_found(message: &'static str) -> Response {
    (StatusCode::NOT_FOUND, message).into_response()
}

pub(crate) fn refused(message: impl Into<String>) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, message.into()).into_response()
}

/// Resolves user input to an existing course or the 404 every route
/// answers with.
pub(crate) async fn resolve_course(
    state: &CampusState,
    input: &str,
) -> Result<CourseId, Response> {
    state
        .courses
        .resolve(input)
        .await
        .map_err(|_| internal())?
        .ok_or_else(|| not_found("course not found"))
}
