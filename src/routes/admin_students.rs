use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::post,
};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::routes::resolve_course;
use crate::state::CampusState;

pub fn router() -> Router<CampusState> {
    Router::new()
        .route("/admin/students/{course}/add", post(add))
        .route("/admin/students/{course}/delete", post(delete))
}

#[derive(Deserialize)]
struct StudentPayload {
    student: String,
}

async fn add(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
    Json(payload): Json<StudentPayload>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    state
        .courses
        .add_student(&id, &payload.student)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

async fn delete(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
    Json(payload): Json<StudentPayload>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    state
        .courses
        .remove_student(&id, &payload.student)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}
