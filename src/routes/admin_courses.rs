use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::course::{CourseId, CreateCourse};
use crate::routes::{internal, refused, resolve_course};
use crate::state::CampusState;

pub fn router() -> Router<CampusState> {
    Router::new()
        .route("/admin/courses/add", post(add))
        .route("/admin/courses/delete", post(delete))
        .route("/admin/courses/open", post(open))
        .route("/admin/courses/close", post(close))
        .route("/admin/courses/restrict", post(restrict))
        .route("/admin/courses/permit", post(permit))
}

#[derive(Deserialize)]
struct AddCourse {
    name: String,
    semester: String,
    display_name: Option<String>,
    website: Option<String>,
    #[serde(default)]
    joinable: bool,
    /// Defaults to the logged-in admin; required for API-key callers.
    owner: Option<String>,
}

async fn add(
    admin: AdminUser,
    State(state): State<CampusState>,
    Json(payload): Json<AddCourse>,
) -> Result<StatusCode, Response> {
    let id = CourseId::new(payload.name, payload.semester);
    if !id.is_valid() {
        return Err(refused(
            "name or semester does not meet the formatting requirements",
        ));
    }

    let owner = payload
        .owner
        .or(admin.0.map(|user| user.username))
        .ok_or_else(|| refused("missing owner"))?;

    // the org is created on the owner's behalf, so they must exist there
    let owner_known = state
        .git
        .user_exists(&owner)
        .await
        .map_err(|_| internal())?;
    if !owner_known {
        return Err(refused("cannot create a course without ever logging into git"));
    }

    let display_name = payload
        .display_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| id.to_string());
    let website = payload
        .website
        .filter(|site| !site.is_empty())
        .unwrap_or_else(|| state.config.public_url.clone());

    state
        .courses
        .create(
            &id,
            CreateCourse {
                owner,
                display_name,
                website,
                joinable: payload.joinable,
            },
        )
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct CoursePayload {
    course: String,
}

async fn delete(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Json(payload): Json<CoursePayload>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &payload.course).await?;

    state
        .courses
        .delete(&id)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

async fn open(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Json(payload): Json<CoursePayload>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &payload.course).await?;

    let course = state
        .courses
        .entity(&id)
        .await
        .map_err(IntoResponse::into_response)?;
    if course.restricted {
        return Err(refused("course is in restricted mode"));
    }

    state
        .courses
        .open(&id)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

async fn close(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Json(payload): Json<CoursePayload>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &payload.course).await?;

    state
        .courses
        .close(&id)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

async fn restrict(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Json(payload): Json<CoursePayload>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &payload.course).await?;

    state
        .courses
        .restrict_student_access(&id)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

async fn permit(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Json(payload): Json<CoursePayload>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &payload.course).await?;

    state
        .courses
        .permit_student_access(&id)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}
