use std::collections::BTreeMap;

use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
};
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::AuthUser;
use crate::routes::{internal, not_found, refused, resolve_course};
use crate::state::CampusState;

pub fn router() -> Router<CampusState> {
    Router::new()
        .route("/courses/list", get(list_courses))
        .route("/courses/join", post(join))
        .route("/courses/{course}/{student}/tutor", get(student_tutor))
        .route("/courses/{course}/{student}/exercises", get(student_exercises))
}

/// Every valid course with the requesting user's role in it (`null` when
/// not enrolled).
async fn list_courses(
    auth: AuthUser,
    State(state): State<CampusState>,
) -> Result<Json<Value>, Response> {
    let mut res = BTreeMap::new();

    for course in state.courses.all_courses().await.map_err(|_| internal())? {
        let id = course.course_id();
        let role = state
            .courses
            .role(&id, &auth.username, auth.is_admin())
            .await
            .map_err(IntoResponse::into_response)?;

        res.insert(
            id.to_string(),
            json!({
                "role": role,
                "open": course.open,
                "restricted": course.restricted,
                "display_name": course.display_name,
                "website": course.website,
            }),
        );
    }

    Ok(Json(json!(res)))
}

#[derive(Deserialize)]
struct JoinForm {
    course: String,
}

/// Self-service enrollment into an open course, landing the student on
/// their fresh repo.
async fn join(
    State(state): State<CampusState>,
    auth: AuthUser,
    Form(form): Form<JoinForm>,
) -> Result<Redirect, Response> {
    let id = resolve_course(&state, &form.course).await?;

    let course = state
        .courses
        .entity(&id)
        .await
        .map_err(IntoResponse::into_response)?;
    if !course.open {
        return Err(refused("course is currently not open for registration"));
    }

    state
        .courses
        .add_student(&id, &auth.username)
        .await
        .map_err(|err| refused(format!("{err}. please contact the server administrator")))?;

    Ok(Redirect::to(&format!(
        "{}/{id}/{}",
        state.config.git_url, auth.username
    )))
}

async fn student_tutor(
    auth: AuthUser,
    State(state): State<CampusState>,
    Path((course, student)): Path<(String, String)>,
) -> Result<Json<Value>, Response> {
    let id = resolve_course(&state, &course).await?;

    let role = state
        .courses
        .role(&id, &auth.username, auth.is_admin())
        .await
        .map_err(IntoResponse::into_response)?;
    if role.is_none() {
        return Err((StatusCode::UNAUTHORIZED, "unauthorized").into_response());
    }

    if !state
        .courses
        .has_student(&id, &student)
        .await
        .map_err(|_| internal())?
    {
        return Err(not_found("not a student"));
    }

    let tutor = state
        .courses
        .student_tutor(&id, &student)
        .await
        .map_err(IntoResponse::into_response)?
        .ok_or_else(|| not_found("tutor not found"))?;

    Ok(Json(json!(tutor)))
}

/// The student's exercises with their grading state and running totals.
async fn student_exercises(
    auth: AuthUser,
    State(state): State<CampusState>,
    Path((course, student)): Path<(String, String)>,
) -> Result<Json<Value>, Response> {
    let id = resolve_course(&state, &course).await?;

    let role = state
        .courses
        .role(&id, &auth.username, auth.is_admin())
        .await
        .map_err(IntoResponse::into_response)?;
    if role.is_none() {
        return Err((StatusCode::UNAUTHORIZED, "unauthorized").into_response());
    }

    if !state
        .courses
        .has_student(&id, &student)
        .await
        .map_err(|_| internal())?
    {
        return Err(not_found("not a student"));
    }

    let now = Utc::now().naive_utc();
    let exercises = state.courses.exercises(&id).await.map_err(|_| internal())?;
    let stats = state
        .courses
        .student_stats(&id, &student, false, Some(&exercises))
        .await
        .map_err(IntoResponse::into_response)?;

    let mut entries = BTreeMap::new();
    for exercise in &exercises {
        entries.insert(
            exercise.name.clone(),
            json!({
                "finished": exercise.end < now,
                "pending": exercise.start <= now && now < exercise.end,
                "start": exercise.start,
                "end": exercise.end,
                "points": stats.exercises.get(&exercise.name).map(|entry| entry.points),
                "max_points": exercise.points,
            }),
        );
    }

    Ok(Json(json!({
        "percentage": stats.percentage,
        "total": stats.total,
        "max_total": stats.max_total,
        "exercises": entries,
    })))
}
