use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::NaiveDateTime;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::course::CreateExercise;
use crate::routes::{not_found, refused, resolve_course};
use crate::state::CampusState;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub fn router() -> Router<CampusState> {
    Router::new()
        .route("/admin/exercises/{course}/add", post(add))
        .route("/admin/exercises/{course}/delete", post(delete))
        .route("/admin/exercises/{course}/{exercise}/edit", post(edit))
        .route("/admin/exercises/{course}/{exercise}/points", post(points))
}

#[derive(Deserialize)]
struct AddExercise {
    name: String,
    start_date: String,
    end_date: String,
    points: f64,
}

async fn add(
    admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
    Json(payload): Json<AddExercise>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    let start = NaiveDateTime::parse_from_str(&payload.start_date, DATE_FORMAT);
    let end = NaiveDateTime::parse_from_str(&payload.end_date, DATE_FORMAT);
    let (Ok(start), Ok(end)) = (start, end) else {
        return Err(refused("could not parse start or end date"));
    };

    let creator = admin
        .0
        .map_or_else(|| "api".to_owned(), |user| user.username);

    state
        .courses
        .add_exercise(
            &id,
            payload.name.trim(),
            CreateExercise {
                creator,
                start,
                end,
                points: payload.points,
            },
        )
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct ExercisePayload {
    exercise: String,
}

async fn delete(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
    Json(payload): Json<ExercisePayload>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    state
        .courses
        .delete_exercise(&id, &payload.exercise)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct EditExercise {
    start_date: String,
    end_date: String,
    points: f64,
}

/// Adjusts the submission window or the maximum points; only changed
/// fields are written.
async fn edit(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path((course, exercise)): Path<(String, String)>,
    Json(payload): Json<EditExercise>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    let Some(current) = state
        .courses
        .exercise(&id, &exercise)
        .await
        .map_err(|_| refused("exercise lookup failed"))?
    else {
        return Err(not_found("exercise not found"));
    };

    let start = NaiveDateTime::parse_from_str(&payload.start_date, DATE_FORMAT);
    let end = NaiveDateTime::parse_from_str(&payload.end_date, DATE_FORMAT);
    let (Ok(start), Ok(end)) = (start, end) else {
        return Err(refused("could not parse start or end date"));
    };

    if start != current.start {
        state
            .courses
            .update_start(&id, &exercise, start)
            .await
            .map_err(IntoResponse::into_response)?;
    }
    if end != current.end {
        state
            .courses
            .update_end(&id, &exercise, end)
            .await
            .map_err(IntoResponse::into_response)?;
    }
    if (payload.points - current.points).abs() > f64::EPSILON {
        state
            .courses
            .update_points(&id, &exercise, payload.points)
            .await
            .map_err(IntoResponse::into_response)?;
    }

    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct SetPoints {
    student: String,
    points: f64,
}

/// Manual grading endpoint; the usual path is the post-receive hook.
async fn points(
    admin: AdminUser,
    State(state): State<CampusState>,
    Path((course, exercise)): Path<(String, String)>,
    Json(payload): Json<SetPoints>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    if !state
        .courses
        .has_exercise(&id, &exercise)
        .await
        .map_err(|_| refused("exercise lookup failed"))?
    {
        return Err(not_found("exercise not found"));
    }

    let tutor = admin
        .0
        .map_or_else(|| "api".to_owned(), |user| user.username);

    state
        .courses
        .set_points(&id, &exercise, &payload.student, &tutor, payload.points)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}
