use std::collections::{BTreeMap, BTreeSet};

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::post,
};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::routes::{internal, refused, resolve_course};
use crate::state::CampusState;

pub fn router() -> Router<CampusState> {
    Router::new()
        .route("/admin/tutors/{course}/add", post(add))
        .route("/admin/tutors/{course}/delete", post(delete))
        .route("/admin/tutors/{course}/edit", post(edit))
}

#[derive(Deserialize)]
struct AddTutor {
    tutor: String,
    #[serde(default)]
    description: String,
}

async fn add(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
    Json(payload): Json<AddTutor>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    state
        .courses
        .add_tutor(&id, &payload.tutor, &payload.description)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct TutorPayload {
    tutor: String,
}

async fn delete(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
    Json(payload): Json<TutorPayload>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    state
        .courses
        .remove_tutor(&id, &payload.tutor)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

/// Bulk reassignment from a tutor → students mapping. The coverage rules
/// are enforced here, before the orchestrator applies the mapping: every
/// tutor must be mentioned and every student assigned to exactly one tutor.
/// Anyone who joined while the mapping was being edited makes it stale.
async fn edit(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
    Json(update): Json<BTreeMap<String, Vec<String>>>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    let tutors: BTreeSet<String> = state
        .courses
        .tutors(&id)
        .await
        .map_err(|_| internal())?
        .into_iter()
        .map(|tutor| tutor.username)
        .collect();
    let students: BTreeSet<String> = state
        .courses
        .students(&id)
        .await
        .map_err(|_| internal())?
        .into_iter()
        .map(|student| student.username)
        .collect();

    let assigned: Vec<&String> = update.values().flatten().collect();
    let assigned_set: BTreeSet<&String> = assigned.iter().copied().collect();
    if assigned.len() != assigned_set.len() {
        return Err(refused(
            "mapping contains duplicated tutor assignments for some student",
        ));
    }

    let mentioned: BTreeSet<String> = update.keys().cloned().collect();
    if mentioned != tutors {
        return Err(refused("every tutor must be mentioned in the mapping"));
    }

    let covered: BTreeSet<String> = assigned_set.into_iter().cloned().collect();
    if covered != students {
        return Err(refused(
            "every student must be assigned to exactly one tutor",
        ));
    }

    state
        .courses
        .edit_tutors(&id, &update)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}
