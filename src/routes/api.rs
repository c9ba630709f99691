use std::collections::{BTreeMap, HashMap};

use axum::{
    Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::auth::AdminUser;
use crate::routes::{internal, not_found, resolve_course};
use crate::state::CampusState;

pub fn router() -> Router<CampusState> {
    Router::new()
        .route("/api/courses", get(courses))
        .route("/api/course/{course}/tutors", get(tutors))
        .route("/api/course/{course}/is_tutor/{tutor}", get(is_tutor))
        .route("/api/course/{course}/is_student/{student}", get(is_student))
        .route("/api/course/{course}/exercises", get(exercises))
        .route("/api/course/{course}/students", get(students))
        .route("/api/course/{course}/exercises/stats", get(course_stats))
        .route(
            "/api/course/{course}/exercise/{exercise}/stats",
            get(exercise_stats),
        )
        .route(
            "/api/course/{course}/{student}/{exercise}/logs",
            get(build_logs),
        )
}

async fn courses(
    _admin: AdminUser,
    State(state): State<CampusState>,
) -> Result<Json<Value>, Response> {
    let courses = state.courses.all_courses().await.map_err(|_| internal())?;
    Ok(Json(json!(courses)))
}

/// Tutor → assigned student logins.
async fn tutors(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
) -> Result<Json<Value>, Response> {
    let id = resolve_course(&state, &course).await?;

    let overview = state
        .courses
        .tutor_overview(&id)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(json!(overview)))
}

async fn is_tutor(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path((course, tutor)): Path<(String, String)>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    if state
        .courses
        .has_tutor(&id, &tutor)
        .await
        .map_err(|_| internal())?
    {
        Ok(StatusCode::OK)
    } else {
        Err(not_found("not a tutor"))
    }
}

async fn is_student(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path((course, student)): Path<(String, String)>,
) -> Result<StatusCode, Response> {
    let id = resolve_course(&state, &course).await?;

    if state
        .courses
        .has_student(&id, &student)
        .await
        .map_err(|_| internal())?
    {
        Ok(StatusCode::OK)
    } else {
        Err(not_found("not a student"))
    }
}

/// Exercises whose submission window has closed.
async fn exercises(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
) -> Result<Json<Value>, Response> {
    let id = resolve_course(&state, &course).await?;

    let finished = state
        .courses
        .finished_exercises(&id, Utc::now().naive_utc())
        .await
        .map_err(|_| internal())?;

    let entries: Vec<Value> = finished
        .iter()
        .map(|exercise| {
            json!({
                "name": exercise.name,
                "points": exercise.points,
                "start": exercise.start,
                "end": exercise.end,
            })
        })
        .collect();

    Ok(Json(json!(entries)))
}

async fn students(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
) -> Result<Json<Value>, Response> {
    let id = resolve_course(&state, &course).await?;

    let students = state.courses.students(&id).await.map_err(|_| internal())?;
    let by_username: BTreeMap<_, _> = students
        .into_iter()
        .map(|student| (student.username.clone(), student))
        .collect();

    Ok(Json(json!(by_username)))
}

/// Per-student aggregates across all exercises, enriched with the
/// identity server's matriculation numbers.
async fn course_stats(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path(course): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, Response> {
    let id = resolve_course(&state, &course).await?;
    let include_ungraded = params.contains_key("include_ungraded");

    let exercises = state.courses.exercises(&id).await.map_err(|_| internal())?;
    let users = state.identity.get_users().await.unwrap_or_default();

    let mut res = BTreeMap::new();
    for student in state.courses.students(&id).await.map_err(|_| internal())? {
        let stats = state
            .courses
            .student_stats(&id, &student.username, include_ungraded, Some(&exercises))
            .await
            .map_err(IntoResponse::into_response)?;

        let matriculation_number = users
            .get(&student.username)
            .and_then(|info| info.matriculation_number);

        res.insert(
            student.username,
            json!({
                "matriculation_number": matriculation_number,
                "exercises": stats.exercises,
                "total": stats.total,
                "max_total": stats.max_total,
                "percentage": stats.percentage,
            }),
        );
    }

    Ok(Json(json!(res)))
}

async fn exercise_stats(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path((course, exercise)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, Response> {
    let id = resolve_course(&state, &course).await?;

    if !state
        .courses
        .has_exercise(&id, &exercise)
        .await
        .map_err(|_| internal())?
    {
        return Err(not_found("exercise not found"));
    }

    let include_time_spent = params.contains_key("include_time_spent");
    let stats = state
        .courses
        .exercise_stats(&id, &exercise, include_time_spent)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(json!(stats)))
}

/// Latest build output for a student's exercise.
async fn build_logs(
    _admin: AdminUser,
    State(state): State<CampusState>,
    Path((course, student, exercise)): Path<(String, String, String)>,
) -> Result<String, Response> {
    let id = resolve_course(&state, &course).await?;

    state
        .build
        .logs(&id, &student, &exercise)
        .await
        .map_err(|_| internal())?
        .ok_or_else(|| not_found("no logs"))
}
