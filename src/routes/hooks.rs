use std::collections::BTreeSet;
use std::sync::LazyLock;

use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use chrono::Utc;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::course::Role;
use crate::state::CampusState;

/// `"7 / 10"` on the first README line, as tutors write it when grading.
static POINTS: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used)]
    let pattern = Regex::new(r"(\d+[,.]?\d*) */ *(\d+[,.]?\d*)").unwrap();
    pattern
});

const PROTECTED_FILES: [&str; 2] = ["readme.md", ".build.yml"];

pub fn router() -> Router<CampusState> {
    Router::new()
        .route("/hooks/git-pre-receive", post(pre_receive))
        .route("/hooks/git-post-receive", post(post_receive))
        .route("/hooks/chat-user-created", post(chat_user_created))
}

#[derive(Debug, Deserialize)]
struct HookPayload {
    user: String,
    repo: String,
    owner: String,
    #[serde(default)]
    files: String,
}

impl HookPayload {
    /// The server-side hook script emits one JSON field per line; joining
    /// the lines with commas yields a regular object.
    fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(&body.replace('\n', ",")).ok()
    }

    fn files(&self) -> Vec<&str> {
        self.files.split(',').filter(|file| !file.is_empty()).collect()
    }
}

/// Rejects student pushes that touch anything outside a currently pending
/// exercise directory, the repo root, or protected files.
async fn pre_receive(State(state): State<CampusState>, body: String) -> (StatusCode, String) {
    let Some(payload) = HookPayload::parse(&body) else {
        return (
            StatusCode::FORBIDDEN,
            "PUSH FAILED! Could not identify who's pushing to this repository.".to_owned(),
        );
    };

    let Ok(Some(id)) = state.courses.resolve(&payload.owner).await else {
        return (StatusCode::OK, String::new());
    };

    // only student pushes to their own repo are guarded
    if payload.user != payload.repo {
        return (StatusCode::OK, String::new());
    }

    let Ok(pending) = state.courses.pending_exercises(&id, Utc::now().naive_utc()).await else {
        return (StatusCode::OK, String::new());
    };
    let pending: BTreeSet<&str> = pending.iter().map(|exercise| exercise.name.as_str()).collect();

    if pending.contains("*") {
        return (StatusCode::OK, String::new());
    }

    let mut offending = BTreeSet::new();
    for file in payload.files() {
        let path: Vec<&str> = file.split('/').collect();

        match path.split_first() {
            // cannot edit the repo root
            None | Some((_, [])) => {
                offending.insert(file);
            }
            Some((first, rest)) => {
                let file_name = rest.last().unwrap_or(&"").trim().to_lowercase();
                if PROTECTED_FILES.contains(&file_name.as_str()) || !pending.contains(first) {
                    offending.insert(file);
                }
            }
        }
    }

    if offending.is_empty() {
        return (StatusCode::OK, String::new());
    }

    let listing: String = offending
        .iter()
        .map(|file| format!("- {file}\n"))
        .collect();
    let message = format!(
        "PUSH FAILED!\n\n\
         You don't have the permission to modify the following files:\n{listing}\n\
         This error usually occurs if you\n    \
         - try to submit an exercise outside its timeframe\n    \
         - try to create or change files in directories you're not allowed to\n\n\
         You need to make sure that none of the above files are affected by *any* of the \
         commits you're trying to push."
    );

    (StatusCode::FORBIDDEN, message)
}

/// Student pushes trigger builds for the pending exercises they touched;
/// tutor pushes to an exercise README are parsed for awarded points.
async fn post_receive(State(state): State<CampusState>, body: String) -> StatusCode {
    let Some(payload) = HookPayload::parse(&body) else {
        return StatusCode::OK;
    };

    let Ok(Some(id)) = state.courses.resolve(&payload.owner).await else {
        return StatusCode::OK;
    };

    if !state.courses.has_student(&id, &payload.repo).await.unwrap_or(false) {
        return StatusCode::OK;
    }

    let Ok(Some(role)) = state.courses.role(&id, &payload.user, false).await else {
        return StatusCode::OK;
    };

    if role == Role::Student {
        if payload.user != payload.repo {
            return StatusCode::OK;
        }

        let edited: BTreeSet<&str> = payload
            .files()
            .iter()
            .filter_map(|file| file.split('/').next())
            .collect();

        let Ok(pending) = state.courses.pending_exercises(&id, Utc::now().naive_utc()).await
        else {
            return StatusCode::OK;
        };
        for exercise in pending {
            if edited.contains(exercise.name.as_str()) {
                state.build.build(&id, &payload.repo, Some(&exercise.name)).await;
            }
        }

        return StatusCode::OK;
    }

    for file in payload.files() {
        let path: Vec<&str> = file.split('/').collect();
        let [exercise, file_name] = path.as_slice() else {
            continue;
        };
        if file_name.trim().to_lowercase() != "readme.md" {
            continue;
        }
        if !state.courses.has_exercise(&id, exercise).await.unwrap_or(false) {
            continue;
        }

        let Ok(Some(readme)) = state.git.get_readme(&id, exercise, &payload.repo).await else {
            continue;
        };
        let first_line = readme.lines().next().unwrap_or_default();

        let mut matches = POINTS.captures_iter(first_line);
        let Some(capture) = matches.next() else {
            continue;
        };
        // more than one point expression on the line is ambiguous
        if matches.next().is_some() {
            continue;
        }

        let Some(points) = capture
            .get(1)
            .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        else {
            continue;
        };

        if let Err(err) = state
            .courses
            .set_points(&id, exercise, &payload.repo, &payload.user, points)
            .await
        {
            tracing::error!(error = %err, %id, %exercise, "failed to record points from push");
        }
    }

    StatusCode::OK
}

#[derive(Deserialize)]
struct UserCreated {
    user_name: String,
}

/// A user just got their chat account: re-add them to the rooms of every
/// course they hold a role in. On any failure the half-set-up chat user is
/// deleted so the next login starts clean.
async fn chat_user_created(
    State(state): State<CampusState>,
    Json(payload): Json<UserCreated>,
) -> StatusCode {
    let username = payload.user_name;

    let Some(info) = state.identity.get_user_info(&username).await else {
        tracing::error!(%username, "user joined chat but is unknown to the identity server");
        let _ = state.chat.delete_user(&username).await;
        return StatusCode::OK;
    };

    let courses = match state.courses.all_courses().await {
        Ok(courses) => courses,
        Err(_) => return StatusCode::OK,
    };

    for course in courses {
        let id = course.course_id();
        let role = match state.courses.role(&id, &username, info.is_admin()).await {
            Ok(role) => role,
            Err(err) => {
                tracing::error!(error = %err, %id, %username, "role lookup failed");
                let _ = state.chat.delete_user(&username).await;
                return StatusCode::OK;
            }
        };

        let result = match role {
            Some(Role::Student) => state.chat.add_student(&id, &username).await,
            Some(Role::Tutor) => state.chat.add_tutor(&id, &username).await,
            Some(Role::Owner | Role::Admin) => state.chat.add_owner(&id, &username).await,
            None => Ok(()),
        };

        if let Err(err) = result {
            tracing::error!(error = %err, %id, %username, "failed to sync chat membership");
            let _ = state.chat.delete_user(&username).await;
            return StatusCode::OK;
        }
    }

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_line_separated_hook_payloads() {
        let body = "{\"user\": \"anna\"\n\"repo\": \"anna\"\n\"owner\": \"2024SS-algo\"\n\"files\": \"ex1/main.rs,ex1/NOTES.md\"}";
        let payload = HookPayload::parse(body).unwrap();

        assert_eq!(payload.user, "anna");
        assert_eq!(payload.owner, "2024SS-algo");
        assert_eq!(payload.files(), vec!["ex1/main.rs", "ex1/NOTES.md"]);
    }

    #[test]
    fn rejects_bodies_without_identity() {
        assert!(HookPayload::parse("not json at all").is_none());
        assert!(HookPayload::parse("{\"repo\": \"anna\"}").is_none());
    }

    #[test]
    fn extracts_a_single_points_expression() {
        let capture = POINTS.captures("# ex1 (7 / 10)").unwrap();
        assert_eq!(capture.get(1).unwrap().as_str(), "7");

        let capture = POINTS.captures("# ex1 (7,5/10)").unwrap();
        assert_eq!(capture.get(1).unwrap().as_str(), "7,5");
    }
}
