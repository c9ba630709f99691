use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::course::{CourseId, Role, saga::SagaError};
use crate::integration::IntegrationError;

/// Why a course operation was refused or aborted. The `Display` output is
/// the message surfaced to callers; validation and not-found variants are
/// produced before any external side effect is attempted.
#[derive(Debug, Error)]
pub enum CourseError {
    #[error("course {0} already exists")]
    AlreadyExists(CourseId),

    #[error("course {0} does not exist")]
    NotFound(CourseId),

    #[error("failed to retrieve information about {0} from the identity server")]
    UnknownUser(String),

    #[error("failed to add {username}, is {role}")]
    HasRole { username: String, role: Role },

    #[error("failed to remove {0}, not a student")]
    NotAStudent(String),

    #[error("failed to remove {0}, not a tutor")]
    NotATutor(String),

    #[error("exercise with name {0} already exists")]
    ExerciseExists(String),

    #[error("exercise with name {0} does not exist")]
    NoSuchExercise(String),

    #[error("{0} has spaces in it")]
    SpacesInName(String),

    #[error("{0} starts after it ends")]
    StartsAfterEnd(String),

    #[error(transparent)]
    Step(#[from] SagaError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl IntoResponse for CourseError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotFound(_) | Self::NoSuchExercise(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
