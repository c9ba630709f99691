use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::integration::{ChatPlatform, GitHost, IdentityProvider};
use crate::models::{Course, Student, Tutor};

pub use error::CourseError;
pub use exercises::{CreateExercise, ExerciseStats, ExerciseStudent, GradeEntry, StudentStats};
pub use id::{CourseId, ParseCourseIdError};
pub use role::Role;
pub use saga::{Saga, SagaError, Step};

mod error;
mod exercises;
mod id;
mod lifecycle;
mod members;
mod role;
mod saga;

/// Options for creating a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourse {
    pub owner: String,
    pub display_name: String,
    pub website: String,
    pub joinable: bool,
}

/// Orchestrates course lifecycle operations across the git host, the chat
/// platform and the local database. External mutations run as compensable
/// step sequences; the local write comes last because it is cheap and
/// almost never fails.
#[derive(Clone)]
pub struct CourseManager {
    db: SqlitePool,
    git: Arc<dyn GitHost>,
    chat: Arc<dyn ChatPlatform>,
    identity: Arc<dyn IdentityProvider>,
}

impl fmt::Debug for CourseManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourseManager")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

impl CourseManager {
    pub fn new(
        db: SqlitePool,
        git: Arc<dyn GitHost>,
        chat: Arc<dyn ChatPlatform>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            db,
            git,
            chat,
            identity,
        }
    }

    /// Resolves user input to the id of an existing, valid course. Falls
    /// back to a case-insensitive match and returns the canonical casing.
    pub async fn resolve(&self, input: &str) -> sqlx::Result<Option<CourseId>> {
        let Ok(candidate) = input.parse::<CourseId>() else {
            return Ok(None);
        };

        if candidate.is_valid() && Course::exists(&self.db, &candidate).await? {
            return Ok(Some(candidate));
        }

        match Course::find_ci(&self.db, &candidate).await? {
            Some(course) => {
                let id = course.course_id();
                Ok(id.is_valid().then_some(id))
            }
            None => Ok(None),
        }
    }

    /// All courses with a valid id. Rows predating the current validation
    /// rules are skipped rather than surfaced.
    pub async fn all_courses(&self) -> sqlx::Result<Vec<Course>> {
        Ok(Course::all(&self.db)
            .await?
            .into_iter()
            .filter(|course| course.course_id().is_valid())
            .collect())
    }

    pub async fn exists(&self, id: &CourseId) -> sqlx::Result<bool> {
        Course::exists(&self.db, id).await
    }

    /// The course row, or `NotFound`.
    pub async fn entity(&self, id: &CourseId) -> Result<Course, CourseError> {
        Course::find(&self.db, id)
            .await?
            .ok_or_else(|| CourseError::NotFound(id.clone()))
    }

    pub async fn has_student(&self, id: &CourseId, username: &str) -> sqlx::Result<bool> {
        Student::exists(&self.db, &id.to_string(), username).await
    }

    pub async fn has_tutor(&self, id: &CourseId, username: &str) -> sqlx::Result<bool> {
        Tutor::exists(&self.db, &id.to_string(), username).await
    }

    pub async fn students(&self, id: &CourseId) -> sqlx::Result<Vec<Student>> {
        Student::for_course(&self.db, &id.to_string()).await
    }

    pub async fn tutors(&self, id: &CourseId) -> sqlx::Result<Vec<Tutor>> {
        Tutor::for_course(&self.db, &id.to_string()).await
    }

    /// The user's role in the course, walking [`Role::PRECEDENCE`] and
    /// returning the first role that holds. `assume_admin` short-circuits
    /// the identity-server admin lookup when the caller already knows.
    pub async fn role(
        &self,
        id: &CourseId,
        username: &str,
        assume_admin: bool,
    ) -> Result<Option<Role>, CourseError> {
        let uid = id.to_string();
        let course = Course::find(&self.db, id).await?;

        for role in Role::PRECEDENCE {
            let holds = match role {
                Role::Student => Student::exists(&self.db, &uid, username).await?,
                Role::Tutor => Tutor::exists(&self.db, &uid, username).await?,
                Role::Owner => course.as_ref().is_some_and(|c| c.owner == username),
                Role::Admin => assume_admin || self.identity.is_admin(username).await,
            };

            if holds {
                return Ok(Some(role));
            }
        }

        Ok(None)
    }
}
