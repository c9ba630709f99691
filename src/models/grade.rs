use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Points a tutor awarded a student for one exercise.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Grade {
    pub id: Uuid,

    pub course: String,
    pub exercise: String,
    pub student: String,
    pub tutor: String,

    pub points: f64,
}

impl Grade {
    pub async fn find(
        db: &SqlitePool,
        course: &str,
        exercise: &str,
        student: &str,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM grades WHERE course = ? AND exercise = ? AND student = ?")
            .bind(course)
            .bind(exercise)
            .bind(student)
            .fetch_optional(db)
            .await
    }

    pub async fn for_student(
        db: &SqlitePool,
        course: &str,
        student: &str,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT * FROM grades WHERE course = ? AND student = ? ORDER BY exercise")
            .bind(course)
            .bind(student)
            .fetch_all(db)
            .await
    }

    pub async fn for_exercise(
        db: &SqlitePool,
        course: &str,
        exercise: &str,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT * FROM grades WHERE course = ? AND exercise = ? ORDER BY student")
            .bind(course)
            .bind(exercise)
            .fetch_all(db)
            .await
    }

    /// Inserts the grade or, when the student was graded before, replaces
    /// points and grading tutor in place.
    pub async fn upsert(
        db: &SqlitePool,
        course: &str,
        exercise: &str,
        student: &str,
        tutor: &str,
        points: f64,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO grades (id, course, exercise, student, tutor, points) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (course, exercise, student) \
             DO UPDATE SET tutor = excluded.tutor, points = excluded.points",
        )
        .bind(Uuid::new_v4())
        .bind(course)
        .bind(exercise)
        .bind(student)
        .bind(tutor)
        .bind(points)
        .execute(db)
        .await?;

        Ok(())
    }
}
