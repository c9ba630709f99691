use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::InsertOutcome;

/// Assignment of a student to their grading tutor. A student has at most
/// one tutor per course (UNIQUE on course+student); reassignment updates
/// the row in place.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TutorStudent {
    pub id: Uuid,

    pub course: String,
    pub student: String,
    pub tutor: String,
}

impl TutorStudent {
    pub async fn tutor_of(
        db: &SqlitePool,
        course: &str,
        student: &str,
    ) -> sqlx::Result<Option<String>> {
        sqlx::query_scalar("SELECT tutor FROM tutor_students WHERE course = ? AND student = ?")
            .bind(course)
            .bind(student)
            .fetch_optional(db)
            .await
    }

    pub async fn students_of(
        db: &SqlitePool,
        course: &str,
        tutor: &str,
    ) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT student FROM tutor_students WHERE course = ? AND tutor = ? ORDER BY student",
        )
        .bind(course)
        .bind(tutor)
        .fetch_all(db)
        .await
    }

    /// Current number of assignees per tutor. Tutors without any students
    /// do not appear; callers fill in zeroes.
    pub async fn counts(db: &SqlitePool, course: &str) -> sqlx::Result<Vec<(String, i64)>> {
        sqlx::query_as(
            "SELECT tutor, COUNT(*) FROM tutor_students WHERE course = ? GROUP BY tutor",
        )
        .bind(course)
        .fetch_all(db)
        .await
    }

    pub async fn insert_if_absent(
        db: &SqlitePool,
        course: &str,
        student: &str,
        tutor: &str,
    ) -> sqlx::Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO tutor_students (id, course, student, tutor) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(course)
        .bind(student)
        .bind(tutor)
        .execute(db)
        .await?;

        Ok(if result.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyPresent
        })
    }

    pub async fn set_tutor(
        db: &SqlitePool,
        course: &str,
        student: &str,
        tutor: &str,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE tutor_students SET tutor = ? WHERE course = ? AND student = ?")
            .bind(tutor)
            .bind(course)
            .bind(student)
            .execute(db)
            .await?;

        Ok(())
    }

    pub async fn delete_for_student(
        db: &SqlitePool,
        course: &str,
        student: &str,
    ) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM tutor_students WHERE course = ? AND student = ?")
            .bind(course)
            .bind(student)
            .execute(db)
            .await?;

        Ok(())
    }

    pub async fn delete_for_tutor(db: &SqlitePool, course: &str, tutor: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM tutor_students WHERE course = ? AND tutor = ?")
            .bind(course)
            .bind(tutor)
            .execute(db)
            .await?;

        Ok(())
    }
}
