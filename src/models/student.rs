use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::InsertOutcome;

/// Enrollment of a user in one course. `course` is the course uid string
/// (`{semester}-{name}`), `username` the identity-server login.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: Uuid,

    pub course: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub matriculation_number: Option<i64>,
}

impl Student {
    pub async fn exists(db: &SqlitePool, course: &str, username: &str) -> sqlx::Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE course = ? AND username = ?")
                .bind(course)
                .bind(username)
                .fetch_one(db)
                .await?;

        Ok(count > 0)
    }

    pub async fn for_course(db: &SqlitePool, course: &str) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT * FROM students WHERE course = ? ORDER BY username")
            .bind(course)
            .fetch_all(db)
            .await
    }

    pub async fn usernames(db: &SqlitePool, course: &str) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar("SELECT username FROM students WHERE course = ? ORDER BY username")
            .bind(course)
            .fetch_all(db)
            .await
    }

    pub async fn insert_if_absent(db: &SqlitePool, student: &Self) -> sqlx::Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO students \
             (id, course, username, name, email, matriculation_number) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(student.id)
        .bind(&student.course)
        .bind(&student.username)
        .bind(&student.name)
        .bind(&student.email)
        .bind(student.matriculation_number)
        .execute(db)
        .await?;

        Ok(if result.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyPresent
        })
    }
}
