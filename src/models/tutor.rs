use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::InsertOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tutor {
    pub id: Uuid,

    pub course: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub description: String,
}

impl Tutor {
    pub async fn exists(db: &SqlitePool, course: &str, username: &str) -> sqlx::Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tutors WHERE course = ? AND username = ?")
                .bind(course)
                .bind(username)
                .fetch_one(db)
                .await?;

        Ok(count > 0)
    }

    pub async fn find(
        db: &SqlitePool,
        course: &str,
        username: &str,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM tutors WHERE course = ? AND username = ?")
            .bind(course)
            .bind(username)
            .fetch_optional(db)
            .await
    }

    pub async fn for_course(db: &SqlitePool, course: &str) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT * FROM tutors WHERE course = ? ORDER BY username")
            .bind(course)
            .fetch_all(db)
            .await
    }

    /// Tutor logins in name order; ties in load balancing resolve to the
    /// first one returned here.
    pub async fn usernames(db: &SqlitePool, course: &str) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar("SELECT username FROM tutors WHERE course = ? ORDER BY username")
            .bind(course)
            .fetch_all(db)
            .await
    }

    pub async fn count(db: &SqlitePool, course: &str) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tutors WHERE course = ?")
            .bind(course)
            .fetch_one(db)
            .await
    }

    pub async fn insert_if_absent(db: &SqlitePool, tutor: &Self) -> sqlx::Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO tutors (id, course, username, name, email, description) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(tutor.id)
        .bind(&tutor.course)
        .bind(&tutor.username)
        .bind(&tutor.name)
        .bind(&tutor.email)
        .bind(&tutor.description)
        .execute(db)
        .await?;

        Ok(if result.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyPresent
        })
    }

    pub async fn delete(db: &SqlitePool, course: &str, username: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM tutors WHERE course = ? AND username = ?")
            .bind(course)
            .bind(username)
            .execute(db)
            .await?;

        Ok(())
    }
}
