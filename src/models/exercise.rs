use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Exercise {
    pub id: Uuid,

    pub course: String,
    pub name: String,
    pub creator: String,

    #[sqlx(rename = "start_time")]
    pub start: NaiveDateTime,
    #[sqlx(rename = "end_time")]
    pub end: NaiveDateTime,

    pub points: f64,
}

impl Exercise {
    pub async fn exists(db: &SqlitePool, course: &str, name: &str) -> sqlx::Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE course = ? AND name = ?")
                .bind(course)
                .bind(name)
                .fetch_one(db)
                .await?;

        Ok(count > 0)
    }

    pub async fn find(db: &SqlitePool, course: &str, name: &str) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM exercises WHERE course = ? AND name = ?")
            .bind(course)
            .bind(name)
            .fetch_optional(db)
            .await
    }

    pub async fn for_course(db: &SqlitePool, course: &str) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT * FROM exercises WHERE course = ? ORDER BY start_time, name")
            .bind(course)
            .fetch_all(db)
            .await
    }

    /// Exercises whose submission window contains `now`.
    pub async fn pending(
        db: &SqlitePool,
        course: &str,
        now: NaiveDateTime,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT * FROM exercises \
             WHERE course = ? AND start_time <= ? AND ? < end_time \
             ORDER BY start_time, name",
        )
        .bind(course)
        .bind(now)
        .bind(now)
        .fetch_all(db)
        .await
    }

    /// Exercises whose submission window has closed.
    pub async fn finished(
        db: &SqlitePool,
        course: &str,
        now: NaiveDateTime,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT * FROM exercises WHERE course = ? AND end_time < ? ORDER BY start_time, name",
        )
        .bind(course)
        .bind(now)
        .fetch_all(db)
        .await
    }

    pub async fn insert(db: &SqlitePool, exercise: &Self) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO exercises (id, course, name, creator, start_time, end_time, points) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(exercise.id)
        .bind(&exercise.course)
        .bind(&exercise.name)
        .bind(&exercise.creator)
        .bind(exercise.start)
        .bind(exercise.end)
        .bind(exercise.points)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn set_start(
        db: &SqlitePool,
        course: &str,
        name: &str,
        start: NaiveDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE exercises SET start_time = ? WHERE course = ? AND name = ?")
            .bind(start)
            .bind(course)
            .bind(name)
            .execute(db)
            .await?;

        Ok(())
    }

    pub async fn set_end(
        db: &SqlitePool,
        course: &str,
        name: &str,
        end: NaiveDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE exercises SET end_time = ? WHERE course = ? AND name = ?")
            .bind(end)
            .bind(course)
            .bind(name)
            .execute(db)
            .await?;

        Ok(())
    }

    pub async fn set_points(
        db: &SqlitePool,
        course: &str,
        name: &str,
        points: f64,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE exercises SET points = ? WHERE course = ? AND name = ?")
            .bind(points)
            .bind(course)
            .bind(name)
            .execute(db)
            .await?;

        Ok(())
    }
}
