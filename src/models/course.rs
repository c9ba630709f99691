use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::course::CourseId;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: Uuid,

    pub name: String,
    pub semester: String,
    pub owner: String,
    pub display_name: String,
    pub website: String,

    /// Students have lost collaborator access to their repos.
    pub restricted: bool,
    /// Students may join on their own.
    pub open: bool,
}

impl Course {
    #[must_use]
    pub fn course_id(&self) -> CourseId {
        CourseId::new(self.name.clone(), self.semester.clone())
    }

    pub async fn find(db: &SqlitePool, id: &CourseId) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM courses WHERE name = ? AND semester = ?")
            .bind(id.name())
            .bind(id.semester())
            .fetch_optional(db)
            .await
    }

    pub async fn exists(db: &SqlitePool, id: &CourseId) -> sqlx::Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE name = ? AND semester = ?")
                .bind(id.name())
                .bind(id.semester())
                .fetch_one(db)
                .await?;

        Ok(count > 0)
    }

    /// Case-insensitive existence check, used to reject re-creations that
    /// only differ in casing.
    pub async fn exists_ci(db: &SqlitePool, id: &CourseId) -> sqlx::Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM courses \
             WHERE name = ? COLLATE NOCASE AND semester = ? COLLATE NOCASE",
        )
        .bind(id.name())
        .bind(id.semester())
        .fetch_one(db)
        .await?;

        Ok(count > 0)
    }

    /// Canonical casing of a course whose id only matches case-insensitively.
    pub async fn find_ci(db: &SqlitePool, id: &CourseId) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(
            "SELECT * FROM courses \
             WHERE name = ? COLLATE NOCASE AND semester = ? COLLATE NOCASE",
        )
        .bind(id.name())
        .bind(id.semester())
        .fetch_optional(db)
        .await
    }

    pub async fn all(db: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT * FROM courses ORDER BY semester, name")
            .fetch_all(db)
            .await
    }

    pub async fn insert(db: &SqlitePool, course: &Self) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO courses (id, name, semester, owner, display_name, website, restricted, open) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(course.id)
        .bind(&course.name)
        .bind(&course.semester)
        .bind(&course.owner)
        .bind(&course.display_name)
        .bind(&course.website)
        .bind(course.restricted)
        .bind(course.open)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn set_open(db: &SqlitePool, id: &CourseId, open: bool) -> sqlx::Result<()> {
        sqlx::query("UPDATE courses SET open = ? WHERE name = ? AND semester = ?")
            .bind(open)
            .bind(id.name())
            .bind(id.semester())
            .execute(db)
            .await?;

        Ok(())
    }

    pub async fn set_restricted(
        db: &SqlitePool,
        id: &CourseId,
        restricted: bool,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE courses SET restricted = ? WHERE name = ? AND semester = ?")
            .bind(restricted)
            .bind(id.name())
            .bind(id.semester())
            .execute(db)
            .await?;

        Ok(())
    }
}
