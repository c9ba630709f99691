use std::sync::Arc;

use futures::FutureExt;
use uuid::Uuid;

use crate::course::{CourseError, CourseId, CourseManager, CreateCourse, Saga, Step};
use crate::models::Course;

impl CourseManager {
    /// Creates the course on the chat platform and the git host, then
    /// records it locally. A failed step undoes everything done so far and
    /// reports which system refused.
    pub async fn create(&self, id: &CourseId, opts: CreateCourse) -> Result<(), CourseError> {
        if Course::exists_ci(&self.db, id).await? {
            return Err(CourseError::AlreadyExists(id.clone()));
        }

        let admins = match self.identity.get_admins().await {
            Some(admins) => {
                let mut names: Vec<String> = admins.into_keys().collect();
                names.sort();
                names
            }
            None => Vec::new(),
        };

        Saga::new()
            .then(
                Step::new(format!("failed creating {id} in chat"), {
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let owner = opts.owner.clone();
                    move || async move { chat.add_course(&id, &owner, &admins).await }.boxed()
                })
                .undo({
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    move || async move { chat.remove_course(&id).await }.boxed()
                }),
            )
            .then(
                Step::new(format!("failed creating {id} in git"), {
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    let opts = opts.clone();
                    move || async move { git.add_course(&id, &opts).await }.boxed()
                })
                .undo({
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    move || async move { git.remove_course(&id).await }.boxed()
                }),
            )
            .run()
            .await?;

        Course::insert(
            &self.db,
            &Course {
                id: Uuid::new_v4(),
                name: id.name().to_owned(),
                semester: id.semester().to_owned(),
                owner: opts.owner,
                display_name: opts.display_name,
                website: opts.website,
                restricted: false,
                open: opts.joinable,
            },
        )
        .await?;

        Ok(())
    }

    /// Tears the course down everywhere. Repos are archived by the git
    /// host, not destroyed; removals are not compensated since there is
    /// nothing sensible to restore.
    pub async fn delete(&self, id: &CourseId) -> Result<(), CourseError> {
        if !Course::exists(&self.db, id).await? {
            return Err(CourseError::NotFound(id.clone()));
        }

        Saga::new()
            .then(Step::new(format!("failed to remove {id} in chat"), {
                let chat = Arc::clone(&self.chat);
                let id = id.clone();
                move || async move { chat.remove_course(&id).await }.boxed()
            }))
            .then(Step::new(format!("failed to remove {id} in git"), {
                let git = Arc::clone(&self.git);
                let id = id.clone();
                move || async move { git.remove_course(&id).await }.boxed()
            }))
            .run()
            .await?;

        let uid = id.to_string();
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM courses WHERE name = ? AND semester = ?")
            .bind(id.name())
            .bind(id.semester())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM students WHERE course = ?")
            .bind(&uid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM tutors WHERE course = ?")
            .bind(&uid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM tutor_students WHERE course = ?")
            .bind(&uid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM exercises WHERE course = ?")
            .bind(&uid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM grades WHERE course = ?")
            .bind(&uid)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Revokes every student's collaborator access, e.g. during exams.
    pub async fn restrict_student_access(&self, id: &CourseId) -> Result<(), CourseError> {
        Saga::new()
            .then(Step::new(
                format!("failed restricting student access for {id} in git"),
                {
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    move || async move { git.restrict_access(&id).await }.boxed()
                },
            ))
            .run()
            .await?;

        Course::set_restricted(&self.db, id, true).await?;
        Ok(())
    }

    pub async fn permit_student_access(&self, id: &CourseId) -> Result<(), CourseError> {
        Saga::new()
            .then(Step::new(
                format!("failed permitting student access for {id} in git"),
                {
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    move || async move { git.permit_access(&id).await }.boxed()
                },
            ))
            .run()
            .await?;

        Course::set_restricted(&self.db, id, false).await?;
        Ok(())
    }

    /// Local flag only; no external side effects.
    pub async fn open(&self, id: &CourseId) -> Result<(), CourseError> {
        Course::set_open(&self.db, id, true).await?;
        Ok(())
    }

    pub async fn close(&self, id: &CourseId) -> Result<(), CourseError> {
        Course::set_open(&self.db, id, false).await?;
        Ok(())
    }
}
