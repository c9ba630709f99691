use std::collections::BTreeMap;
use std::sync::Arc;

use futures::FutureExt;
use uuid::Uuid;

use crate::course::{CourseError, CourseId, CourseManager, Saga, Step};
use crate::models::{InsertOutcome, Student, Tutor, TutorStudent};

impl CourseManager {
    /// Enrolls a user: chat membership, a repo generated from the course
    /// template with collaborator access, a tutor by least load, then the
    /// local record. Only works for users without any role in the course.
    pub async fn add_student(&self, id: &CourseId, student: &str) -> Result<(), CourseError> {
        let Some(info) = self.identity.get_user_info(student).await else {
            return Err(CourseError::UnknownUser(student.to_owned()));
        };

        if let Some(role) = self.role(id, student, info.is_admin()).await? {
            return Err(CourseError::HasRole {
                username: student.to_owned(),
                role,
            });
        }

        Saga::new()
            .then(
                Step::new(format!("failed to add {student} to {id} in chat"), {
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let student = student.to_owned();
                    move || async move { chat.add_student(&id, &student).await }.boxed()
                })
                .undo({
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let student = student.to_owned();
                    move || async move { chat.remove_student(&id, &student).await }.boxed()
                }),
            )
            .then(
                Step::new(format!("failed to create {student}'s repo in git"), {
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    let student = student.to_owned();
                    move || async move { git.add_student(&id, &student).await }.boxed()
                })
                .undo({
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    let student = student.to_owned();
                    move || async move { git.remove_student(&id, &student).await }.boxed()
                }),
            )
            .run()
            .await?;

        self.assign_tutor(id, student).await?;

        let outcome = Student::insert_if_absent(
            &self.db,
            &Student {
                id: Uuid::new_v4(),
                course: id.to_string(),
                username: student.to_owned(),
                name: info.name,
                email: info.email,
                matriculation_number: info.matriculation_number,
            },
        )
        .await?;
        if outcome == InsertOutcome::AlreadyPresent {
            // lost a race against a concurrent enrollment of the same user
            tracing::debug!(%id, student, "student record already present");
        }

        Ok(())
    }

    pub async fn remove_student(&self, id: &CourseId, student: &str) -> Result<(), CourseError> {
        if !self.has_student(id, student).await? {
            return Err(CourseError::NotAStudent(student.to_owned()));
        }

        Saga::new()
            .then(
                Step::new(format!("failed to remove {student} in chat"), {
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let student = student.to_owned();
                    move || async move { chat.remove_student(&id, &student).await }.boxed()
                })
                .undo_completed({
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let student = student.to_owned();
                    move || async move { chat.add_student(&id, &student).await }.boxed()
                }),
            )
            .then(Step::new(format!("failed to remove {student} in git"), {
                let git = Arc::clone(&self.git);
                let id = id.clone();
                let student = student.to_owned();
                move || async move { git.remove_student(&id, &student).await }.boxed()
            }))
            .run()
            .await?;

        self.unassign_tutor(id, student).await?;

        let uid = id.to_string();
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM students WHERE course = ? AND username = ?")
            .bind(&uid)
            .bind(student)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM grades WHERE course = ? AND student = ?")
            .bind(&uid)
            .bind(student)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Adds a tutor. The first tutor a course ever gets inherits every
    /// currently unassigned student.
    pub async fn add_tutor(
        &self,
        id: &CourseId,
        tutor: &str,
        description: &str,
    ) -> Result<(), CourseError> {
        if let Some(role) = self.role(id, tutor, false).await? {
            return Err(CourseError::HasRole {
                username: tutor.to_owned(),
                role,
            });
        }

        let Some(info) = self.identity.get_user_info(tutor).await else {
            return Err(CourseError::UnknownUser(tutor.to_owned()));
        };

        Saga::new()
            .then(
                Step::new(format!("failed to add {tutor} in chat"), {
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let tutor = tutor.to_owned();
                    move || async move { chat.add_tutor(&id, &tutor).await }.boxed()
                })
                .undo({
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let tutor = tutor.to_owned();
                    move || async move { chat.remove_tutor(&id, &tutor).await }.boxed()
                }),
            )
            .then(
                Step::new(format!("failed to add {tutor} in git"), {
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    let tutor = tutor.to_owned();
                    let name = info.name.clone();
                    let description = description.to_owned();
                    move || {
                        async move { git.add_tutor(&id, &tutor, &name, &description).await }.boxed()
                    }
                })
                .undo({
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    let tutor = tutor.to_owned();
                    move || async move { git.remove_tutor(&id, &tutor).await }.boxed()
                }),
            )
            .run()
            .await?;

        let uid = id.to_string();
        let outcome = Tutor::insert_if_absent(
            &self.db,
            &Tutor {
                id: Uuid::new_v4(),
                course: uid.clone(),
                username: tutor.to_owned(),
                name: info.name,
                email: info.email,
                description: description.to_owned(),
            },
        )
        .await?;
        if outcome == InsertOutcome::AlreadyPresent {
            tracing::debug!(%id, tutor, "tutor record already present");
        }

        // first tutor ever: they take over all students
        if Tutor::count(&self.db, &uid).await? == 1 {
            for student in Student::usernames(&self.db, &uid).await? {
                let outcome =
                    TutorStudent::insert_if_absent(&self.db, &uid, &student, tutor).await?;
                if outcome == InsertOutcome::AlreadyPresent {
                    tracing::debug!(%id, %student, "student already had a tutor");
                }
            }
        }

        Ok(())
    }

    /// Removes a tutor and redistributes their students to whoever has the
    /// fewest assignees now.
    pub async fn remove_tutor(&self, id: &CourseId, tutor: &str) -> Result<(), CourseError> {
        if !self.has_tutor(id, tutor).await? {
            return Err(CourseError::NotATutor(tutor.to_owned()));
        }

        Saga::new()
            .then(
                Step::new(format!("failed to remove {tutor} in chat"), {
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let tutor = tutor.to_owned();
                    move || async move { chat.remove_tutor(&id, &tutor).await }.boxed()
                })
                .undo_completed({
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let tutor = tutor.to_owned();
                    move || async move { chat.add_tutor(&id, &tutor).await }.boxed()
                }),
            )
            .then(Step::new(format!("failed to remove {tutor} in git"), {
                let git = Arc::clone(&self.git);
                let id = id.clone();
                let tutor = tutor.to_owned();
                move || async move { git.remove_tutor(&id, &tutor).await }.boxed()
            }))
            .run()
            .await?;

        let uid = id.to_string();
        Tutor::delete(&self.db, &uid, tutor).await?;

        let orphaned = TutorStudent::students_of(&self.db, &uid, tutor).await?;
        TutorStudent::delete_for_tutor(&self.db, &uid, tutor).await?;
        for student in orphaned {
            self.assign_tutor(id, &student).await?;
        }

        Ok(())
    }

    /// Assigns the student to the tutor with the fewest assignees, ties
    /// going to the first tutor in username order. No-op while the course
    /// has no tutors (the first tutor picks everyone up) and for test
    /// accounts.
    pub async fn assign_tutor(&self, id: &CourseId, student: &str) -> Result<(), CourseError> {
        if student.starts_with("test") {
            return Ok(());
        }

        let uid = id.to_string();
        let tutors = Tutor::usernames(&self.db, &uid).await?;
        if tutors.is_empty() {
            return Ok(());
        }

        let counts: BTreeMap<String, i64> =
            TutorStudent::counts(&self.db, &uid).await?.into_iter().collect();

        let mut best: Option<(&str, i64)> = None;
        for tutor in &tutors {
            let load = counts.get(tutor).copied().unwrap_or(0);
            if best.is_none_or(|(_, lowest)| load < lowest) {
                best = Some((tutor, load));
            }
        }

        if let Some((tutor, _)) = best {
            let outcome = TutorStudent::insert_if_absent(&self.db, &uid, student, tutor).await?;
            if outcome == InsertOutcome::AlreadyPresent {
                tracing::debug!(%id, student, "student already had a tutor");
            }
        }

        Ok(())
    }

    pub async fn unassign_tutor(&self, id: &CourseId, student: &str) -> Result<(), CourseError> {
        TutorStudent::delete_for_student(&self.db, &id.to_string(), student).await?;
        Ok(())
    }

    /// Applies a bulk tutor→students reassignment. The mapping is trusted:
    /// empty lists are skipped and coverage is not re-validated here, the
    /// admin route checks it before calling.
    pub async fn edit_tutors(
        &self,
        id: &CourseId,
        update: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), CourseError> {
        let uid = id.to_string();

        for (tutor, students) in update {
            for student in students {
                match TutorStudent::tutor_of(&self.db, &uid, student).await? {
                    // never had a tutor, for whatever reason
                    None => {
                        TutorStudent::insert_if_absent(&self.db, &uid, student, tutor).await?;
                    }
                    Some(current) if current != *tutor => {
                        TutorStudent::set_tutor(&self.db, &uid, student, tutor).await?;
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }

    pub async fn student_tutor(
        &self,
        id: &CourseId,
        student: &str,
    ) -> Result<Option<Tutor>, CourseError> {
        let uid = id.to_string();

        match TutorStudent::tutor_of(&self.db, &uid, student).await? {
            Some(tutor) => Ok(Tutor::find(&self.db, &uid, &tutor).await?),
            None => Ok(None),
        }
    }

    /// Every tutor with the students currently assigned to them.
    pub async fn tutor_overview(
        &self,
        id: &CourseId,
    ) -> Result<BTreeMap<String, Vec<String>>, CourseError> {
        let uid = id.to_string();
        let mut overview = BTreeMap::new();

        for tutor in Tutor::usernames(&self.db, &uid).await? {
            let students = TutorStudent::students_of(&self.db, &uid, &tutor).await?;
            overview.insert(tutor, students);
        }

        Ok(overview)
    }
}
