use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use chrono::NaiveDateTime;
use futures::FutureExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::course::{CourseError, CourseId, CourseManager, Saga, Step};
use crate::models::{Exercise, Grade, Student};

static TIME_SPENT: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used)]
    let pattern = Regex::new(r"Zeitbedarf: (\d+[,.]?\d*) h").unwrap();
    pattern
});

/// Options for publishing an exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExercise {
    pub creator: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub points: f64,
}

/// One graded (or, with `include_ungraded`, pending) exercise in a
/// student's overview.
#[derive(Debug, Clone, Serialize)]
pub struct GradeEntry {
    pub points: f64,
    pub max_points: f64,
    pub tutor: Option<String>,
}

/// Aggregate over a set of exercises for one student.
#[derive(Debug, Serialize)]
pub struct StudentStats {
    pub exercises: BTreeMap<String, GradeEntry>,
    pub total: f64,
    pub max_total: f64,
    /// Rounded to one decimal place; 0.0 when `max_total` is zero.
    pub percentage: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct ExerciseStudent {
    pub points: Option<f64>,
    pub tutor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<f64>,
}

/// One exercise across all students of the course.
#[derive(Debug, Serialize)]
pub struct ExerciseStats {
    pub students: BTreeMap<String, ExerciseStudent>,
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl CourseManager {
    /// Publishes an exercise: a chat channel, placeholder files in every
    /// student repo plus the template, then the local row.
    pub async fn add_exercise(
        &self,
        id: &CourseId,
        exercise: &str,
        opts: CreateExercise,
    ) -> Result<(), CourseError> {
        let uid = id.to_string();

        if Exercise::exists(&self.db, &uid, exercise).await? {
            return Err(CourseError::ExerciseExists(exercise.to_owned()));
        }
        if exercise.contains(' ') {
            return Err(CourseError::SpacesInName(exercise.to_owned()));
        }
        if opts.start > opts.end {
            return Err(CourseError::StartsAfterEnd(exercise.to_owned()));
        }

        let students = Student::usernames(&self.db, &uid).await?;
        let author = self.entity(id).await?.display_name;

        Saga::new()
            .then(
                Step::new(format!("could not create {exercise} in chat"), {
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let exercise = exercise.to_owned();
                    move || async move { chat.add_exercise(&id, &exercise).await }.boxed()
                })
                .undo({
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let exercise = exercise.to_owned();
                    move || async move { chat.remove_exercise(&id, &exercise).await }.boxed()
                }),
            )
            .then(
                Step::new(format!("could not create {exercise} in git"), {
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    let exercise = exercise.to_owned();
                    let students = students.clone();
                    let author = author.clone();
                    let points = opts.points;
                    move || {
                        async move {
                            git.add_exercise(&id, &exercise, &students, points, &author).await
                        }
                        .boxed()
                    }
                })
                .undo({
                    let git = Arc::clone(&self.git);
                    let id = id.clone();
                    let exercise = exercise.to_owned();
                    move || {
                        async move { git.delete_exercise(&id, &exercise, &students, &author).await }
                            .boxed()
                    }
                }),
            )
            .run()
            .await?;

        Exercise::insert(
            &self.db,
            &Exercise {
                id: Uuid::new_v4(),
                course: uid,
                name: exercise.to_owned(),
                creator: opts.creator,
                start: opts.start,
                end: opts.end,
                points: opts.points,
            },
        )
        .await?;

        Ok(())
    }

    /// Withdraws an exercise: removes the chat channel and the placeholder
    /// files everywhere, then drops the local exercise and grade rows.
    pub async fn delete_exercise(&self, id: &CourseId, exercise: &str) -> Result<(), CourseError> {
        let uid = id.to_string();

        if !Exercise::exists(&self.db, &uid, exercise).await? {
            return Err(CourseError::NoSuchExercise(exercise.to_owned()));
        }

        let students = Student::usernames(&self.db, &uid).await?;
        let author = self.entity(id).await?.display_name;

        Saga::new()
            .then(
                Step::new(format!("could not delete {exercise} in chat"), {
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let exercise = exercise.to_owned();
                    move || async move { chat.remove_exercise(&id, &exercise).await }.boxed()
                })
                .undo_completed({
                    let chat = Arc::clone(&self.chat);
                    let id = id.clone();
                    let exercise = exercise.to_owned();
                    move || async move { chat.add_exercise(&id, &exercise).await }.boxed()
                }),
            )
            .then(Step::new(format!("could not delete {exercise} in git"), {
                let git = Arc::clone(&self.git);
                let id = id.clone();
                let exercise = exercise.to_owned();
                move || {
                    async move { git.delete_exercise(&id, &exercise, &students, &author).await }
                        .boxed()
                }
            }))
            .run()
            .await?;

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM exercises WHERE course = ? AND name = ?")
            .bind(&uid)
            .bind(exercise)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM grades WHERE course = ? AND exercise = ?")
            .bind(&uid)
            .bind(exercise)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn exercises(&self, id: &CourseId) -> sqlx::Result<Vec<Exercise>> {
        Exercise::for_course(&self.db, &id.to_string()).await
    }

    pub async fn exercise(&self, id: &CourseId, name: &str) -> sqlx::Result<Option<Exercise>> {
        Exercise::find(&self.db, &id.to_string(), name).await
    }

    pub async fn has_exercise(&self, id: &CourseId, name: &str) -> sqlx::Result<bool> {
        Exercise::exists(&self.db, &id.to_string(), name).await
    }

    /// Exercises with `start <= now < end`.
    pub async fn pending_exercises(
        &self,
        id: &CourseId,
        now: NaiveDateTime,
    ) -> sqlx::Result<Vec<Exercise>> {
        Exercise::pending(&self.db, &id.to_string(), now).await
    }

    /// Exercises with `end < now`.
    pub async fn finished_exercises(
        &self,
        id: &CourseId,
        now: NaiveDateTime,
    ) -> sqlx::Result<Vec<Exercise>> {
        Exercise::finished(&self.db, &id.to_string(), now).await
    }

    pub async fn update_start(
        &self,
        id: &CourseId,
        exercise: &str,
        start: NaiveDateTime,
    ) -> Result<(), CourseError> {
        Exercise::set_start(&self.db, &id.to_string(), exercise, start).await?;
        Ok(())
    }

    pub async fn update_end(
        &self,
        id: &CourseId,
        exercise: &str,
        end: NaiveDateTime,
    ) -> Result<(), CourseError> {
        Exercise::set_end(&self.db, &id.to_string(), exercise, end).await?;
        Ok(())
    }

    pub async fn update_points(
        &self,
        id: &CourseId,
        exercise: &str,
        points: f64,
    ) -> Result<(), CourseError> {
        Exercise::set_points(&self.db, &id.to_string(), exercise, points).await?;
        Ok(())
    }

    /// Records (or corrects) a student's points and the grading tutor.
    pub async fn set_points(
        &self,
        id: &CourseId,
        exercise: &str,
        student: &str,
        tutor: &str,
        points: f64,
    ) -> Result<(), CourseError> {
        Grade::upsert(&self.db, &id.to_string(), exercise, student, tutor, points).await?;
        Ok(())
    }

    pub async fn points(
        &self,
        id: &CourseId,
        exercise: &str,
        student: &str,
    ) -> Result<Option<f64>, CourseError> {
        Ok(Grade::find(&self.db, &id.to_string(), exercise, student)
            .await?
            .map(|grade| grade.points))
    }

    /// Per-student aggregate over `exercises` (all of the course's when
    /// `None`). `include_ungraded` counts ungraded exercises as zero
    /// points toward the maximum.
    pub async fn student_stats(
        &self,
        id: &CourseId,
        student: &str,
        include_ungraded: bool,
        exercises: Option<&[Exercise]>,
    ) -> Result<StudentStats, CourseError> {
        let uid = id.to_string();

        let all;
        let exercises = match exercises {
            Some(exercises) => exercises,
            None => {
                all = Exercise::for_course(&self.db, &uid).await?;
                &all
            }
        };
        let grades = Grade::for_student(&self.db, &uid, student).await?;

        let mut entries = BTreeMap::new();
        let mut total = 0.0;
        let mut max_total = 0.0;

        for exercise in exercises {
            match grades.iter().find(|grade| grade.exercise == exercise.name) {
                Some(grade) => {
                    total += grade.points;
                    max_total += exercise.points;
                    entries.insert(
                        exercise.name.clone(),
                        GradeEntry {
                            points: grade.points,
                            max_points: exercise.points,
                            tutor: Some(grade.tutor.clone()),
                        },
                    );
                }
                None if include_ungraded => {
                    max_total += exercise.points;
                    entries.insert(
                        exercise.name.clone(),
                        GradeEntry {
                            points: 0.0,
                            max_points: exercise.points,
                            tutor: None,
                        },
                    );
                }
                None => {}
            }
        }

        let percentage = if max_total > 0.0 {
            round_one_decimal(total / max_total * 100.0)
        } else {
            0.0
        };

        Ok(StudentStats {
            exercises: entries,
            total,
            max_total,
            percentage,
        })
    }

    /// One exercise across every student of the course. Fetching time
    /// spent reads each student's NOTES.md from the git host.
    pub async fn exercise_stats(
        &self,
        id: &CourseId,
        exercise: &str,
        include_time_spent: bool,
    ) -> Result<ExerciseStats, CourseError> {
        let uid = id.to_string();
        let grades = Grade::for_exercise(&self.db, &uid, exercise).await?;

        let mut students = BTreeMap::new();
        for username in Student::usernames(&self.db, &uid).await? {
            let mut entry = ExerciseStudent::default();

            if let Some(grade) = grades.iter().find(|grade| grade.student == username) {
                entry.points = Some(grade.points);
                entry.tutor = Some(grade.tutor.clone());
            }
            if include_time_spent {
                entry.time_spent = self
                    .git
                    .get_notes(id, exercise, &username)
                    .await?
                    .and_then(|notes| parse_time_spent(&notes));
            }

            students.insert(username, entry);
        }

        Ok(ExerciseStats { students })
    }

    /// Histogram of hours spent, as reported by the students in their
    /// NOTES.md, keyed by rounded hour.
    pub async fn time_spent(
        &self,
        id: &CourseId,
        exercise: &str,
    ) -> Result<BTreeMap<i64, usize>, CourseError> {
        let uid = id.to_string();
        let mut histogram = BTreeMap::new();

        for student in Student::usernames(&self.db, &uid).await? {
            let Some(notes) = self.git.get_notes(id, exercise, &student).await? else {
                continue;
            };
            let Some(spent) = parse_time_spent(&notes) else {
                continue;
            };

            #[expect(clippy::as_conversions)]
            let hours = spent.round() as i64;
            *histogram.entry(hours).or_insert(0) += 1;
        }

        Ok(histogram)
    }
}

/// Extracts the self-reported hours from a NOTES.md. Requires exactly one
/// `Zeitbedarf:` line with a parseable number.
fn parse_time_spent(notes: &str) -> Option<f64> {
    let mut matches = TIME_SPENT.captures_iter(notes);
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }

    first.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_one_decimal() {
        assert!((round_one_decimal(66.666) - 66.7).abs() < f64::EPSILON);
        assert!((round_one_decimal(70.0) - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_a_single_time_spent_line() {
        let notes = "# Notes\n\nZeitbedarf: 3.5 h\n\n## Erfahrungen\nwar ok";
        assert_eq!(parse_time_spent(notes), Some(3.5));
    }

    #[test]
    fn rejects_missing_or_ambiguous_time_spent() {
        assert_eq!(parse_time_spent("# Notes\n"), None);
        assert_eq!(
            parse_time_spent("Zeitbedarf: 2 h\nZeitbedarf: 3 h\n"),
            None
        );
    }

    #[test]
    fn comma_decimals_are_not_counted() {
        assert_eq!(parse_time_spent("Zeitbedarf: 2,5 h"), None);
    }
}
