use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use campus::course::{CourseError, CourseId, CourseManager, CreateCourse, CreateExercise};
use campus::integration::{ChatPlatform, GitHost, IdentityProvider, IntegrationError, UserInfo};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::SqlitePoolOptions;

/// Records every call; calls whose name starts with the configured prefix
/// fail, everything else succeeds.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
    fail_on: Mutex<Option<&'static str>>,
}

impl Recorder {
    fn record(&self, call: String) -> Result<(), IntegrationError> {
        let should_fail = self
            .fail_on
            .lock()
            .unwrap()
            .is_some_and(|prefix| call.starts_with(prefix));
        self.calls.lock().unwrap().push(call.clone());

        if should_fail {
            Err(IntegrationError::Rejected {
                system: "fake",
                message: call,
            })
        } else {
            Ok(())
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn fail_on(&self, prefix: &'static str) {
        *self.fail_on.lock().unwrap() = Some(prefix);
    }
}

struct FakeGit(Arc<Recorder>);

#[async_trait]
impl GitHost for FakeGit {
    async fn add_course(
        &self,
        course: &CourseId,
        _opts: &CreateCourse,
    ) -> Result<(), IntegrationError> {
        self.0.record(format!("add_course {course}"))
    }

    async fn remove_course(&self, course: &CourseId) -> Result<(), IntegrationError> {
        self.0.record(format!("remove_course {course}"))
    }

    async fn restrict_access(&self, course: &CourseId) -> Result<(), IntegrationError> {
        self.0.record(format!("restrict_access {course}"))
    }

    async fn permit_access(&self, course: &CourseId) -> Result<(), IntegrationError> {
        self.0.record(format!("permit_access {course}"))
    }

    async fn add_student(&self, course: &CourseId, student: &str) -> Result<(), IntegrationError> {
        self.0.record(format!("add_student {course} {student}"))
    }

    async fn remove_student(
        &self,
        course: &CourseId,
        student: &str,
    ) -> Result<(), IntegrationError> {
        self.0.record(format!("remove_student {course} {student}"))
    }

    async fn add_tutor(
        &self,
        course: &CourseId,
        tutor: &str,
        _name: &str,
        _description: &str,
    ) -> Result<(), IntegrationError> {
        self.0.record(format!("add_tutor {course} {tutor}"))
    }

    async fn remove_tutor(&self, course: &CourseId, tutor: &str) -> Result<(), IntegrationError> {
        self.0.record(format!("remove_tutor {course} {tutor}"))
    }

    async fn add_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
        _students: &[String],
        _points: f64,
        _author: &str,
    ) -> Result<(), IntegrationError> {
        self.0.record(format!("add_exercise {course} {exercise}"))
    }

    async fn delete_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
        _students: &[String],
        _author: &str,
    ) -> Result<(), IntegrationError> {
        self.0.record(format!("delete_exercise {course} {exercise}"))
    }

    async fn get_readme(
        &self,
        _course: &CourseId,
        _exercise: &str,
        _student: &str,
    ) -> Result<Option<String>, IntegrationError> {
        Ok(None)
    }

    async fn get_notes(
        &self,
        _course: &CourseId,
        _exercise: &str,
        _student: &str,
    ) -> Result<Option<String>, IntegrationError> {
        Ok(None)
    }

    async fn user_exists(&self, _username: &str) -> Result<bool, IntegrationError> {
        Ok(true)
    }

    async fn is_admin(&self, _username: &str) -> Result<bool, IntegrationError> {
        Ok(false)
    }

    async fn make_admin(&self, username: &str, _full_name: &str) -> Result<(), IntegrationError> {
        self.0.record(format!("make_admin {username}"))
    }
}

struct FakeChat(Arc<Recorder>);

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn add_course(
        &self,
        course: &CourseId,
        _owner: &str,
        _admins: &[String],
    ) -> Result<(), IntegrationError> {
        self.0.record(format!("add_course {course}"))
    }

    async fn remove_course(&self, course: &CourseId) -> Result<(), IntegrationError> {
        self.0.record(format!("remove_course {course}"))
    }

    async fn add_student(&self, course: &CourseId, student: &str) -> Result<(), IntegrationError> {
        self.0.record(format!("add_student {course} {student}"))
    }

    async fn remove_student(
        &self,
        course: &CourseId,
        student: &str,
    ) -> Result<(), IntegrationError> {
        self.0.record(format!("remove_student {course} {student}"))
    }

    async fn add_tutor(&self, course: &CourseId, tutor: &str) -> Result<(), IntegrationError> {
        self.0.record(format!("add_tutor {course} {tutor}"))
    }

    async fn remove_tutor(&self, course: &CourseId, tutor: &str) -> Result<(), IntegrationError> {
        self.0.record(format!("remove_tutor {course} {tutor}"))
    }

    async fn add_owner(&self, course: &CourseId, owner: &str) -> Result<(), IntegrationError> {
        self.0.record(format!("add_owner {course} {owner}"))
    }

    async fn add_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
    ) -> Result<(), IntegrationError> {
        self.0.record(format!("add_exercise {course} {exercise}"))
    }

    async fn remove_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
    ) -> Result<(), IntegrationError> {
        self.0.record(format!("remove_exercise {course} {exercise}"))
    }

    async fn delete_user(&self, username: &str) -> Result<(), IntegrationError> {
        self.0.record(format!("delete_user {username}"))
    }
}

struct FakeIdentity {
    users: HashMap<String, UserInfo>,
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn get_user_info(&self, username: &str) -> Option<UserInfo> {
        self.users.get(username).cloned()
    }

    async fn get_users(&self) -> Option<HashMap<String, UserInfo>> {
        Some(self.users.clone())
    }

    async fn get_admins(&self) -> Option<HashMap<String, UserInfo>> {
        Some(
            self.users
                .iter()
                .filter(|(_, info)| info.is_admin())
                .map(|(name, info)| (name.clone(), info.clone()))
                .collect(),
        )
    }
}

fn user(name: &str) -> UserInfo {
    UserInfo {
        name: format!("{name} muster"),
        email: format!("{name}@uni.example"),
        matriculation_number: Some(1000),
        role: "user".to_owned(),
    }
}

struct Harness {
    courses: CourseManager,
    git: Arc<Recorder>,
    chat: Arc<Recorder>,
}

async fn harness(usernames: &[&str]) -> Harness {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let git = Arc::new(Recorder::default());
    let chat = Arc::new(Recorder::default());
    let users = usernames
        .iter()
        .map(|name| ((*name).to_owned(), user(name)))
        .collect();

    let courses = CourseManager::new(
        pool,
        Arc::new(FakeGit(Arc::clone(&git))),
        Arc::new(FakeChat(Arc::clone(&chat))),
        Arc::new(FakeIdentity { users }),
    );

    Harness { courses, git, chat }
}

fn algo() -> CourseId {
    CourseId::new("algo", "2024SS")
}

fn create_opts() -> CreateCourse {
    CreateCourse {
        owner: "prof".to_owned(),
        display_name: "Algorithms".to_owned(),
        website: "https://uni.example/algo".to_owned(),
        joinable: true,
    }
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn exercise_opts(start: NaiveDateTime, end: NaiveDateTime, points: f64) -> CreateExercise {
    CreateExercise {
        creator: "prof".to_owned(),
        start,
        end,
        points,
    }
}

#[tokio::test]
async fn created_courses_exist_until_deleted() {
    let h = harness(&["prof"]).await;
    let id = algo();

    h.courses.create(&id, create_opts()).await.unwrap();
    assert!(h.courses.exists(&id).await.unwrap());

    h.courses.delete(&id).await.unwrap();
    assert!(!h.courses.exists(&id).await.unwrap());
}

#[tokio::test]
async fn duplicate_creation_is_rejected_case_insensitively_without_side_effects() {
    let h = harness(&["prof"]).await;

    h.courses.create(&algo(), create_opts()).await.unwrap();
    h.git.clear();
    h.chat.clear();

    let err = h
        .courses
        .create(&CourseId::new("ALGO", "2024ss"), create_opts())
        .await
        .unwrap_err();

    assert!(matches!(err, CourseError::AlreadyExists(_)));
    assert!(h.git.calls().is_empty());
    assert!(h.chat.calls().is_empty());
}

#[tokio::test]
async fn failed_git_creation_unwinds_the_chat_team() {
    let h = harness(&["prof"]).await;
    h.git.fail_on("add_course");

    let err = h.courses.create(&algo(), create_opts()).await.unwrap_err();

    assert_eq!(err.to_string(), "failed creating 2024SS-algo in git");
    // the failed step cleans up its own partial work, then the chat team goes
    assert_eq!(
        h.git.calls(),
        vec!["add_course 2024SS-algo", "remove_course 2024SS-algo"]
    );
    assert_eq!(
        h.chat.calls(),
        vec!["add_course 2024SS-algo", "remove_course 2024SS-algo"]
    );
    assert!(!h.courses.exists(&algo()).await.unwrap());
}

#[tokio::test]
async fn unknown_users_cannot_be_enrolled() {
    let h = harness(&["prof"]).await;
    h.courses.create(&algo(), create_opts()).await.unwrap();

    let err = h.courses.add_student(&algo(), "ghost").await.unwrap_err();
    assert!(matches!(err, CourseError::UnknownUser(_)));
}

#[tokio::test]
async fn enrolling_a_user_with_a_role_changes_nothing() {
    let h = harness(&["prof", "anna"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();

    h.git.clear();
    h.chat.clear();

    let err = h.courses.add_student(&id, "anna").await.unwrap_err();
    assert_eq!(err.to_string(), "failed to add anna, is student");
    assert!(h.git.calls().is_empty());
    assert!(h.chat.calls().is_empty());

    // the owner holds a role as well
    let err = h.courses.add_student(&id, "prof").await.unwrap_err();
    assert_eq!(err.to_string(), "failed to add prof, is owner");
    assert!(h.git.calls().is_empty());
}

#[tokio::test]
async fn failed_repo_creation_removes_the_student_from_chat_again() {
    let h = harness(&["prof", "anna"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();

    h.git.fail_on("add_student");
    h.chat.clear();

    let err = h.courses.add_student(&id, "anna").await.unwrap_err();
    assert_eq!(err.to_string(), "failed to create anna's repo in git");
    assert_eq!(
        h.chat.calls(),
        vec!["add_student 2024SS-algo anna", "remove_student 2024SS-algo anna"]
    );
    assert!(!h.courses.has_student(&id, "anna").await.unwrap());
}

#[tokio::test]
async fn the_first_tutor_inherits_all_existing_students() {
    let h = harness(&["prof", "anna", "ben", "tina"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses.add_student(&id, "ben").await.unwrap();

    h.courses.add_tutor(&id, "tina", "grades fast").await.unwrap();

    let overview = h.courses.tutor_overview(&id).await.unwrap();
    assert_eq!(overview["tina"], vec!["anna", "ben"]);
}

#[tokio::test]
async fn new_students_go_to_the_least_loaded_tutor_with_name_order_ties() {
    let h = harness(&["prof", "anna", "ben", "carl", "dora", "emma", "tina", "tom"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses.add_student(&id, "ben").await.unwrap();

    h.courses.add_tutor(&id, "tina", "").await.unwrap();
    h.courses.add_tutor(&id, "tom", "").await.unwrap();

    // tina holds 2, tom 0: the next two go to tom
    h.courses.add_student(&id, "carl").await.unwrap();
    h.courses.add_student(&id, "dora").await.unwrap();
    // 2 vs 2 now, so the tie goes to tina (first in name order)
    h.courses.add_student(&id, "emma").await.unwrap();

    let overview = h.courses.tutor_overview(&id).await.unwrap();
    assert_eq!(overview["tina"], vec!["anna", "ben", "emma"]);
    assert_eq!(overview["tom"], vec!["carl", "dora"]);
}

#[tokio::test]
async fn test_accounts_are_not_assigned_a_tutor() {
    let h = harness(&["prof", "tina", "testdummy"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_tutor(&id, "tina", "").await.unwrap();

    h.courses.add_student(&id, "testdummy").await.unwrap();

    let overview = h.courses.tutor_overview(&id).await.unwrap();
    assert!(overview["tina"].is_empty());
}

#[tokio::test]
async fn removing_a_tutor_redistributes_their_students() {
    let h = harness(&["prof", "anna", "ben", "tina", "tom"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses.add_student(&id, "ben").await.unwrap();
    h.courses.add_tutor(&id, "tina", "").await.unwrap();
    h.courses.add_tutor(&id, "tom", "").await.unwrap();

    h.courses.remove_tutor(&id, "tina").await.unwrap();

    let overview = h.courses.tutor_overview(&id).await.unwrap();
    assert_eq!(overview["tom"], vec!["anna", "ben"]);
    assert!(!overview.contains_key("tina"));
}

#[tokio::test]
async fn removing_a_non_tutor_is_refused() {
    let h = harness(&["prof"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();

    let err = h.courses.remove_tutor(&id, "nobody").await.unwrap_err();
    assert_eq!(err.to_string(), "failed to remove nobody, not a tutor");
}

#[tokio::test]
async fn edit_tutors_moves_students_between_tutors() {
    let h = harness(&["prof", "anna", "ben", "tina", "tom"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses.add_student(&id, "ben").await.unwrap();
    h.courses.add_tutor(&id, "tina", "").await.unwrap();
    h.courses.add_tutor(&id, "tom", "").await.unwrap();

    let update = [
        ("tina".to_owned(), vec!["ben".to_owned()]),
        ("tom".to_owned(), vec!["anna".to_owned()]),
    ]
    .into_iter()
    .collect();
    h.courses.edit_tutors(&id, &update).await.unwrap();

    let overview = h.courses.tutor_overview(&id).await.unwrap();
    assert_eq!(overview["tina"], vec!["ben"]);
    assert_eq!(overview["tom"], vec!["anna"]);
}

#[tokio::test]
async fn exercises_validate_window_name_and_uniqueness() {
    let h = harness(&["prof"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();

    let err = h
        .courses
        .add_exercise(&id, "ex1", exercise_opts(at(2, 12), at(1, 12), 10.0))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "ex1 starts after it ends");
    assert!(!h.courses.has_exercise(&id, "ex1").await.unwrap());

    let err = h
        .courses
        .add_exercise(&id, "ex 1", exercise_opts(at(1, 12), at(2, 12), 10.0))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "ex 1 has spaces in it");

    h.courses
        .add_exercise(&id, "ex1", exercise_opts(at(1, 12), at(2, 12), 10.0))
        .await
        .unwrap();
    let err = h
        .courses
        .add_exercise(&id, "ex1", exercise_opts(at(3, 12), at(4, 12), 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, CourseError::ExerciseExists(_)));
}

#[tokio::test]
async fn exercise_windows_bucket_into_pending_and_finished() {
    let h = harness(&["prof"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();

    h.courses
        .add_exercise(&id, "done", exercise_opts(at(1, 8), at(2, 8), 5.0))
        .await
        .unwrap();
    h.courses
        .add_exercise(&id, "running", exercise_opts(at(3, 8), at(9, 8), 5.0))
        .await
        .unwrap();
    h.courses
        .add_exercise(&id, "upcoming", exercise_opts(at(10, 8), at(12, 8), 5.0))
        .await
        .unwrap();

    let now = at(4, 8);
    let pending = h.courses.pending_exercises(&id, now).await.unwrap();
    let finished = h.courses.finished_exercises(&id, now).await.unwrap();

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, "running");
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].name, "done");
}

#[tokio::test]
async fn deleting_an_exercise_drops_its_grades() {
    let h = harness(&["prof", "anna", "tina"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses
        .add_exercise(&id, "ex1", exercise_opts(at(1, 12), at(2, 12), 10.0))
        .await
        .unwrap();
    h.courses.set_points(&id, "ex1", "anna", "tina", 4.0).await.unwrap();

    h.courses.delete_exercise(&id, "ex1").await.unwrap();

    assert!(!h.courses.has_exercise(&id, "ex1").await.unwrap());
    assert_eq!(h.courses.points(&id, "ex1", "anna").await.unwrap(), None);
}

#[tokio::test]
async fn grading_twice_updates_points_and_tutor() {
    let h = harness(&["prof", "anna", "tina", "tom"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses
        .add_exercise(&id, "ex1", exercise_opts(at(1, 12), at(2, 12), 10.0))
        .await
        .unwrap();

    h.courses.set_points(&id, "ex1", "anna", "tina", 4.0).await.unwrap();
    h.courses.set_points(&id, "ex1", "anna", "tom", 6.5).await.unwrap();

    assert_eq!(h.courses.points(&id, "ex1", "anna").await.unwrap(), Some(6.5));

    let stats = h.courses.student_stats(&id, "anna", false, None).await.unwrap();
    assert_eq!(stats.exercises["ex1"].tutor.as_deref(), Some("tom"));
}

#[tokio::test]
async fn student_stats_report_totals_and_percentage() {
    let h = harness(&["prof", "anna", "ben", "carl", "tina"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    for student in ["anna", "ben", "carl"] {
        h.courses.add_student(&id, student).await.unwrap();
    }
    h.courses
        .add_exercise(&id, "ex1", exercise_opts(at(1, 12), at(2, 12), 10.0))
        .await
        .unwrap();

    h.courses.set_points(&id, "ex1", "anna", "tina", 7.0).await.unwrap();

    let stats = h.courses.student_stats(&id, "anna", false, None).await.unwrap();
    assert_eq!(stats.total, 7.0);
    assert_eq!(stats.max_total, 10.0);
    assert_eq!(stats.percentage, 70.0);
    assert_eq!(stats.exercises["ex1"].points, 7.0);
    assert_eq!(stats.exercises["ex1"].max_points, 10.0);
}

#[tokio::test]
async fn stats_with_zero_maximum_report_zero_percent() {
    let h = harness(&["prof", "anna"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();

    // no exercises at all: nothing to divide by
    let stats = h.courses.student_stats(&id, "anna", true, None).await.unwrap();
    assert_eq!(stats.max_total, 0.0);
    assert_eq!(stats.percentage, 0.0);
}

#[tokio::test]
async fn ungraded_exercises_count_toward_the_maximum_when_asked() {
    let h = harness(&["prof", "anna", "tina"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses
        .add_exercise(&id, "ex1", exercise_opts(at(1, 12), at(2, 12), 10.0))
        .await
        .unwrap();
    h.courses
        .add_exercise(&id, "ex2", exercise_opts(at(3, 12), at(4, 12), 10.0))
        .await
        .unwrap();
    h.courses.set_points(&id, "ex1", "anna", "tina", 5.0).await.unwrap();

    let graded_only = h.courses.student_stats(&id, "anna", false, None).await.unwrap();
    assert_eq!(graded_only.max_total, 10.0);
    assert_eq!(graded_only.percentage, 50.0);

    let with_ungraded = h.courses.student_stats(&id, "anna", true, None).await.unwrap();
    assert_eq!(with_ungraded.max_total, 20.0);
    assert_eq!(with_ungraded.percentage, 25.0);
    assert_eq!(with_ungraded.exercises["ex2"].points, 0.0);
    assert!(with_ungraded.exercises["ex2"].tutor.is_none());
}

#[tokio::test]
async fn removing_a_student_clears_their_assignment_and_grades() {
    let h = harness(&["prof", "anna", "tina"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses.add_tutor(&id, "tina", "").await.unwrap();
    h.courses
        .add_exercise(&id, "ex1", exercise_opts(at(1, 12), at(2, 12), 10.0))
        .await
        .unwrap();
    h.courses.set_points(&id, "ex1", "anna", "tina", 3.0).await.unwrap();

    h.courses.remove_student(&id, "anna").await.unwrap();

    assert!(!h.courses.has_student(&id, "anna").await.unwrap());
    assert_eq!(h.courses.points(&id, "ex1", "anna").await.unwrap(), None);
    let overview = h.courses.tutor_overview(&id).await.unwrap();
    assert!(overview["tina"].is_empty());
}

#[tokio::test]
async fn deleting_a_course_cascades_to_all_dependents() {
    let h = harness(&["prof", "anna", "tina"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses.add_tutor(&id, "tina", "").await.unwrap();
    h.courses
        .add_exercise(&id, "ex1", exercise_opts(at(1, 12), at(2, 12), 10.0))
        .await
        .unwrap();
    h.courses.set_points(&id, "ex1", "anna", "tina", 3.0).await.unwrap();

    h.courses.delete(&id).await.unwrap();

    assert!(!h.courses.exists(&id).await.unwrap());
    assert!(!h.courses.has_student(&id, "anna").await.unwrap());
    assert!(!h.courses.has_tutor(&id, "tina").await.unwrap());
    assert!(!h.courses.has_exercise(&id, "ex1").await.unwrap());
    assert_eq!(h.courses.points(&id, "ex1", "anna").await.unwrap(), None);
}

#[tokio::test]
async fn course_ids_resolve_case_insensitively_to_canonical_casing() {
    let h = harness(&["prof"]).await;
    h.courses.create(&algo(), create_opts()).await.unwrap();

    let resolved = h.courses.resolve("2024ss-ALGO").await.unwrap().unwrap();
    assert_eq!(resolved, algo());

    assert!(h.courses.resolve("2024SS-nope").await.unwrap().is_none());
    assert!(h.courses.resolve("junk").await.unwrap().is_none());
}

#[tokio::test]
async fn roles_resolve_in_precedence_order() {
    let h = harness(&["prof", "anna", "tina"]).await;
    let id = algo();
    h.courses.create(&id, create_opts()).await.unwrap();
    h.courses.add_student(&id, "anna").await.unwrap();
    h.courses.add_tutor(&id, "tina", "").await.unwrap();

    use campus::course::Role;
    assert_eq!(h.courses.role(&id, "anna", false).await.unwrap(), Some(Role::Student));
    assert_eq!(h.courses.role(&id, "tina", false).await.unwrap(), Some(Role::Tutor));
    assert_eq!(h.courses.role(&id, "prof", false).await.unwrap(), Some(Role::Owner));
    assert_eq!(h.courses.role(&id, "root", true).await.unwrap(), Some(Role::Admin));
    assert_eq!(h.courses.role(&id, "nobody", false).await.unwrap(), None);
}
