use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::course::{CourseId, CreateCourse};
use crate::integration::IntegrationError;

const SYSTEM: &str = "git";
const TEMPLATE_REPO: &str = "template";
const TUTORS_TEAM: &str = "Tutors";
const STUDENTS_TEAM: &str = "Students";
const COMMIT_EMAIL: &str = "courses@campus.invalid";

/// Everything the course manager needs from the git hosting service. A
/// course is an organization holding a `template` repo, a `tutors` repo and
/// one repo per student named after the student.
#[async_trait]
pub trait GitHost: Send + Sync {
    async fn add_course(&self, course: &CourseId, opts: &CreateCourse)
    -> Result<(), IntegrationError>;

    async fn remove_course(&self, course: &CourseId) -> Result<(), IntegrationError>;

    async fn restrict_access(&self, course: &CourseId) -> Result<(), IntegrationError>;

    async fn permit_access(&self, course: &CourseId) -> Result<(), IntegrationError>;

    async fn add_student(&self, course: &CourseId, student: &str) -> Result<(), IntegrationError>;

    async fn remove_student(&self, course: &CourseId, student: &str)
    -> Result<(), IntegrationError>;

    async fn add_tutor(
        &self,
        course: &CourseId,
        tutor: &str,
        name: &str,
        description: &str,
    ) -> Result<(), IntegrationError>;

    async fn remove_tutor(&self, course: &CourseId, tutor: &str) -> Result<(), IntegrationError>;

    async fn add_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
        students: &[String],
        points: f64,
        author: &str,
    ) -> Result<(), IntegrationError>;

    async fn delete_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
        students: &[String],
        author: &str,
    ) -> Result<(), IntegrationError>;

    async fn get_readme(
        &self,
        course: &CourseId,
        exercise: &str,
        student: &str,
    ) -> Result<Option<String>, IntegrationError>;

    async fn get_notes(
        &self,
        course: &CourseId,
        exercise: &str,
        student: &str,
    ) -> Result<Option<String>, IntegrationError>;

    async fn user_exists(&self, username: &str) -> Result<bool, IntegrationError>;

    async fn is_admin(&self, username: &str) -> Result<bool, IntegrationError>;

    async fn make_admin(&self, username: &str, full_name: &str) -> Result<(), IntegrationError>;
}

#[derive(Deserialize)]
struct Team {
    id: i64,
    name: String,
}

#[derive(Deserialize)]
struct RepoOwner {
    login: String,
}

#[derive(Deserialize)]
struct Repo {
    name: String,
    owner: RepoOwner,
}

#[derive(Deserialize)]
struct GiteaUser {
    is_admin: bool,
}

#[derive(Deserialize)]
struct Contents {
    content: Option<String>,
    sha: String,
}

#[derive(Clone, Copy, Serialize)]
struct Identity<'a> {
    name: &'a str,
    email: &'a str,
}

/// Gitea REST client (API v1, basic auth). Idempotency guards mirror what
/// the upstream API reports for already-absent resources: revoking a
/// collaborator that never existed is a 422, deleting a missing org a 404,
/// re-creating an existing exercise file a 422/403.
pub struct Gitea {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    archive_owner: String,
}

impl Gitea {
    #[must_use]
    pub fn new(base_url: String, username: String, password: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            username,
            password,
            archive_owner: "archive".to_owned(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api/v1{path}", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
    }

    /// Sends the request, treating any status in `allow` as a benign no-op
    /// (`None`). Every other non-success status is an error.
    async fn send(
        &self,
        request: RequestBuilder,
        allow: &[u16],
    ) -> Result<Option<Response>, IntegrationError> {
        let response = request
            .send()
            .await
            .map_err(|err| IntegrationError::transport(SYSTEM, err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(Some(response));
        }
        if allow.contains(&status.as_u16()) {
            return Ok(None);
        }

        let body = response.text().await.unwrap_or_default();
        Err(IntegrationError::Status {
            system: SYSTEM,
            status,
            body,
        })
    }

    async fn team_id(&self, course: &CourseId, team: &str) -> Result<i64, IntegrationError> {
        let teams: Vec<Team> = match self
            .send(self.request(Method::GET, &format!("/orgs/{course}/teams")), &[])
            .await?
        {
            Some(response) => response
                .json()
                .await
                .map_err(|err| IntegrationError::transport(SYSTEM, err))?,
            None => Vec::new(),
        };

        teams
            .into_iter()
            .find(|t| t.name == team)
            .map(|t| t.id)
            .ok_or_else(|| {
                IntegrationError::rejected(SYSTEM, format!("no team {team} in {course}"))
            })
    }

    async fn org_repos(&self, course: &CourseId) -> Result<Vec<Repo>, IntegrationError> {
        match self
            .send(
                self.request(Method::GET, &format!("/orgs/{course}/repos")),
                &[404],
            )
            .await?
        {
            Some(response) => response
                .json()
                .await
                .map_err(|err| IntegrationError::transport(SYSTEM, err)),
            None => Ok(Vec::new()),
        }
    }

    async fn create_org_repo(
        &self,
        course: &CourseId,
        name: &str,
        description: String,
        template: bool,
    ) -> Result<(), IntegrationError> {
        self.send(
            self.request(Method::POST, &format!("/orgs/{course}/repos"))
                .json(&json!({
                    "name": name,
                    "description": description,
                    "auto_init": true,
                    "private": true,
                    "default_branch": "master",
                    "template": template,
                })),
            &[],
        )
        .await?;
        Ok(())
    }

    async fn create_team(
        &self,
        course: &CourseId,
        name: &str,
        description: &str,
        includes_all_repositories: bool,
    ) -> Result<(), IntegrationError> {
        self.send(
            self.request(Method::POST, &format!("/orgs/{course}/teams"))
                .json(&json!({
                    "name": name,
                    "description": description,
                    "permission": "write",
                    "units": ["repo.code"],
                    "includes_all_repositories": includes_all_repositories,
                })),
            &[],
        )
        .await?;
        Ok(())
    }

    /// Archives the repo under a unique name and hands it to the archive
    /// owner, so deleting a course or a student never destroys submissions.
    async fn archive_repo(&self, owner: &str, repo: &str) -> Result<(), IntegrationError> {
        let archived_name = format!("{owner}-{repo}-{}", chrono::Utc::now().timestamp());

        self.send(
            self.request(Method::PATCH, &format!("/repos/{owner}/{repo}"))
                .json(&json!({ "archived": true, "name": archived_name })),
            &[],
        )
        .await?;

        self.send(
            self.request(Method::POST, &format!("/repos/{owner}/{archived_name}/transfer"))
                .json(&json!({ "new_owner": self.archive_owner })),
            &[],
        )
        .await?;
        Ok(())
    }

    async fn ensure_archive_exists(&self) -> Result<(), IntegrationError> {
        if self.user_exists(&self.archive_owner).await? {
            return Ok(());
        }

        self.send(
            self.request(Method::POST, "/admin/users").json(&json!({
                "username": self.archive_owner,
                "login_name": self.archive_owner,
                "email": format!("{}@campus.invalid", self.archive_owner),
                "full_name": "Archive",
                "visibility": "private",
                "password": self.password,
                "must_change_password": false,
            })),
            &[],
        )
        .await?;
        Ok(())
    }

    async fn put_file(
        &self,
        course: &CourseId,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        author: &str,
    ) -> Result<(), IntegrationError> {
        let identity = Identity {
            name: author,
            email: COMMIT_EMAIL,
        };

        // already-existing files are fine, the exercise was published before
        self.send(
            self.request(Method::POST, &format!("/repos/{course}/{repo}/contents/{path}"))
                .json(&json!({
                    "content": BASE64.encode(content),
                    "message": message,
                    "author": identity,
                    "committer": identity,
                })),
            &[403, 422],
        )
        .await?;
        Ok(())
    }

    async fn delete_file(
        &self,
        course: &CourseId,
        repo: &str,
        path: &str,
        message: &str,
        author: &str,
    ) -> Result<(), IntegrationError> {
        let Some(contents) = self.get_contents(course, repo, path).await? else {
            return Ok(());
        };

        let identity = Identity {
            name: author,
            email: COMMIT_EMAIL,
        };

        self.send(
            self.request(
                Method::DELETE,
                &format!("/repos/{course}/{repo}/contents/{path}"),
            )
            .json(&json!({
                "sha": contents.sha,
                "message": message,
                "author": identity,
                "committer": identity,
            })),
            &[400, 403, 404],
        )
        .await?;
        Ok(())
    }

    async fn get_contents(
        &self,
        course: &CourseId,
        repo: &str,
        path: &str,
    ) -> Result<Option<Contents>, IntegrationError> {
        match self
            .send(
                self.request(Method::GET, &format!("/repos/{course}/{repo}/contents/{path}")),
                &[403, 404],
            )
            .await?
        {
            Some(response) => response
                .json()
                .await
                .map_err(|err| IntegrationError::transport(SYSTEM, err))
                .map(Some),
            None => Ok(None),
        }
    }

    async fn get_file(
        &self,
        course: &CourseId,
        repo: &str,
        path: &str,
    ) -> Result<Option<String>, IntegrationError> {
        let Some(contents) = self.get_contents(course, repo, path).await? else {
            return Ok(None);
        };
        let Some(encoded) = contents.content else {
            return Ok(None);
        };

        let raw: String = encoded.split_whitespace().collect();
        Ok(BASE64
            .decode(raw)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok()))
    }
}

#[async_trait]
impl GitHost for Gitea {
    async fn add_course(
        &self,
        course: &CourseId,
        opts: &CreateCourse,
    ) -> Result<(), IntegrationError> {
        self.send(
            self.request(Method::POST, &format!("/admin/users/{}/orgs", opts.owner))
                .json(&json!({
                    "username": course.to_string(),
                    "full_name": opts.display_name,
                    "description": "",
                    "website": opts.website,
                    "visibility": if opts.joinable { "public" } else { "private" },
                    "repo_admin_change_team_access": false,
                })),
            &[],
        )
        .await?;

        self.create_org_repo(
            course,
            TEMPLATE_REPO,
            format!(
                "Template repository for {}. Every student repository in this course is \
                 generated from it, and exercise changes are applied here as well.",
                opts.display_name
            ),
            true,
        )
        .await?;
        self.create_org_repo(course, "tutors", "Space for tutors.".to_owned(), false)
            .await?;

        self.create_team(
            course,
            TUTORS_TEAM,
            "Amazing people grading exercises in exchange for money they definitely need.",
            true,
        )
        .await?;
        self.create_team(course, STUDENTS_TEAM, "Awesome people trying their best.", false)
            .await
    }

    async fn remove_course(&self, course: &CourseId) -> Result<(), IntegrationError> {
        self.restrict_access(course).await?;
        self.ensure_archive_exists().await?;

        for repo in self.org_repos(course).await? {
            self.archive_repo(&repo.owner.login, &repo.name).await?;
        }

        self.send(
            self.request(Method::DELETE, &format!("/orgs/{course}")),
            &[404],
        )
        .await?;
        Ok(())
    }

    async fn restrict_access(&self, course: &CourseId) -> Result<(), IntegrationError> {
        for repo in self.org_repos(course).await? {
            // the repo name doubles as the student's username; repos without
            // a matching user (like template) come back as 422
            self.send(
                self.request(
                    Method::DELETE,
                    &format!(
                        "/repos/{}/{}/collaborators/{}",
                        repo.owner.login, repo.name, repo.name
                    ),
                ),
                &[422],
            )
            .await?;
        }
        Ok(())
    }

    async fn permit_access(&self, course: &CourseId) -> Result<(), IntegrationError> {
        for repo in self.org_repos(course).await? {
            self.send(
                self.request(
                    Method::PUT,
                    &format!(
                        "/repos/{}/{}/collaborators/{}",
                        repo.owner.login, repo.name, repo.name
                    ),
                )
                .json(&json!({ "permission": "write" })),
                &[422],
            )
            .await?;
        }
        Ok(())
    }

    async fn add_student(&self, course: &CourseId, student: &str) -> Result<(), IntegrationError> {
        let team = self.team_id(course, STUDENTS_TEAM).await?;
        self.send(
            self.request(Method::PUT, &format!("/teams/{team}/members/{student}")),
            &[],
        )
        .await?;

        self.send(
            self.request(
                Method::POST,
                &format!("/repos/{course}/{TEMPLATE_REPO}/generate"),
            )
            .json(&json!({
                "owner": course.to_string(),
                "name": student,
                "private": true,
                "git_content": true,
                "git_hooks": true,
                "avatar": true,
                "webhooks": false,
                "topics": false,
                "labels": false,
            })),
            &[],
        )
        .await?;

        self.send(
            self.request(
                Method::PUT,
                &format!("/repos/{course}/{student}/collaborators/{student}"),
            )
            .json(&json!({ "permission": "write" })),
            &[],
        )
        .await?;
        Ok(())
    }

    async fn remove_student(
        &self,
        course: &CourseId,
        student: &str,
    ) -> Result<(), IntegrationError> {
        self.send(
            self.request(
                Method::DELETE,
                &format!("/repos/{course}/{student}/collaborators/{student}"),
            ),
            &[404, 422],
        )
        .await?;

        self.ensure_archive_exists().await?;
        self.archive_repo(&course.to_string(), student).await?;

        let team = self.team_id(course, STUDENTS_TEAM).await?;
        self.send(
            self.request(Method::DELETE, &format!("/teams/{team}/members/{student}")),
            &[404, 422],
        )
        .await?;
        Ok(())
    }

    async fn add_tutor(
        &self,
        course: &CourseId,
        tutor: &str,
        name: &str,
        description: &str,
    ) -> Result<(), IntegrationError> {
        let team = self.team_id(course, TUTORS_TEAM).await?;
        self.send(
            self.request(Method::PUT, &format!("/teams/{team}/members/{tutor}")),
            &[],
        )
        .await?;

        // make the profile visible to the tutor's students
        self.send(
            self.request(Method::PATCH, "/user/settings")
                .header("Sudo", tutor)
                .json(&json!({
                    "full_name": name,
                    "description": description,
                    "hide_activity": false,
                    "hide_email": false,
                })),
            &[],
        )
        .await?;
        Ok(())
    }

    async fn remove_tutor(&self, course: &CourseId, tutor: &str) -> Result<(), IntegrationError> {
        let team = self.team_id(course, TUTORS_TEAM).await?;
        self.send(
            self.request(Method::DELETE, &format!("/teams/{team}/members/{tutor}")),
            &[404],
        )
        .await?;
        Ok(())
    }

    async fn add_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
        students: &[String],
        points: f64,
        author: &str,
    ) -> Result<(), IntegrationError> {
        let message = format!("Published '{exercise}'");
        let readme = format!("# {exercise} (?? / {points})");
        let notes = "# Notes\n\nZeitbedarf: X.X h\n\n## Erfahrungen\nYOUR TEXT HERE".to_owned();

        for repo in students.iter().map(String::as_str).chain([TEMPLATE_REPO]) {
            self.put_file(course, repo, &format!("{exercise}/README.md"), &readme, &message, author)
                .await?;
            self.put_file(course, repo, &format!("{exercise}/NOTES.md"), &notes, &message, author)
                .await?;
        }
        Ok(())
    }

    async fn delete_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
        students: &[String],
        author: &str,
    ) -> Result<(), IntegrationError> {
        let message = format!("Deleted '{exercise}'");

        for repo in students.iter().map(String::as_str).chain([TEMPLATE_REPO]) {
            self.delete_file(course, repo, &format!("{exercise}/README.md"), &message, author)
                .await?;
            self.delete_file(course, repo, &format!("{exercise}/NOTES.md"), &message, author)
                .await?;
        }
        Ok(())
    }

    async fn get_readme(
        &self,
        course: &CourseId,
        exercise: &str,
        student: &str,
    ) -> Result<Option<String>, IntegrationError> {
        self.get_file(course, student, &format!("{exercise}/README.md"))
            .await
    }

    async fn get_notes(
        &self,
        course: &CourseId,
        exercise: &str,
        student: &str,
    ) -> Result<Option<String>, IntegrationError> {
        self.get_file(course, student, &format!("{exercise}/NOTES.md"))
            .await
    }

    async fn user_exists(&self, username: &str) -> Result<bool, IntegrationError> {
        Ok(self
            .send(self.request(Method::GET, &format!("/users/{username}")), &[404])
            .await?
            .is_some())
    }

    async fn is_admin(&self, username: &str) -> Result<bool, IntegrationError> {
        match self
            .send(self.request(Method::GET, &format!("/users/{username}")), &[404])
            .await?
        {
            Some(response) => {
                let user: GiteaUser = response
                    .json()
                    .await
                    .map_err(|err| IntegrationError::transport(SYSTEM, err))?;
                Ok(user.is_admin)
            }
            None => Ok(false),
        }
    }

    async fn make_admin(&self, username: &str, full_name: &str) -> Result<(), IntegrationError> {
        if !self.user_exists(username).await? || self.is_admin(username).await? {
            return Ok(());
        }

        self.send(
            self.request(Method::PATCH, &format!("/admin/users/{username}"))
                .json(&json!({
                    "admin": true,
                    "login_name": username,
                    "full_name": full_name,
                    "source_id": 0,
                })),
            &[],
        )
        .await?;
        Ok(())
    }
}
