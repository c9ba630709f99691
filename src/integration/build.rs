use reqwest::header::AUTHORIZATION;

use crate::course::CourseId;
use crate::integration::IntegrationError;

const SYSTEM: &str = "build";

/// Client for the external build server that compiles and checks student
/// submissions. Triggering a build is fire-and-forget.
pub struct BuildServer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BuildServer {
    #[must_use]
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Kicks off a build for the student's repo, scoped to one exercise
    /// when given. Failures are logged, never surfaced: a missed build can
    /// be retriggered by the next push.
    pub async fn build(&self, course: &CourseId, student: &str, exercise: Option<&str>) {
        let mut url = format!("{}/build/{course}/{student}", self.base_url);
        if let Some(exercise) = exercise {
            url.push('/');
            url.push_str(exercise);
        }

        let result = self
            .http
            .get(url)
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::error!(status = %response.status(), %course, student, "failed to contact build server");
            }
            Err(err) => {
                tracing::error!(error = %err, %course, student, "failed to contact build server");
            }
        }
    }

    /// Fetches the latest build log for a student's exercise, `None` when
    /// no build has run yet.
    pub async fn logs(
        &self,
        course: &CourseId,
        student: &str,
        exercise: &str,
    ) -> Result<Option<String>, IntegrationError> {
        let response = self
            .http
            .get(format!("{}/logs/{course}/{student}/{exercise}", self.base_url))
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .await
            .map_err(|err| IntegrationError::transport(SYSTEM, err))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Status {
                system: SYSTEM,
                status,
                body,
            });
        }

        response
            .text()
            .await
            .map(Some)
            .map_err(|err| IntegrationError::transport(SYSTEM, err))
    }
}
