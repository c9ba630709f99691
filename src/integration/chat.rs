use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};

use crate::course::CourseId;
use crate::integration::IntegrationError;

const SYSTEM: &str = "chat";

/// Everything the course manager needs from the chat platform. A course is
/// a private team whose main room is read-only; every exercise gets its own
/// default channel named `{course}-{exercise}`.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Creates the course team with `owner` as its owner (when the owner has
    /// a chat account) and grants ownership to every platform admin.
    async fn add_course(
        &self,
        course: &CourseId,
        owner: &str,
        admins: &[String],
    ) -> Result<(), IntegrationError>;

    async fn remove_course(&self, course: &CourseId) -> Result<(), IntegrationError>;

    async fn add_student(&self, course: &CourseId, student: &str) -> Result<(), IntegrationError>;

    async fn remove_student(&self, course: &CourseId, student: &str)
    -> Result<(), IntegrationError>;

    async fn add_tutor(&self, course: &CourseId, tutor: &str) -> Result<(), IntegrationError>;

    async fn remove_tutor(&self, course: &CourseId, tutor: &str) -> Result<(), IntegrationError>;

    async fn add_owner(&self, course: &CourseId, owner: &str) -> Result<(), IntegrationError>;

    async fn add_exercise(&self, course: &CourseId, exercise: &str)
    -> Result<(), IntegrationError>;

    async fn remove_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
    ) -> Result<(), IntegrationError>;

    async fn delete_user(&self, username: &str) -> Result<(), IntegrationError>;
}

/// Rocket.Chat REST client. The API wraps every response in a
/// `{"success": bool}` envelope, so a call only counts when the status is
/// 200 *and* the envelope agrees; `ignore_failure` calls are best-effort
/// cleanup where the resource may already be gone.
pub struct RocketChat {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    token: String,
}

impl RocketChat {
    #[must_use]
    pub fn new(base_url: String, user_id: String, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            user_id,
            token,
        }
    }

    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        query: &[(&str, &str)],
        ignore_failure: bool,
    ) -> Result<Option<Value>, IntegrationError> {
        let mut request = self
            .http
            .request(method, format!("{}/api/v1/{endpoint}", self.base_url))
            .header("X-Auth-Token", &self.token)
            .header("X-User-Id", &self.user_id)
            .query(query);

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) if ignore_failure => {
                tracing::debug!(error = %err, endpoint, "ignoring failed chat call");
                return Ok(None);
            }
            Err(err) => return Err(IntegrationError::transport(SYSTEM, err)),
        };

        let status = response.status();
        let payload: Value = response.json().await.unwrap_or_default();
        let success = status.is_success() && payload["success"].as_bool().unwrap_or(false);

        if success {
            Ok(Some(payload))
        } else if ignore_failure {
            tracing::debug!(%status, endpoint, "ignoring rejected chat call");
            Ok(None)
        } else {
            Err(IntegrationError::rejected(
                SYSTEM,
                format!("{endpoint} returned {status}: {payload}"),
            ))
        }
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Option<Value>, IntegrationError> {
        self.call(Method::POST, endpoint, Some(body), &[], false).await
    }

    async fn post_lenient(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<Option<Value>, IntegrationError> {
        self.call(Method::POST, endpoint, Some(body), &[], true).await
    }

    async fn user_id_of(&self, username: &str) -> Option<String> {
        let payload = self
            .call(Method::GET, "users.info", None, &[("username", username)], true)
            .await
            .ok()??;

        payload["user"]["_id"].as_str().map(str::to_owned)
    }

    async fn team_room_ids(&self, course: &CourseId) -> Vec<Value> {
        let Ok(Some(payload)) = self
            .call(
                Method::GET,
                "teams.listRooms",
                None,
                &[("teamName", &course.to_string())],
                true,
            )
            .await
        else {
            return Vec::new();
        };

        payload["rooms"]
            .as_array()
            .map(|rooms| rooms.iter().map(|room| room["_id"].clone()).collect())
            .unwrap_or_default()
    }

    async fn team_room_id(&self, course: &CourseId, name: &str) -> Option<Value> {
        let payload = self
            .call(
                Method::GET,
                "teams.listRooms",
                None,
                &[("teamName", &course.to_string())],
                true,
            )
            .await
            .ok()??;

        payload["rooms"]
            .as_array()?
            .iter()
            .find(|room| room["name"] == name)
            .map(|room| room["_id"].clone())
    }

    async fn add_member(
        &self,
        course: &CourseId,
        username: &str,
        role: &str,
    ) -> Result<Option<String>, IntegrationError> {
        let Some(uid) = self.user_id_of(username).await else {
            // chat accounts are created lazily on first login; nothing to do yet
            return Ok(None);
        };

        self.post(
            "teams.addMembers",
            json!({
                "teamName": course.to_string(),
                "members": [{ "userId": uid, "roles": [role] }],
            }),
        )
        .await?;
        Ok(Some(uid))
    }

    async fn remove_member(&self, course: &CourseId, username: &str) -> Result<(), IntegrationError> {
        let Some(uid) = self.user_id_of(username).await else {
            return Ok(());
        };

        self.post_lenient(
            "teams.removeMember",
            json!({
                "teamName": course.to_string(),
                "userId": uid,
                "rooms": self.team_room_ids(course).await,
            }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for RocketChat {
    async fn add_course(
        &self,
        course: &CourseId,
        owner: &str,
        admins: &[String],
    ) -> Result<(), IntegrationError> {
        match self.user_id_of(owner).await {
            Some(uid) => {
                let payload = self
                    .post(
                        "teams.create",
                        json!({
                            "name": course.to_string(),
                            "type": 1,
                            "room": { "readOnly": true },
                            "members": [uid],
                        }),
                    )
                    .await?
                    .unwrap_or_default();

                self.post(
                    "channels.addOwner",
                    json!({ "roomId": payload["team"]["roomId"], "userId": uid }),
                )
                .await?;
            }
            None => {
                self.post(
                    "teams.create",
                    json!({
                        "name": course.to_string(),
                        "type": 1,
                        "room": { "readOnly": true },
                    }),
                )
                .await?;
            }
        }

        for admin in admins {
            self.add_owner(course, admin).await?;
        }
        Ok(())
    }

    async fn remove_course(&self, course: &CourseId) -> Result<(), IntegrationError> {
        let rooms = self.team_room_ids(course).await;

        let mut body = json!({ "teamName": course.to_string() });
        if !rooms.is_empty() {
            body["roomsToRemove"] = Value::Array(rooms);
        }

        self.post_lenient("teams.delete", body).await?;
        Ok(())
    }

    async fn add_student(&self, course: &CourseId, student: &str) -> Result<(), IntegrationError> {
        self.add_member(course, student, "member").await?;
        Ok(())
    }

    async fn remove_student(
        &self,
        course: &CourseId,
        student: &str,
    ) -> Result<(), IntegrationError> {
        self.remove_member(course, student).await
    }

    async fn add_tutor(&self, course: &CourseId, tutor: &str) -> Result<(), IntegrationError> {
        let Some(uid) = self.add_member(course, tutor, "moderator").await? else {
            return Ok(());
        };

        for rid in self.team_room_ids(course).await {
            self.post_lenient("channels.addModerator", json!({ "roomId": rid, "userId": uid }))
                .await?;
        }
        Ok(())
    }

    async fn remove_tutor(&self, course: &CourseId, tutor: &str) -> Result<(), IntegrationError> {
        self.remove_member(course, tutor).await
    }

    async fn add_owner(&self, course: &CourseId, owner: &str) -> Result<(), IntegrationError> {
        let Some(uid) = self.add_member(course, owner, "owner").await? else {
            return Ok(());
        };

        for rid in self.team_room_ids(course).await {
            self.post("channels.addOwner", json!({ "roomId": rid, "userId": uid }))
                .await?;
        }
        Ok(())
    }

    async fn add_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
    ) -> Result<(), IntegrationError> {
        let name = format!("{course}-{exercise}");

        let payload = self
            .post("channels.create", json!({ "name": name }))
            .await?
            .unwrap_or_default();
        let rid = payload["channel"]["_id"].clone();

        self.post(
            "teams.addRooms",
            json!({ "teamName": course.to_string(), "rooms": [rid.clone()] }),
        )
        .await?;
        self.post("teams.updateRoom", json!({ "roomId": rid, "isDefault": true }))
            .await?;
        Ok(())
    }

    async fn remove_exercise(
        &self,
        course: &CourseId,
        exercise: &str,
    ) -> Result<(), IntegrationError> {
        let name = format!("{course}-{exercise}");

        if let Some(rid) = self.team_room_id(course, &name).await {
            self.post_lenient("channels.delete", json!({ "roomId": rid })).await?;
        }
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> Result<(), IntegrationError> {
        self.post_lenient("users.delete", json!({ "username": username })).await?;
        Ok(())
    }
}
