use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Profile data the identity server holds for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub matriculation_number: Option<i64>,
    pub role: String,
}

impl UserInfo {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Read-only lookups against the identity server. Lookup failures of any
/// kind degrade to `None`; the server is authoritative but not critical.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user_info(&self, username: &str) -> Option<UserInfo>;

    async fn get_users(&self) -> Option<HashMap<String, UserInfo>>;

    async fn get_admins(&self) -> Option<HashMap<String, UserInfo>>;

    async fn is_admin(&self, username: &str) -> bool {
        self.get_user_info(username)
            .await
            .is_some_and(|user| user.is_admin())
    }
}

pub struct AuthServer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AuthServer {
    #[must_use]
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        response.json().await.ok()
    }
}

#[async_trait]
impl IdentityProvider for AuthServer {
    async fn get_user_info(&self, username: &str) -> Option<UserInfo> {
        self.get_json(&format!("/api/user/{username}")).await
    }

    async fn get_users(&self) -> Option<HashMap<String, UserInfo>> {
        self.get_json("/api/users").await
    }

    async fn get_admins(&self) -> Option<HashMap<String, UserInfo>> {
        self.get_json("/api/admins").await
    }
}
