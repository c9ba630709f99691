use std::fmt;
use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::CampusArgs;
use crate::auth::DiscoveredClient;
use crate::course::CourseManager;
use crate::integration::{BuildServer, ChatPlatform, GitHost, IdentityProvider};

#[derive(Clone)]
pub struct CampusState {
    pub db_pool: SqlitePool,
    pub courses: CourseManager,
    pub git: Arc<dyn GitHost>,
    pub chat: Arc<dyn ChatPlatform>,
    pub identity: Arc<dyn IdentityProvider>,
    pub build: Arc<BuildServer>,
    pub oidc_client: DiscoveredClient,
    pub config: CampusArgs,
}

impl fmt::Debug for CampusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CampusState")
            .field("db_pool", &self.db_pool)
            .field("courses", &self.courses)
            .finish_non_exhaustive()
    }
}

impl FromRef<CampusState> for SqlitePool {
    fn from_ref(state: &CampusState) -> Self {
        state.db_pool.clone()
    }
}
