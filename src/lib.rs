#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unwrap_used,
    unsafe_code
)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions
)]

use std::io;
use std::sync::Arc;

use axum::{Router, response::Redirect, routing::get};
use sqlx::SqlitePool;
use tower_sessions::{Expiry, SessionManagerLayer, cookie::time::Duration};
use tower_sessions_sqlx_store::SqliteStore;

use crate::course::CourseManager;
use crate::integration::{
    AuthServer, BuildServer, ChatPlatform, GitHost, Gitea, IdentityProvider, RocketChat,
};
use crate::state::CampusState;

pub use args::CampusArgs;

pub mod auth;
pub mod course;
pub mod integration;
pub mod models;
pub mod state;

mod args;
mod routes;

pub async fn server(args: CampusArgs) -> Result<Router, io::Error> {
    let db_pool = SqlitePool::connect(&args.database)
        .await
        .map_err(io::Error::other)?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(io::Error::other)?;

    let oidc_client = auth::build_oidc_client(
        args.issuer_url.clone(),
        args.client_id.clone(),
        args.client_secret.clone(),
        args.public_url.clone(),
    )
    .await?;

    let session_store = SqliteStore::new(db_pool.clone());
    session_store.migrate().await.map_err(io::Error::other)?;
    let session_layer = SessionManagerLayer::new(session_store)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::days(7)));

    // the external clients exist exactly once and are handed to whoever
    // needs them
    let git: Arc<dyn GitHost> = Arc::new(Gitea::new(
        args.git_url.clone(),
        args.git_username.clone(),
        args.git_password.clone(),
    ));
    let chat: Arc<dyn ChatPlatform> = Arc::new(RocketChat::new(
        args.chat_url.clone(),
        args.chat_user_id.clone(),
        args.chat_token.clone(),
    ));
    let identity: Arc<dyn IdentityProvider> = Arc::new(AuthServer::new(
        args.auth_url.clone(),
        args.auth_api_key.clone(),
    ));
    let build = Arc::new(BuildServer::new(
        args.build_url.clone(),
        args.build_api_key.clone(),
    ));

    let courses = CourseManager::new(
        db_pool.clone(),
        Arc::clone(&git),
        Arc::clone(&chat),
        Arc::clone(&identity),
    );

    let state = CampusState {
        db_pool,
        courses,
        git,
        chat,
        identity,
        build,
        oidc_client,
        config: args,
    };

    let router = Router::new()
        .route("/", get(index))
        .merge(auth::auth_router())
        .merge(routes::courses::router())
        .merge(routes::api::router())
        .merge(routes::admin_courses::router())
        .merge(routes::admin_students::router())
        .merge(routes::admin_tutors::router())
        .merge(routes::admin_exercises::router())
        .merge(routes::hooks::router())
        .layer(session_layer)
        .with_state(state);

    Ok(router)
}

async fn index() -> Redirect {
    Redirect::to("/courses/list")
}
