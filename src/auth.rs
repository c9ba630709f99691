use std::io;
use std::ops::Deref;

use axum::{
    Router,
    extract::{FromRequestParts, Query, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use openidconnect::{
    AuthenticationFlow, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointMaybeSet,
    EndpointNotSet, EndpointSet, IssuerUrl, Nonce, RedirectUrl, Scope, TokenResponse,
    core::{CoreClient, CoreProviderMetadata, CoreResponseType},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::state::CampusState;

pub type DiscoveredClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

/// The logged-in user as stored in the session at callback time. `role` is
/// what the identity server reported then ("admin" marks platform admins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl SessionUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

pub struct AuthUser(pub SessionUser);

impl Deref for AuthUser {
    type Target = SessionUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<CampusState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &CampusState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let user = session
            .get::<SessionUser>("user")
            .await
            .map_err(|_| Redirect::to("/auth/login").into_response())?
            .ok_or_else(|| Redirect::to("/auth/login").into_response())?;

        Ok(Self(user))
    }
}

/// Admin-only endpoints accept either an admin session or the server API
/// key in the `Authorization` header (for scripts and the CLI).
pub struct AdminUser(pub Option<SessionUser>);

impl FromRequestParts<CampusState> for AdminUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &CampusState,
    ) -> Result<Self, Self::Rejection> {
        let key_matches = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == state.config.api_key);
        if key_matches {
            return Ok(Self(None));
        }

        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let user = session
            .get::<SessionUser>("user")
            .await
            .ok()
            .flatten()
            .filter(SessionUser::is_admin)
            .ok_or_else(|| (StatusCode::FORBIDDEN, "unauthorized").into_response())?;

        Ok(Self(Some(user)))
    }
}

pub async fn build_oidc_client(
    issuer_url: String,
    client_id: String,
    client_secret: String,
    public_url: String,
) -> Result<DiscoveredClient, io::Error> {
    let issuer_url = IssuerUrl::new(issuer_url).map_err(io::Error::other)?;

    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(io::Error::other)?;

    let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
        .await
        .map_err(|e| io::Error::other(e.to_string()))?;

    let client = CoreClient::from_provider_metadata(
        provider_metadata,
        ClientId::new(client_id),
        Some(ClientSecret::new(client_secret)),
    )
    .set_redirect_uri(
        RedirectUrl::new(format!("{public_url}/auth/callback")).map_err(io::Error::other)?,
    );

    Ok(client)
}

#[derive(Deserialize)]
struct LoginParams {
    redirect: Option<String>,
}

async fn login(
    State(state): State<CampusState>,
    session: Session,
    Query(params): Query<LoginParams>,
) -> Result<Redirect, StatusCode> {
    if let Some(redirect) = params.redirect {
        session
            .insert("redirect", redirect)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    let (auth_url, csrf_token, nonce) = state
        .oidc_client
        .authorize_url(
            AuthenticationFlow::<CoreResponseType>::AuthorizationCode,
            CsrfToken::new_random,
            Nonce::new_random,
        )
        .add_scope(Scope::new("email".to_owned()))
        .add_scope(Scope::new("profile".to_owned()))
        .url();

    session
        .insert("csrf_token", csrf_token.secret().clone())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    session
        .insert("nonce", nonce.secret().clone())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Redirect::to(auth_url.as_str()))
}

#[derive(Deserialize)]
struct AuthCallbackParams {
    code: String,
    state: String,
}

async fn auth_callback(
    State(state): State<CampusState>,
    session: Session,
    Query(params): Query<AuthCallbackParams>,
) -> Result<Redirect, StatusCode> {
    let stored_csrf: String = session
        .get("csrf_token")
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::BAD_REQUEST)?;

    if stored_csrf != params.state {
        return Err(StatusCode::BAD_REQUEST);
    }

    let stored_nonce: String = session
        .get("nonce")
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::BAD_REQUEST)?;

    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let token_response = state
        .oidc_client
        .exchange_code(AuthorizationCode::new(params.code))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .request_async(&http_client)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let id_token = token_response
        .id_token()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let claims = id_token
        .claims(
            &state.oidc_client.id_token_verifier(),
            &Nonce::new(stored_nonce),
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // the identity server issues usernames as subjects
    let username = claims.subject().to_string();

    let email = claims
        .email()
        .map(|e| e.as_str().to_owned())
        .unwrap_or_default();

    let name = claims
        .name()
        .and_then(|n| n.get(None))
        .map(|n| n.as_str().to_owned())
        .unwrap_or_default();

    let role = state
        .identity
        .get_user_info(&username)
        .await
        .map(|info| info.role)
        .unwrap_or_else(|| "user".to_owned());

    let user = SessionUser {
        username,
        name,
        email,
        role,
    };

    // admins get flagged on the git host the first time they log in here
    if user.is_admin()
        && let Err(err) = state.git.make_admin(&user.username, &user.name).await
    {
        tracing::warn!(error = %err, username = %user.username, "could not flag git admin");
    }

    session
        .insert("user", user)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let target: Option<String> = session
        .remove("redirect")
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Redirect::to(target.as_deref().unwrap_or("/")))
}

async fn logout(
    State(state): State<CampusState>,
    session: Session,
) -> Result<Redirect, StatusCode> {
    session
        .flush()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Redirect::to(&format!(
        "{}/auth/logout?redirect={}",
        state.config.auth_url, state.config.public_url
    )))
}

pub fn auth_router() -> Router<CampusState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/logout", get(logout))
}
