/*!
 * # Authentication and Authorization Module
 *
 * Sign-in itself belongs to the identity provider; this module only verifies
 * the HS256 bearer tokens it issues and turns them into a [`Subject`].
 *
 * - [`authenticate`] runs on every API request. No token means a guest; a
 *   bad token is rejected with 401. A valid token for a user without a
 *   profile provisions a client profile on first use.
 * - [`require_access`] evaluates the route's [`AccessRule`] against the
 *   policy table in [`rbac`].
 */

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{sea_query::OnConflict, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ErrorResponse;
use crate::models::profile::{self, UserType};

mod rbac;

pub use rbac::{authorize, role_allows, AccessRule, Action, Resource, Role};

/// Claims of an identity-provider access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    pub iss: String,
    pub aud: String,
}

/// The caller as seen by the access policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub role: Role,
}

impl Subject {
    pub fn guest() -> Self {
        Self {
            user_id: None,
            email: None,
            role: Role::Guest,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Token verification settings
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, issuer: String, audience: String) -> Self {
        Self {
            jwt_secret,
            issuer,
            audience,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.auth_issuer.clone(),
            config.auth_audience.clone(),
        )
    }
}

/// Verifies bearer tokens and resolves them to subjects
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Signs a token the way the identity provider does; used by local tooling and tests.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        email: Option<String>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email,
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(&[self.config.audience.as_str()]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }

    /// Maps verified claims to a subject, provisioning a client profile on first sight.
    pub async fn resolve_subject(&self, claims: &Claims) -> Result<Subject, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let profile = match self.find_profile(user_id).await? {
            Some(profile) => profile,
            None => self.provision_profile(user_id, claims.email.clone()).await?,
        };

        Ok(Subject {
            user_id: Some(user_id),
            email: claims.email.clone().or(Some(profile.email)),
            role: Role::from(profile.user_type),
        })
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<profile::Model>, AuthError> {
        profile::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }

    async fn provision_profile(
        &self,
        user_id: Uuid,
        email: Option<String>,
    ) -> Result<profile::Model, AuthError> {
        let now = Utc::now();
        let model = profile::ActiveModel {
            id: Set(user_id),
            email: Set(email.unwrap_or_default()),
            full_name: Set(None),
            phone: Set(None),
            company_name: Set(None),
            address: Set(None),
            city: Set(None),
            state: Set(None),
            postal_code: Set(None),
            country: Set(None),
            user_type: Set(UserType::Client),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // A concurrent first request may have inserted the row already.
        profile::Entity::insert(model)
            .on_conflict(
                OnConflict::column(profile::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        info!(%user_id, "provisioned client profile");

        self.find_profile(user_id)
            .await?
            .ok_or_else(|| AuthError::InternalError("profile missing after provisioning".into()))
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Token could not be created".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::DatabaseError(msg) => {
                error!(error = %msg, "auth lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_DATABASE_ERROR",
                    "Authentication lookup failed".to_string(),
                )
            }
            Self::InternalError(msg) => {
                error!(error = %msg, "auth internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_INTERNAL_ERROR",
                    "Internal authentication error".to_string(),
                )
            }
        };

        ErrorResponse::new(status, error_message, Some(error_code.to_string()))
            .into_response_with(status)
    }
}

/// Bearer token from the Authorization header, if any
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or(AuthError::InvalidToken)
}

/// Resolves the caller and stores the [`Subject`] in request extensions.
pub async fn authenticate(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let subject = match bearer_token(request.headers())? {
        None => Subject::guest(),
        Some(token) => {
            let claims = auth.validate_token(token)?;
            auth.resolve_subject(&claims).await?
        }
    };

    debug!(role = %subject.role, user_id = ?subject.user_id, "request authenticated");
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

/// Rejects the request unless the subject's role grants `rule`.
pub async fn require_access(
    State(rule): State<AccessRule>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let subject = request
        .extensions()
        .get::<Subject>()
        .cloned()
        .unwrap_or_else(Subject::guest);

    authorize(&subject, rule)?;
    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    /// Guards every route registered so far with `{resource, action}`
    fn require(self, resource: Resource, action: Action) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn require(self, resource: Resource, action: Action) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(
            AccessRule::new(resource, action),
            require_access,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test_secret_key_that_is_long_enough_for_hs256_signing_in_unit_tests_0123";

    async fn service() -> (AuthService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("auth.sqlite").display());
        let db = sea_orm::Database::connect(&url).await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        let config = AuthConfig::new(SECRET.into(), "cargolink-auth".into(), "authenticated".into());
        (AuthService::new(config, Arc::new(db)), dir)
    }

    #[tokio::test]
    async fn issued_token_validates() {
        let (auth, _dir) = service().await;
        let user_id = Uuid::new_v4();
        let token = auth
            .issue_token(user_id, Some("a@example.com".into()), Duration::minutes(5))
            .unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (auth, _dir) = service().await;
        let token = auth
            .issue_token(Uuid::new_v4(), None, Duration::minutes(-10))
            .unwrap();
        assert!(matches!(
            auth.validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn token_for_another_audience_is_rejected() {
        let (auth, _dir) = service().await;
        let other = AuthService::new(
            AuthConfig::new(SECRET.into(), "cargolink-auth".into(), "service_role".into()),
            auth.db.clone(),
        );
        let token = other
            .issue_token(Uuid::new_v4(), None, Duration::minutes(5))
            .unwrap();
        assert!(matches!(
            auth.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn first_request_provisions_a_client_profile() {
        let (auth, _dir) = service().await;
        let user_id = Uuid::new_v4();
        let token = auth
            .issue_token(user_id, Some("new@example.com".into()), Duration::minutes(5))
            .unwrap();
        let claims = auth.validate_token(&token).unwrap();

        let subject = auth.resolve_subject(&claims).await.unwrap();
        assert_eq!(subject.role, Role::Client);
        assert_eq!(subject.user_id, Some(user_id));

        // Resolving again reuses the stored profile.
        let again = auth.resolve_subject(&claims).await.unwrap();
        assert_eq!(again, subject);
    }

    #[tokio::test]
    async fn auth_failures_use_the_error_envelope() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-auth"), async {
                AuthError::InsufficientPermissions.into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.error, "Forbidden");
        assert_eq!(payload.details.as_deref(), Some("AUTH_INSUFFICIENT_PERMISSIONS"));
        assert_eq!(payload.request_id.as_deref(), Some("req-auth"));
        assert!(!payload.timestamp.is_empty());
    }

    #[test]
    fn malformed_authorization_header_is_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidToken)));

        let empty = HeaderMap::new();
        assert!(matches!(bearer_token(&empty), Ok(None)));
    }
}
