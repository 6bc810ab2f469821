use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Serialize;
use uuid::Uuid;

use campus_types::api::Claims;
use campus_types::models::Role;

use crate::auth::AppState;
use crate::error::ApiError;

/// The resolved caller, inserted into request extensions by `require_auth`.
/// Handlers take this via `Extension<AuthUser>`; admin-only operations take
/// the `AdminUser` extractor instead.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub roll_number: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn token_failed() -> ApiError {
    ApiError::Unauthenticated("Not authorized, token failed".into())
}

/// Extract and validate the bearer JWT, then resolve it to a live user row.
/// Missing, malformed, or expired credentials fail closed with 401, as does
/// a token whose subject no longer exists.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(token_failed)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(token_failed)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| token_failed())?;

    let user_id = token_data.claims.sub;
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&user_id.to_string()))
        .await
        .map_err(ApiError::join)??
        .ok_or_else(token_failed)?;

    let role = Role::parse(&row.role).ok_or_else(token_failed)?;
    let id: Uuid = row.id.parse().map_err(|_| token_failed())?;

    req.extensions_mut().insert(AuthUser {
        id,
        name: row.name,
        email: row.email,
        role,
        department: row.department,
        roll_number: row.roll_number,
    });
    Ok(next.run(req).await)
}

/// Declarative admin capability: routes that require admin take this
/// extractor, which rejects non-admin callers before the handler body runs.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(token_failed)?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
