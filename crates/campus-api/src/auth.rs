use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use campus_db::Database;
use campus_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use campus_types::models::Role;

use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::AuthUser;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".into()));
    }
    if req.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }

    // Role is fixed at registration; there is no role-change endpoint.
    let role = match req.role.as_deref() {
        None => Role::Student,
        Some(r) => Role::parse(r).ok_or_else(|| ApiError::Validation("Invalid role".into()))?,
    };

    let user_id = Uuid::new_v4();
    let password = req.password.clone();
    let department = req.department.clone();
    let roll_number = req.roll_number.clone();

    let db = state.clone();
    let created_email = email.clone();
    let created_name = name.clone();
    let created = tokio::task::spawn_blocking(move || {
        if db.db.get_user_by_email(&created_email)?.is_some() {
            return Ok(false);
        }
        let hash = hash_password(&password)?;
        db.db.create_user(
            &user_id.to_string(),
            &created_name,
            &created_email,
            role.as_str(),
            department.as_deref(),
            roll_number.as_deref(),
            &hash,
            &chrono::Utc::now().to_rfc3339(),
        )
    })
    .await
    .map_err(ApiError::join)??;

    if !created {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    info!("registered {} as {}", email, role.as_str());

    let token = create_token(&state.jwt_secret, user_id)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            id: user_id,
            name,
            email,
            role,
            department: req.department,
            roll_number: req.roll_number,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();

    let db = state.clone();
    let lookup = email.clone();
    let user = tokio::task::spawn_blocking(move || {
        let Some(row) = db.db.get_user_by_email(&lookup)? else {
            return Ok::<_, anyhow::Error>(None);
        };
        let parsed = PasswordHash::new(&row.password)
            .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {e}"))?;
        if Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed)
            .is_err()
        {
            return Ok(None);
        }
        Ok(Some(row))
    })
    .await
    .map_err(ApiError::join)??
    // Same message for unknown email and wrong password.
    .ok_or_else(|| ApiError::Unauthenticated("Invalid email or password".into()))?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {e}", user.id))?;
    let role = Role::parse(&user.role)
        .ok_or_else(|| anyhow::anyhow!("corrupt role '{}' on user {}", user.role, user.id))?;

    let token = create_token(&state.jwt_secret, user_id)?;
    Ok(Json(AuthResponse {
        id: user_id,
        name: user.name,
        email: user.email,
        role,
        department: user.department,
        roll_number: user.roll_number,
        token,
    }))
}

pub async fn me(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    Json(user)
}

/// Idempotent demo-account creation: one student, one admin. Safe to call
/// repeatedly; existing accounts are left untouched.
pub async fn seed(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    tokio::task::spawn_blocking(move || {
        seed_account(
            &db.db,
            "Demo Student",
            "student@demo.com",
            "demo123",
            Role::Student,
            Some("Computer Science"),
            Some("CS2024001"),
        )?;
        seed_account(
            &db.db,
            "Admin User",
            "admin@demo.com",
            "admin123",
            Role::Admin,
            Some("Administration"),
            None,
        )
    })
    .await
    .map_err(ApiError::join)??;

    Ok(Json(json!({ "message": "Demo accounts created successfully" })))
}

fn seed_account(
    db: &Database,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    department: Option<&str>,
    roll_number: Option<&str>,
) -> anyhow::Result<()> {
    if db.get_user_by_email(email)?.is_some() {
        return Ok(());
    }
    let hash = hash_password(password)?;
    db.create_user(
        &Uuid::new_v4().to_string(),
        name,
        email,
        role.as_str(),
        department,
        roll_number,
        &hash,
        &chrono::Utc::now().to_rfc3339(),
    )?;
    info!("seeded demo account {}", email);
    Ok(())
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();
    Ok(hash)
}

pub fn create_token(secret: &str, user_id: Uuid) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("token encoding failed: {e}")))?;

    Ok(token)
}
