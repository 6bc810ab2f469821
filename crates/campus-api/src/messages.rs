use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use campus_types::api::AddMessageRequest;
use campus_types::models::Message;

use crate::auth::AppState;
use crate::complaints::{fetch_complaint, owner_visible, render};
use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::AuthUser;

/// Append one message to a complaint's thread. Admins may message any
/// complaint; students only their own. The thread is append-only — existing
/// entries are never touched.
pub async fn add_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::Validation("Message text is required".into()));
    }

    let row = fetch_complaint(&state, id).await?;

    if !user.is_admin() && row.user_id != user.id.to_string() {
        return Err(ApiError::Forbidden(
            "Not authorized to message on this complaint".into(),
        ));
    }

    let now = Utc::now();
    let entry = serde_json::to_string(&Message {
        text,
        sender: user.id,
        sender_role: user.role,
        sender_name: user.name.clone(),
        created_at: now,
    })
    .map_err(|e| ApiError::Internal(e.into()))?;

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.db.append_message(&id.to_string(), &entry, &now.to_rfc3339())?;
        db.db.get_complaint(&id.to_string())
    })
    .await
    .map_err(ApiError::join)??
    .ok_or_else(|| ApiError::NotFound("Complaint not found".into()))?;

    let include_owner = owner_visible(&row, &user);
    Ok(Json(render(row, include_owner)))
}
