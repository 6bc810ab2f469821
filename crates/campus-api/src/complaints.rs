use axum::{
    Extension,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use campus_db::models::{ComplaintFilter, ComplaintRow, DateUpdate, NewComplaint};
use campus_types::api::{
    ComplaintListResponse, ComplaintView, CreateComplaintRequest, OwnerSummary,
    UpdateComplaintRequest,
};
use campus_types::models::{Category, Message, Priority, Status, StatusChange};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::{AdminUser, AuthUser};

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateComplaintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    let description = req.description.trim().to_string();

    if title.is_empty() {
        return Err(ApiError::Validation("Title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::Validation(
            "Title must be at most 200 characters".into(),
        ));
    }
    if description.is_empty() {
        return Err(ApiError::Validation("Description is required".into()));
    }
    let category = Category::parse(&req.category)
        .ok_or_else(|| ApiError::Validation("Invalid category".into()))?;
    let priority = match req.priority.as_deref() {
        None => Priority::Medium,
        Some(p) => {
            Priority::parse(p).ok_or_else(|| ApiError::Validation("Invalid priority".into()))?
        }
    };
    let is_anonymous = req.is_anonymous.unwrap_or(false);

    let id = Uuid::new_v4();
    let now = Utc::now();
    // Every complaint starts its audit trail with the Submitted entry
    // authored by the creator.
    let initial_history = serde_json::to_string(&[StatusChange {
        status: Status::Submitted,
        changed_at: now,
        changed_by: user.id,
        changed_by_name: user.name.clone(),
    }])
    .map_err(|e| ApiError::Internal(e.into()))?;

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.db.insert_complaint(&NewComplaint {
            id: &id.to_string(),
            title: &title,
            description: &description,
            category: category.as_str(),
            status: Status::Submitted.as_str(),
            priority: priority.as_str(),
            is_anonymous,
            user_id: &user.id.to_string(),
            status_history: &initial_history,
            created_at: &now.to_rfc3339(),
        })?;
        db.db.get_complaint(&id.to_string())
    })
    .await
    .map_err(ApiError::join)??
    .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("complaint vanished after insert")))?;

    // The create response is shaped relative to the complaint's own
    // anonymity flag, matching the historical behavior.
    let view = render(row, !is_anonymous);
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(
            Status::parse(s)
                .ok_or_else(|| ApiError::Validation("Invalid status filter".into()))?,
        ),
    };
    let category = match query.category.as_deref() {
        None | Some("") => None,
        Some(c) => Some(
            Category::parse(c)
                .ok_or_else(|| ApiError::Validation("Invalid category filter".into()))?,
        ),
    };

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let filter = ComplaintFilter {
        status: status.map(|s| s.as_str().to_string()),
        category: category.map(|c| c.as_str().to_string()),
        // Non-admin callers only ever see their own complaints, whatever
        // filters they supplied.
        user_id: (!user.is_admin()).then(|| user.id.to_string()),
    };

    let db = state.clone();
    let (rows, total) = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_complaints(&filter, limit, (page - 1) * limit)?;
        let total = db.db.count_complaints(&filter)?;
        Ok::<_, anyhow::Error>((rows, total))
    })
    .await
    .map_err(ApiError::join)??;

    let complaints = rows
        .into_iter()
        .map(|row| {
            let include_owner = owner_visible(&row, &user);
            render(row, include_owner)
        })
        .collect();

    Ok(Json(ComplaintListResponse {
        complaints,
        total,
        total_pages: total.div_ceil(limit),
        current_page: page,
    }))
}

pub async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = fetch_complaint(&state, id).await?;

    if !user.is_admin() && row.user_id != user.id.to_string() {
        return Err(ApiError::Forbidden(
            "Not authorized to view this complaint".into(),
        ));
    }

    let include_owner = owner_visible(&row, &user);
    Ok(Json(render(row, include_owner)))
}

/// Admin-only status/meta update. Setting the current status again is a
/// no-op for the audit trail; any status in the closed set is accepted at
/// any time — transitions are deliberately not forced forward.
pub async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateComplaintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_status = match req.status.as_deref() {
        None => None,
        Some(s) => {
            Some(Status::parse(s).ok_or_else(|| ApiError::Validation("Invalid status".into()))?)
        }
    };

    let current = fetch_complaint(&state, id).await?;

    let now = Utc::now();
    let (status_value, history_entry) = match new_status {
        Some(s) if s.as_str() != current.status => {
            let entry = serde_json::to_string(&StatusChange {
                status: s,
                changed_at: now,
                changed_by: admin.id,
                changed_by_name: admin.name.clone(),
            })
            .map_err(|e| ApiError::Internal(e.into()))?;
            (Some(s.as_str().to_string()), Some(entry))
        }
        _ => (None, None),
    };

    let admin_response = req
        .admin_response
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let date_value = match req.expected_resolution_date {
        Some(Some(dt)) => Some(dt.to_rfc3339()),
        _ => None,
    };

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        let expected_date = match (&req.expected_resolution_date, &date_value) {
            (None, _) => DateUpdate::Keep,
            (Some(None), _) => DateUpdate::Clear,
            (Some(Some(_)), Some(v)) => DateUpdate::Set(v.as_str()),
            (Some(Some(_)), None) => DateUpdate::Keep,
        };
        db.db.update_complaint_meta(
            &id.to_string(),
            status_value.as_deref(),
            history_entry.as_deref(),
            admin_response.as_deref(),
            expected_date,
            &now.to_rfc3339(),
        )?;
        db.db.get_complaint(&id.to_string())
    })
    .await
    .map_err(ApiError::join)??
    .ok_or_else(|| ApiError::NotFound("Complaint not found".into()))?;

    // Admins always see the full identity.
    Ok(Json(render(row, true)))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = fetch_complaint(&state, id).await?;

    if !user.is_admin() && row.user_id != user.id.to_string() {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this complaint".into(),
        ));
    }

    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.delete_complaint(&id.to_string()))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(json!({ "message": "Complaint deleted successfully" })))
}

pub(crate) async fn fetch_complaint(state: &AppState, id: Uuid) -> Result<ComplaintRow, ApiError> {
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.get_complaint(&id.to_string()))
        .await
        .map_err(ApiError::join)??
        .ok_or_else(|| ApiError::NotFound("Complaint not found".into()))
}

/// The visibility rule: the owner identity is rendered unless the complaint
/// is anonymous AND the viewer is neither an admin nor the owner. The stored
/// owner reference is untouched either way.
pub(crate) fn owner_visible(row: &ComplaintRow, viewer: &AuthUser) -> bool {
    !(row.is_anonymous && !viewer.is_admin() && row.user_id != viewer.id.to_string())
}

/// Shape a stored row into the outward-facing complaint. `include_owner`
/// false swaps the owner block for the generic Anonymous marker.
pub(crate) fn render(row: ComplaintRow, include_owner: bool) -> ComplaintView {
    let messages: Vec<Message> = parse_embedded(&row.messages, &row.id, "messages");
    let status_history: Vec<StatusChange> =
        parse_embedded(&row.status_history, &row.id, "status_history");

    let (user, submitted_by) = if include_owner {
        let owner = OwnerSummary {
            id: parse_uuid(&row.user_id, &row.id, "user_id"),
            name: row.owner_name,
            email: row.owner_email,
            department: row.owner_department,
            roll_number: row.owner_roll_number,
        };
        (Some(owner), None)
    } else {
        (None, Some("Anonymous".to_string()))
    };

    ComplaintView {
        id: parse_uuid(&row.id, &row.id, "id"),
        title: row.title,
        description: row.description,
        category: Category::parse(&row.category).unwrap_or_else(|| {
            warn!("Corrupt category '{}' on complaint '{}'", row.category, row.id);
            Category::Other
        }),
        status: Status::parse(&row.status).unwrap_or_else(|| {
            warn!("Corrupt status '{}' on complaint '{}'", row.status, row.id);
            Status::Submitted
        }),
        priority: Priority::parse(&row.priority).unwrap_or_else(|| {
            warn!("Corrupt priority '{}' on complaint '{}'", row.priority, row.id);
            Priority::Medium
        }),
        is_anonymous: row.is_anonymous,
        user,
        submitted_by,
        admin_response: row.admin_response,
        expected_resolution_date: row
            .expected_resolution_date
            .as_deref()
            .map(|s| parse_timestamp(s, &row.id)),
        messages,
        status_history,
        created_at: parse_timestamp(&row.created_at, &row.id),
        updated_at: parse_timestamp(&row.updated_at, &row.id),
    }
}

fn parse_embedded<T: serde::de::DeserializeOwned>(raw: &str, id: &str, field: &str) -> Vec<T> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt {} on complaint '{}': {}", field, id, e);
        Vec::new()
    })
}

fn parse_uuid(raw: &str, id: &str, field: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on complaint '{}': {}", field, raw, id, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str, id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on complaint '{}': {}", raw, id, e);
        DateTime::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_types::models::Role;

    fn student(id: Uuid) -> AuthUser {
        AuthUser {
            id,
            name: "Student".into(),
            email: "s@demo.com".into(),
            role: Role::Student,
            department: None,
            roll_number: None,
        }
    }

    fn admin() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            name: "Admin".into(),
            email: "a@demo.com".into(),
            role: Role::Admin,
            department: None,
            roll_number: None,
        }
    }

    fn anonymous_row(owner: Uuid) -> ComplaintRow {
        ComplaintRow {
            id: Uuid::new_v4().to_string(),
            title: "AC broken".into(),
            description: "Hostel room AC not working".into(),
            category: "Hostel".into(),
            status: "Submitted".into(),
            priority: "Medium".into(),
            is_anonymous: true,
            user_id: owner.to_string(),
            owner_name: "Demo Student".into(),
            owner_email: "student@demo.com".into(),
            owner_department: Some("CS".into()),
            owner_roll_number: Some("CS2024001".into()),
            admin_response: None,
            expected_resolution_date: None,
            messages: "[]".into(),
            status_history: "[]".into(),
            created_at: "2026-01-01T00:00:00+00:00".into(),
            updated_at: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn anonymous_complaint_hidden_from_unrelated_student() {
        let owner = Uuid::new_v4();
        let row = anonymous_row(owner);
        assert!(!owner_visible(&row, &student(Uuid::new_v4())));

        let view = render(row, false);
        assert!(view.user.is_none());
        assert_eq!(view.submitted_by.as_deref(), Some("Anonymous"));
    }

    #[test]
    fn anonymous_complaint_visible_to_owner_and_admin() {
        let owner = Uuid::new_v4();
        assert!(owner_visible(&anonymous_row(owner), &student(owner)));
        assert!(owner_visible(&anonymous_row(owner), &admin()));

        let view = render(anonymous_row(owner), true);
        let shaped = view.user.expect("owner block present");
        assert_eq!(shaped.name, "Demo Student");
        assert_eq!(shaped.email, "student@demo.com");
        assert!(view.submitted_by.is_none());
    }

    #[test]
    fn non_anonymous_complaint_always_shows_owner() {
        let owner = Uuid::new_v4();
        let mut row = anonymous_row(owner);
        row.is_anonymous = false;
        assert!(owner_visible(&row, &student(Uuid::new_v4())));
    }

    #[test]
    fn render_parses_embedded_thread() {
        let owner = Uuid::new_v4();
        let mut row = anonymous_row(owner);
        row.messages = format!(
            r#"[{{"text":"any update?","sender":"{owner}","senderRole":"student","senderName":"Demo Student","createdAt":"2026-01-02T00:00:00Z"}}]"#
        );
        let view = render(row, true);
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].text, "any update?");
    }
}
