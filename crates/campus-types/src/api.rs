use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{Category, Message, Priority, Role, Status, StatusChange};

// -- JWT Claims --

/// Canonical JWT claims shared by token issuance (auth handlers) and
/// verification (middleware).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub roll_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub roll_number: Option<String>,
    pub token: String,
}

// -- Complaints --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Option<String>,
    pub is_anonymous: Option<bool>,
}

/// Admin update payload. `expected_resolution_date` is tri-state: an absent
/// key leaves the stored value untouched, an explicit `null` clears it, and
/// a value sets it. The double `Option` distinguishes absent from null.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComplaintRequest {
    pub status: Option<String>,
    pub admin_response: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub expected_resolution_date: Option<Option<DateTime<Utc>>>,
}

fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    pub text: String,
}

/// Owner identity as embedded in complaint responses. Omitted entirely when
/// the visibility rule anonymizes the complaint for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub roll_number: Option<String>,
}

/// Outward-facing complaint shape. The stored row always carries the owner;
/// this view is what the visibility rule acts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: Status,
    pub priority: Priority,
    pub is_anonymous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<OwnerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_resolution_date: Option<DateTime<Utc>>,
    pub messages: Vec<Message>,
    pub status_history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintListResponse {
    pub complaints: Vec<ComplaintView>,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

// -- Stats --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayStats {
    pub issues_resolved: String,
    pub satisfaction: String,
    pub active_students: String,
    pub avg_response_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_complaints: u64,
    pub resolved_complaints: u64,
    pub total_students: u64,
    pub satisfaction_rate: u64,
    pub category_stats: Vec<CategoryCount>,
    pub status_stats: Vec<StatusCount>,
    pub display_stats: DisplayStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_absent_from_null() {
        let absent: UpdateComplaintRequest = serde_json::from_str(r#"{"status":"Reviewed"}"#).unwrap();
        assert!(absent.expected_resolution_date.is_none());

        let null: UpdateComplaintRequest =
            serde_json::from_str(r#"{"expectedResolutionDate":null}"#).unwrap();
        assert_eq!(null.expected_resolution_date, Some(None));

        let set: UpdateComplaintRequest =
            serde_json::from_str(r#"{"expectedResolutionDate":"2026-09-15T00:00:00Z"}"#).unwrap();
        assert!(matches!(set.expected_resolution_date, Some(Some(_))));
    }

    #[test]
    fn create_request_accepts_camel_case_flags() {
        let req: CreateComplaintRequest = serde_json::from_str(
            r#"{"title":"AC broken","description":"Hostel room AC not working","category":"Hostel","isAnonymous":true}"#,
        )
        .unwrap();
        assert_eq!(req.is_anonymous, Some(true));
        assert!(req.priority.is_none());
    }

    #[test]
    fn create_request_ignores_unknown_keys() {
        let req: CreateComplaintRequest = serde_json::from_str(
            r#"{"title":"t","description":"d","category":"Hostel","attachments":[]}"#,
        )
        .unwrap();
        assert_eq!(req.title, "t");
    }

    #[test]
    fn anonymized_view_omits_owner_key() {
        let view = ComplaintView {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: "d".into(),
            category: Category::Hostel,
            status: Status::Submitted,
            priority: Priority::Medium,
            is_anonymous: true,
            user: None,
            submitted_by: Some("Anonymous".into()),
            admin_response: None,
            expected_resolution_date: None,
            messages: vec![],
            status_history: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("user").is_none());
        assert_eq!(json["submittedBy"], "Anonymous");
    }
}
