use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

/// Closed category set. Unknown values are rejected at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Canteen,
    Hostel,
    Academics,
    Infrastructure,
    Transport,
    Library,
    Sports,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Canteen,
        Category::Hostel,
        Category::Academics,
        Category::Infrastructure,
        Category::Transport,
        Category::Library,
        Category::Sports,
        Category::Other,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Canteen => "Canteen",
            Category::Hostel => "Hostel",
            Category::Academics => "Academics",
            Category::Infrastructure => "Infrastructure",
            Category::Transport => "Transport",
            Category::Library => "Library",
            Category::Sports => "Sports",
            Category::Other => "Other",
        }
    }
}

/// Complaint status. The progression Submitted -> Reviewed -> Resolved is the
/// normal path, but admins may set any value at any time; the history trail
/// records whatever happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Submitted,
    Reviewed,
    Resolved,
}

impl Status {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Submitted" => Some(Status::Submitted),
            "Reviewed" => Some(Status::Reviewed),
            "Resolved" => Some(Status::Resolved),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Submitted => "Submitted",
            Status::Reviewed => "Reviewed",
            Status::Resolved => "Resolved",
        }
    }
}

/// Informational only; never drives behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Priority::Low),
            "Medium" => Some(Priority::Medium),
            "High" => Some(Priority::High),
            "Urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub roll_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry in a complaint's embedded message thread. Stored verbatim as a
/// JSON array element inside the complaint row; entries are never edited or
/// deleted after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: String,
    pub sender: Uuid,
    pub sender_role: Role,
    pub sender_name: String,
    pub created_at: DateTime<Utc>,
}

/// One entry in a complaint's append-only status audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: Status,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Uuid,
    pub changed_by_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_round_trips() {
        for c in Category::ALL {
            assert_eq!(Category::parse(c.as_str()), Some(c));
        }
        assert_eq!(Category::parse("Cafeteria"), None);
    }

    #[test]
    fn role_rejects_unknown() {
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn message_serializes_camel_case() {
        let msg = Message {
            text: "hello".into(),
            sender: Uuid::nil(),
            sender_role: Role::Admin,
            sender_name: "Admin User".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["senderRole"], "admin");
        assert_eq!(json["senderName"], "Admin User");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn status_change_round_trips() {
        let entry = StatusChange {
            status: Status::Reviewed,
            changed_at: Utc::now(),
            changed_by: Uuid::new_v4(),
            changed_by_name: "Dean".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: StatusChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, Status::Reviewed);
        assert_eq!(back.changed_by, entry.changed_by);
    }
}
