/// Database row types — these map directly to SQLite rows. Distinct from the
/// campus-types API models to keep the DB layer independent; the embedded
/// `messages` and `status_history` arrays travel as raw JSON text and are
/// interpreted at the API layer.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: Option<String>,
    pub roll_number: Option<String>,
    pub password: String,
    pub created_at: String,
}

pub struct ComplaintRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub priority: String,
    pub is_anonymous: bool,
    pub user_id: String,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_department: Option<String>,
    pub owner_roll_number: Option<String>,
    pub admin_response: Option<String>,
    pub expected_resolution_date: Option<String>,
    pub messages: String,
    pub status_history: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewComplaint<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub status: &'a str,
    pub priority: &'a str,
    pub is_anonymous: bool,
    pub user_id: &'a str,
    pub status_history: &'a str,
    pub created_at: &'a str,
}

/// Filters for listing/counting complaints. `user_id` is the ownership scope
/// applied to non-admin callers.
#[derive(Default)]
pub struct ComplaintFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub user_id: Option<String>,
}

/// Tri-state update for the expected resolution date: leave it alone, clear
/// it, or set it.
pub enum DateUpdate<'a> {
    Keep,
    Clear,
    Set(&'a str),
}
