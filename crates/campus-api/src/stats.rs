use axum::{Json, extract::State, response::IntoResponse};
use campus_db::models::ComplaintFilter;
use campus_types::api::{CategoryCount, DisplayStats, StatsResponse, StatusCount};
use campus_types::models::{Role, Status};

use crate::auth::AppState;
use crate::error::ApiError;

// Placeholder figures shown on the landing page before any real data exists.
const DEMO_TOTAL: u64 = 1250;
const DEMO_RESOLVED: u64 = 1180;
const DEMO_STUDENTS: u64 = 850;
const DEMO_SATISFACTION: u64 = 98;

/// Public dashboard rollups. Purely derived and recomputed per call; nothing
/// here needs to be consistent with in-flight writes.
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let (total, resolved, students, by_category, by_status) =
        tokio::task::spawn_blocking(move || {
            let total = db.db.count_complaints(&ComplaintFilter::default())?;
            let resolved = db.db.count_complaints(&ComplaintFilter {
                status: Some(Status::Resolved.as_str().to_string()),
                ..Default::default()
            })?;
            let students = db.db.count_users_by_role(Role::Student.as_str())?;
            let by_category = db.db.count_by_category()?;
            let by_status = db.db.count_by_status()?;
            Ok::<_, anyhow::Error>((total, resolved, students, by_category, by_status))
        })
        .await
        .map_err(ApiError::join)??;

    let satisfaction_rate = if total > 0 {
        ((resolved as f64 / total as f64) * 100.0).round() as u64
    } else {
        DEMO_SATISFACTION
    };

    let display_resolved = if resolved == 0 { DEMO_RESOLVED } else { resolved };
    let display_students = if students == 0 { DEMO_STUDENTS } else { students };

    Ok(Json(StatsResponse {
        total_complaints: if total == 0 { DEMO_TOTAL } else { total },
        resolved_complaints: display_resolved,
        total_students: display_students,
        satisfaction_rate,
        category_stats: by_category
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect(),
        status_stats: by_status
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
        display_stats: DisplayStats {
            issues_resolved: format!("{}+", group_thousands(display_resolved)),
            satisfaction: format!("{satisfaction_rate}%"),
            active_students: format!("{}+", group_thousands(display_students)),
            avg_response_time: "24hrs".to_string(),
        },
    }))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(850), "850");
        assert_eq!(group_thousands(1180), "1,180");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
