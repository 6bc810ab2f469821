use crate::Database;
use crate::models::{ComplaintFilter, ComplaintRow, DateUpdate, NewComplaint, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

impl Database {
    // -- Users --

    /// Returns false when the email is already taken. Uniqueness is enforced
    /// by the store-level constraint, so a concurrent duplicate registration
    /// loses here rather than racing past a read-then-write check.
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        role: &str,
        department: Option<&str>,
        roll_number: Option<&str>,
        password_hash: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO users (id, name, email, role, department, roll_number, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![id, name, email, role, department, roll_number, password_hash, created_at],
            );
            match result {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn count_users_by_role(&self, role: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE role = ?1",
                [role],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Complaints --

    pub fn insert_complaint(&self, c: &NewComplaint<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO complaints
                    (id, title, description, category, status, priority, is_anonymous,
                     user_id, status_history, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                rusqlite::params![
                    c.id,
                    c.title,
                    c.description,
                    c.category,
                    c.status,
                    c.priority,
                    c.is_anonymous,
                    c.user_id,
                    c.status_history,
                    c.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_complaint(&self, id: &str) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMPLAINT_SELECT} WHERE c.id = ?1"))?;
            let row = stmt.query_row([id], map_complaint_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_complaints(
        &self,
        filter: &ComplaintFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let (clause, params) = filter_clause(filter);
            let sql = format!(
                "{COMPLAINT_SELECT} {clause} ORDER BY c.created_at DESC, c.id LIMIT {limit} OFFSET {offset}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), map_complaint_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_complaints(&self, filter: &ComplaintFilter) -> Result<u64> {
        self.with_conn(|conn| {
            let (clause, params) = filter_clause(filter);
            let sql = format!("SELECT COUNT(*) FROM complaints c {clause}");
            let count: u64 =
                conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))?;
            Ok(count)
        })
    }

    /// Applies an admin status/meta update as one atomic row write. A status
    /// change carries its pre-serialized history entry so the audit trail and
    /// the scalar field move together; absent fields are left untouched.
    pub fn update_complaint_meta(
        &self,
        id: &str,
        status: Option<&str>,
        history_entry: Option<&str>,
        admin_response: Option<&str>,
        expected_date: DateUpdate<'_>,
        updated_at: &str,
    ) -> Result<bool> {
        let (date_mode, date_value) = match expected_date {
            DateUpdate::Keep => ("keep", None),
            DateUpdate::Clear => ("clear", None),
            DateUpdate::Set(v) => ("set", Some(v)),
        };
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE complaints SET
                    status = COALESCE(?2, status),
                    status_history = CASE WHEN ?3 IS NULL THEN status_history
                        ELSE json_insert(status_history, '$[#]', json(?3)) END,
                    admin_response = COALESCE(?4, admin_response),
                    expected_resolution_date = CASE ?5
                        WHEN 'keep' THEN expected_resolution_date
                        WHEN 'clear' THEN NULL
                        ELSE ?6 END,
                    updated_at = ?7
                 WHERE id = ?1",
                rusqlite::params![id, status, history_entry, admin_response, date_mode, date_value, updated_at],
            )?;
            Ok(changed > 0)
        })
    }

    /// Atomic array-append on the embedded message thread; existing entries
    /// are never rewritten.
    pub fn append_message(&self, id: &str, message_json: &str, updated_at: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE complaints
                 SET messages = json_insert(messages, '$[#]', json(?2)), updated_at = ?3
                 WHERE id = ?1",
                rusqlite::params![id, message_json, updated_at],
            )?;
            Ok(changed > 0)
        })
    }

    /// Permanent delete; the embedded thread and history go with the row.
    pub fn delete_complaint(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM complaints WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Aggregates --

    pub fn count_by_category(&self) -> Result<Vec<(String, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category, COUNT(*) AS n FROM complaints
                 GROUP BY category ORDER BY n DESC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_by_status(&self) -> Result<Vec<(String, u64)>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM complaints GROUP BY status")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

// JOIN users so the owner identity arrives with the row in a single query.
const COMPLAINT_SELECT: &str = "
    SELECT c.id, c.title, c.description, c.category, c.status, c.priority,
           c.is_anonymous, c.user_id, u.name, u.email, u.department, u.roll_number,
           c.admin_response, c.expected_resolution_date, c.messages,
           c.status_history, c.created_at, c.updated_at
    FROM complaints c
    LEFT JOIN users u ON c.user_id = u.id";

fn map_complaint_row(row: &Row<'_>) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        status: row.get(4)?,
        priority: row.get(5)?,
        is_anonymous: row.get(6)?,
        user_id: row.get(7)?,
        owner_name: row
            .get::<_, Option<String>>(8)?
            .unwrap_or_else(|| "unknown".to_string()),
        owner_email: row
            .get::<_, Option<String>>(9)?
            .unwrap_or_else(|| "unknown".to_string()),
        owner_department: row.get(10)?,
        owner_roll_number: row.get(11)?,
        admin_response: row.get(12)?,
        expected_resolution_date: row.get(13)?,
        messages: row.get(14)?,
        status_history: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn filter_clause(filter: &ComplaintFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if let Some(status) = &filter.status {
        params.push(status.clone());
        conditions.push(format!("c.status = ?{}", params.len()));
    }
    if let Some(category) = &filter.category {
        params.push(category.clone());
        conditions.push(format!("c.category = ?{}", params.len()));
    }
    if let Some(user_id) = &filter.user_id {
        params.push(user_id.clone());
        conditions.push(format!("c.user_id = ?{}", params.len()));
    }

    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), params)
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, email, role, department, roll_number, password, created_at
         FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                role: row.get(3)?,
                department: row.get(4)?,
                roll_number: row.get(5)?,
                password: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user(id: &str, email: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_user(id, "Demo Student", email, "student", Some("CS"), Some("CS2024001"), "hash", "2026-01-01T00:00:00+00:00")
            .unwrap();
        assert!(created);
        db
    }

    fn insert_basic(db: &Database, id: &str, user_id: &str, category: &str, status: &str) {
        db.insert_complaint(&NewComplaint {
            id,
            title: "AC broken",
            description: "Hostel room AC not working",
            category,
            status,
            priority: "Medium",
            is_anonymous: false,
            user_id,
            status_history: r#"[{"status":"Submitted"}]"#,
            created_at: "2026-01-02T00:00:00+00:00",
        })
        .unwrap();
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = db_with_user("u1", "student@demo.com");
        let again = db
            .create_user("u2", "Other", "student@demo.com", "student", None, None, "hash", "2026-01-01T00:00:00+00:00")
            .unwrap();
        assert!(!again);
        assert!(db.get_user_by_id("u2").unwrap().is_none());
    }

    #[test]
    fn complaint_round_trip_carries_owner_identity() {
        let db = db_with_user("u1", "student@demo.com");
        insert_basic(&db, "c1", "u1", "Hostel", "Submitted");

        let row = db.get_complaint("c1").unwrap().unwrap();
        assert_eq!(row.owner_name, "Demo Student");
        assert_eq!(row.owner_email, "student@demo.com");
        assert_eq!(row.status, "Submitted");
        assert_eq!(row.messages, "[]");
        assert_eq!(row.created_at, row.updated_at);
    }

    #[test]
    fn append_message_grows_array_and_touches_updated_at() {
        let db = db_with_user("u1", "student@demo.com");
        insert_basic(&db, "c1", "u1", "Hostel", "Submitted");

        let first = r#"{"text":"any update?"}"#;
        let second = r#"{"text":"looking into it"}"#;
        assert!(db.append_message("c1", first, "2026-01-03T00:00:00+00:00").unwrap());
        assert!(db.append_message("c1", second, "2026-01-04T00:00:00+00:00").unwrap());

        let row = db.get_complaint("c1").unwrap().unwrap();
        let thread: serde_json::Value = serde_json::from_str(&row.messages).unwrap();
        assert_eq!(thread.as_array().unwrap().len(), 2);
        assert_eq!(thread[0]["text"], "any update?");
        assert_eq!(thread[1]["text"], "looking into it");
        assert_eq!(row.updated_at, "2026-01-04T00:00:00+00:00");
    }

    #[test]
    fn append_message_on_missing_complaint_reports_no_rows() {
        let db = db_with_user("u1", "student@demo.com");
        assert!(!db.append_message("nope", r#"{"text":"x"}"#, "2026-01-03T00:00:00+00:00").unwrap());
    }

    #[test]
    fn meta_update_appends_history_only_with_entry() {
        let db = db_with_user("u1", "student@demo.com");
        insert_basic(&db, "c1", "u1", "Hostel", "Submitted");

        // Status change with its audit entry
        db.update_complaint_meta(
            "c1",
            Some("Reviewed"),
            Some(r#"{"status":"Reviewed"}"#),
            None,
            DateUpdate::Keep,
            "2026-01-05T00:00:00+00:00",
        )
        .unwrap();

        // Response-only update, no history entry
        db.update_complaint_meta(
            "c1",
            None,
            None,
            Some("We are on it"),
            DateUpdate::Set("2026-02-01T00:00:00+00:00"),
            "2026-01-06T00:00:00+00:00",
        )
        .unwrap();

        let row = db.get_complaint("c1").unwrap().unwrap();
        assert_eq!(row.status, "Reviewed");
        assert_eq!(row.admin_response.as_deref(), Some("We are on it"));
        assert_eq!(row.expected_resolution_date.as_deref(), Some("2026-02-01T00:00:00+00:00"));
        let history: serde_json::Value = serde_json::from_str(&row.status_history).unwrap();
        assert_eq!(history.as_array().unwrap().len(), 2);

        // Clearing the date leaves everything else alone
        db.update_complaint_meta("c1", None, None, None, DateUpdate::Clear, "2026-01-07T00:00:00+00:00")
            .unwrap();
        let row = db.get_complaint("c1").unwrap().unwrap();
        assert!(row.expected_resolution_date.is_none());
        assert_eq!(row.admin_response.as_deref(), Some("We are on it"));
    }

    #[test]
    fn list_filters_compose_and_order_newest_first() {
        let db = db_with_user("u1", "student@demo.com");
        db.create_user("u2", "Second", "second@demo.com", "student", None, None, "hash", "2026-01-01T00:00:00+00:00")
            .unwrap();
        insert_basic(&db, "c1", "u1", "Hostel", "Submitted");
        db.insert_complaint(&NewComplaint {
            id: "c2",
            title: "Late bus",
            description: "Route 4 always late",
            category: "Transport",
            status: "Resolved",
            priority: "Low",
            is_anonymous: false,
            user_id: "u2",
            status_history: "[]",
            created_at: "2026-01-03T00:00:00+00:00",
        })
        .unwrap();

        let all = db.list_complaints(&ComplaintFilter::default(), 10, 0).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "c2"); // newest first

        let scoped = ComplaintFilter {
            user_id: Some("u1".into()),
            ..Default::default()
        };
        let mine = db.list_complaints(&scoped, 10, 0).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "c1");

        let both = ComplaintFilter {
            status: Some("Resolved".into()),
            category: Some("Transport".into()),
            user_id: None,
        };
        assert_eq!(db.count_complaints(&both).unwrap(), 1);
    }

    #[test]
    fn histograms_group_and_sort() {
        let db = db_with_user("u1", "student@demo.com");
        insert_basic(&db, "c1", "u1", "Hostel", "Submitted");
        insert_basic(&db, "c2", "u1", "Hostel", "Resolved");
        insert_basic(&db, "c3", "u1", "Canteen", "Resolved");

        let by_category = db.count_by_category().unwrap();
        assert_eq!(by_category[0], ("Hostel".to_string(), 2));

        let by_status: std::collections::HashMap<_, _> =
            db.count_by_status().unwrap().into_iter().collect();
        assert_eq!(by_status["Resolved"], 2);
        assert_eq!(by_status["Submitted"], 1);
    }

    #[test]
    fn delete_is_permanent() {
        let db = db_with_user("u1", "student@demo.com");
        insert_basic(&db, "c1", "u1", "Hostel", "Submitted");
        assert!(db.delete_complaint("c1").unwrap());
        assert!(db.get_complaint("c1").unwrap().is_none());
        assert!(!db.delete_complaint("c1").unwrap());
    }
}
