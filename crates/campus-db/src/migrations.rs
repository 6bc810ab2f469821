use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            email         TEXT NOT NULL UNIQUE,
            role          TEXT NOT NULL CHECK (role IN ('student', 'admin')),
            department    TEXT,
            roll_number   TEXT,
            password      TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );

        -- One row per complaint; the message thread and status audit trail
        -- are embedded JSON arrays so an append is a single atomic row
        -- update, mirroring the document layout of the data model.
        CREATE TABLE IF NOT EXISTS complaints (
            id                        TEXT PRIMARY KEY,
            title                     TEXT NOT NULL,
            description               TEXT NOT NULL,
            category                  TEXT NOT NULL,
            status                    TEXT NOT NULL
                CHECK (status IN ('Submitted', 'Reviewed', 'Resolved')),
            priority                  TEXT NOT NULL,
            is_anonymous              INTEGER NOT NULL DEFAULT 0,
            user_id                   TEXT NOT NULL REFERENCES users(id),
            admin_response            TEXT,
            expected_resolution_date  TEXT,
            messages                  TEXT NOT NULL DEFAULT '[]',
            status_history            TEXT NOT NULL DEFAULT '[]',
            created_at                TEXT NOT NULL,
            updated_at                TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_complaints_user
            ON complaints(user_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_complaints_created
            ON complaints(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
