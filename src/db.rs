// 🗄️ Submission ledger - local SQLite store for finalized evaluations

use crate::profiles::canonical_id;
use crate::submission::Submission;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashSet;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // One row per finalize action; payload is the submission JSON
    conn.execute(
        "CREATE TABLE IF NOT EXISTS submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            submission_uuid TEXT UNIQUE NOT NULL,
            profile_id TEXT NOT NULL,
            profile_name TEXT NOT NULL,
            category TEXT NOT NULL,
            unit_type TEXT NOT NULL,
            answer_count INTEGER NOT NULL,
            payload TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_profile ON submissions(profile_id)",
        [],
    )?;

    Ok(())
}

/// Store a submission, returning its generated uuid
pub fn insert_submission(conn: &Connection, submission: &Submission) -> Result<String> {
    let uuid = uuid::Uuid::new_v4().to_string();
    let payload = serde_json::to_string(submission).context("Failed to serialize submission")?;

    conn.execute(
        "INSERT INTO submissions (
            submission_uuid, profile_id, profile_name, category, unit_type,
            answer_count, payload, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            uuid,
            canonical_id(submission.profile_id()),
            submission.profile_name(),
            submission.category(),
            submission.unit_type(),
            submission.answers().len() as i64,
            payload,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("Failed to insert submission")?;

    Ok(uuid)
}

/// Distinct profile ids with at least one stored submission
pub fn get_submitted_ids(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT profile_id FROM submissions")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<String>>>()?;
    Ok(ids)
}

/// All stored submissions for one profile, oldest first
pub fn get_submissions_for_profile(conn: &Connection, profile_id: &str) -> Result<Vec<Submission>> {
    let mut stmt = conn.prepare(
        "SELECT payload FROM submissions WHERE profile_id = ?1 ORDER BY id ASC",
    )?;
    let payloads = stmt
        .query_map(params![canonical_id(profile_id)], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    payloads
        .iter()
        .map(|p| serde_json::from_str(p).context("Failed to parse stored submission"))
        .collect()
}

pub fn count_submissions(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?;
    Ok(count)
}
