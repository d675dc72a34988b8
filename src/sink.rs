// 📤 Submission Sinks - where finalized evaluations go
//
// Sinks are blocking and never retry; the caller decides what to do with a
// transport failure.

use crate::config::SinkConfig;
use crate::db;
use crate::error::TransportError;
use crate::profiles::canonical_id;
use crate::submission::Submission;
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Remote store for submissions
pub trait SubmissionSink: Send + Sync {
    fn submit(&self, submission: Submission) -> Result<(), TransportError>;

    /// Ids with at least one submission, already canonical
    fn list_submitted_ids(&self) -> Result<HashSet<String>, TransportError>;
}

/// Build the sink selected in the configuration
pub fn sink_from_config(config: &SinkConfig) -> Result<Box<dyn SubmissionSink>> {
    match config {
        SinkConfig::Webhook { url, timeout_ms } => {
            Ok(Box::new(WebhookSink::new(url.clone(), *timeout_ms)))
        }
        SinkConfig::Sqlite { path } => Ok(Box::new(SqliteSink::open(path)?)),
    }
}

// ============================================================================
// WEBHOOK (spreadsheet endpoint)
// ============================================================================

/// Posts submissions as JSON to an HTTP endpoint.
///
/// `GET <url>?action=ids` must answer with a JSON array of ids, or an object
/// with an `ids` array.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    url: String,
    timeout: Duration,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Self {
        WebhookSink {
            url: url.into(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn client(&self) -> Result<reqwest::blocking::Client, TransportError> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| TransportError::Unreachable(e.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    match err.status() {
        Some(status) => TransportError::Rejected {
            status: status.as_u16(),
        },
        None => TransportError::Unreachable(err.to_string()),
    }
}

impl SubmissionSink for WebhookSink {
    fn submit(&self, submission: Submission) -> Result<(), TransportError> {
        let client = self.client()?;
        client
            .post(&self.url)
            .json(&submission)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(transport_error)?;

        info!(
            profile_id = submission.profile_id(),
            answers = submission.answers().len(),
            "submission delivered to webhook"
        );
        Ok(())
    }

    fn list_submitted_ids(&self) -> Result<HashSet<String>, TransportError> {
        let client = self.client()?;
        let body = client
            .get(&self.url)
            .query(&[("action", "ids")])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(transport_error)?;

        parse_id_list(&body)
    }
}

/// Read the id list returned by the webhook.
///
/// Strings go through `canonical_id`. JSON numbers are taken as written,
/// which means a spreadsheet that stored "007" as the number 7 reports "7".
pub fn parse_id_list(body: &str) -> Result<HashSet<String>, TransportError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| TransportError::Malformed(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("ids") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(TransportError::Malformed(
                    "expected an 'ids' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(TransportError::Malformed(
                "expected a JSON array of ids".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(canonical_id(&s)),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(TransportError::Malformed(format!("unexpected id {}", other))),
        })
        .filter(|id| !matches!(id, Ok(s) if s.is_empty()))
        .collect()
}

// ============================================================================
// SQLITE LEDGER
// ============================================================================

/// Stores submissions in a local SQLite file
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open submission ledger: {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        db::setup_database(&conn)?;
        Ok(SqliteSink {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T, TransportError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| TransportError::Unreachable("ledger lock poisoned".to_string()))?;
        f(&*conn).map_err(|e| TransportError::Unreachable(format!("{:#}", e)))
    }

    /// Every stored submission for one profile, oldest first
    pub fn history(&self, profile_id: &str) -> Result<Vec<Submission>, TransportError> {
        self.with_conn(|conn| db::get_submissions_for_profile(conn, profile_id))
    }

    /// Stored submissions, counting resubmissions
    pub fn count(&self) -> Result<i64, TransportError> {
        self.with_conn(db::count_submissions)
    }
}

impl SubmissionSink for SqliteSink {
    fn submit(&self, submission: Submission) -> Result<(), TransportError> {
        let uuid = self.with_conn(|conn| db::insert_submission(conn, &submission))?;
        info!(
            profile_id = submission.profile_id(),
            submission = %uuid,
            "submission stored in ledger"
        );
        Ok(())
    }

    fn list_submitted_ids(&self) -> Result<HashSet<String>, TransportError> {
        self.with_conn(db::get_submitted_ids)
    }
}

// ============================================================================
// TESTS
// ============================================================================
