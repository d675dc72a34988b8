// ⚠️ Error taxonomy
// Every failure in the core resolves to one of these typed results.

use thiserror::Error;

/// Failures the form workflow hands back to the caller.
#[derive(Debug, Error)]
pub enum FormError {
    /// Unknown profile id - never recovered silently
    #[error("profile not found: {id}")]
    NotFound { id: String },

    /// Submission sink unreachable or rejected the request (retryable)
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Source tables could not be read
    #[error("source tables unavailable: {0:#}")]
    Source(anyhow::Error),
}

impl FormError {
    pub fn not_found(id: &str) -> Self {
        FormError::NotFound { id: id.to_string() }
    }

    /// Transport failures can be retried by the caller; nothing else can
    pub fn is_retryable(&self) -> bool {
        matches!(self, FormError::Transport(_))
    }
}

/// Opaque delivery failure reported by a submission sink.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("submission sink unreachable: {0}")]
    Unreachable(String),

    #[error("submission sink rejected the request with status {status}")]
    Rejected { status: u16 },

    #[error("submission sink returned an unreadable response: {0}")]
    Malformed(String),
}

/// Invalid normalization table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    /// A canonical value is also an alias key, which would make
    /// normalization non-idempotent.
    #[error("canonical label {canonical:?} is itself an alias (for {alias:?})")]
    ChainedAlias { alias: String, canonical: String },

    #[error("alias {0:?} is blank")]
    BlankAlias(String),
}
