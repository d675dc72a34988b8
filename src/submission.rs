// 📨 Submission - finalized answers and per-person completion status

use crate::profiles::{canonical_id, Profile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// ANSWERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Integer(i64),
    Text(String),
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerValue::Integer(n) => write!(f, "{}", n),
            AnswerValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        AnswerValue::Integer(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub criterion_description: String,
    pub value: AnswerValue,
}

impl Answer {
    pub fn new(criterion_description: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        Answer {
            criterion_description: criterion_description.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// SUBMISSION
// ============================================================================

/// One profile's finalized evaluation.
///
/// Immutable once assembled; the sink takes it by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    profile_id: String,
    profile_name: String,
    unit: String,
    category: String,
    unit_type: String,
    observations: String,
    answers: Vec<Answer>,
}

impl Submission {
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn unit_type(&self) -> &str {
        &self.unit_type
    }

    pub fn observations(&self) -> &str {
        &self.observations
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }
}

/// Package a profile's answers. No completeness check: finalizing is never
/// blocked on missing answers.
pub fn assemble(profile: &Profile, answers: Vec<Answer>, observations: &str) -> Submission {
    Submission {
        profile_id: profile.key(),
        profile_name: profile.name.clone(),
        unit: profile.unit.clone(),
        category: profile.category.clone(),
        unit_type: profile.unit_type.clone(),
        observations: observations.to_string(),
        answers,
    }
}

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Pending,
    Done,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Pending => "Pending",
            CompletionStatus::Done => "Done",
        }
    }
}

/// `Done` iff the profile id is among the submitted ids.
///
/// `canonical_id` is applied to both sides, so `" 007"` matches `"007 "`
/// but never `"7"`.
pub fn compute_status(profile_id: &str, submitted_ids: &HashSet<String>) -> CompletionStatus {
    let key = canonical_id(profile_id);
    if submitted_ids.iter().any(|id| canonical_id(id) == key) {
        CompletionStatus::Done
    } else {
        CompletionStatus::Pending
    }
}

/// Every profile with its status, in table order
pub fn status_board<'a>(
    profiles: &'a [Profile],
    submitted_ids: &HashSet<String>,
) -> Vec<(&'a Profile, CompletionStatus)> {
    let submitted: HashSet<String> = submitted_ids.iter().map(|id| canonical_id(id)).collect();
    profiles
        .iter()
        .map(|p| {
            let status = if submitted.contains(&p.key()) {
                CompletionStatus::Done
            } else {
                CompletionStatus::Pending
            };
            (p, status)
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
