// 📋 Criteria - evaluation catalog and the profile ↔ criteria join

use crate::labels::NormalizationTable;
use crate::profiles::Profile;
use serde::{Deserialize, Serialize};

// ============================================================================
// INPUT KIND
// ============================================================================

/// Declared answer type of a criterion, as written in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    BooleanChoice,
    Text,
    Number,
    /// Blank, missing or unrecognized
    #[default]
    Unspecified,
}

impl InputKind {
    /// Parse the catalog's raw value (trimmed, case-insensitive).
    ///
    /// `si_no`, `numero` and `texto` are recognized; anything else is
    /// `Unspecified`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return InputKind::Unspecified;
        };
        match raw.trim().to_lowercase().as_str() {
            "si_no" => InputKind::BooleanChoice,
            "numero" => InputKind::Number,
            "texto" => InputKind::Text,
            _ => InputKind::Unspecified,
        }
    }
}

// ============================================================================
// CRITERION
// ============================================================================

/// One evaluation question for a (category, unit type) pair.
///
/// Not globally unique: several criteria usually share the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub description: String,
    pub category: String,
    pub unit_type: String,
    #[serde(default)]
    pub input_kind: InputKind,
}

impl Criterion {
    pub fn new(
        description: impl Into<String>,
        category: impl Into<String>,
        unit_type: impl Into<String>,
        input_kind: InputKind,
    ) -> Self {
        Criterion {
            description: description.into(),
            category: category.into(),
            unit_type: unit_type.into(),
            input_kind,
        }
    }

    /// A criterion with a blank category or unit type after normalization
    /// can never match any profile.
    pub fn is_matchable(&self, table: &NormalizationTable) -> bool {
        let (category, unit_type) = table.join_key(&self.category, &self.unit_type);
        !category.is_empty() && !unit_type.is_empty()
    }
}

// ============================================================================
// MATCHER
// ============================================================================

/// Criteria that apply to `profile`, in catalog order.
///
/// Both sides are normalized before comparison. An empty result is a valid
/// answer ("nothing configured for this profile"), not an error.
pub fn match_criteria(
    profile: &Profile,
    criteria: &[Criterion],
    table: &NormalizationTable,
) -> Vec<Criterion> {
    let wanted = table.join_key(&profile.category, &profile.unit_type);
    if wanted.0.is_empty() || wanted.1.is_empty() {
        return Vec::new();
    }

    criteria
        .iter()
        .filter(|c| table.join_key(&c.category, &c.unit_type) == wanted)
        .cloned()
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
