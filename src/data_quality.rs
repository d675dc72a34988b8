// ✅ Data Quality - table-level checks on the people table and the catalog
//
// Nothing here aborts processing. Warnings are logged and listed so the
// people maintaining the spreadsheets can fix them.

use crate::criteria::{match_criteria, Criterion};
use crate::labels::NormalizationTable;
use crate::profiles::Profile;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning, // Rows are silently ignored or shadowed
    Info,    // Valid data that probably is not what was intended
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// A resolved profile has no configured criteria
    EmptyMatch { profile_id: String },

    /// Several rows share one id; the first row wins
    DuplicateProfileId { id: String, occurrences: usize },

    /// Catalog row with blank category or unit type after normalization
    UnmatchableCriterion { row: usize, description: String },

    /// Same description twice for one normalized (category, unit type);
    /// only the first row reaches the form
    DuplicateCriterion {
        category: String,
        unit_type: String,
        description: String,
    },

    /// Profile that would get an empty questionnaire
    ProfileWithoutCriteria {
        profile_id: String,
        category: String,
        unit_type: String,
    },
}

impl DataQualityWarning {
    pub fn severity(&self) -> Severity {
        match self {
            DataQualityWarning::DuplicateProfileId { .. }
            | DataQualityWarning::UnmatchableCriterion { .. }
            | DataQualityWarning::DuplicateCriterion { .. } => Severity::Warning,
            DataQualityWarning::EmptyMatch { .. }
            | DataQualityWarning::ProfileWithoutCriteria { .. } => Severity::Info,
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::EmptyMatch { profile_id } => {
                write!(f, "no configured criteria for profile {}", profile_id)
            }
            DataQualityWarning::DuplicateProfileId { id, occurrences } => {
                write!(f, "profile id {} appears {} times", id, occurrences)
            }
            DataQualityWarning::UnmatchableCriterion { row, description } => write!(
                f,
                "criterion {:?} (row {}) has a blank category or unit type",
                description, row
            ),
            DataQualityWarning::DuplicateCriterion {
                category,
                unit_type,
                description,
            } => write!(
                f,
                "criterion {:?} is listed more than once for {} / {}",
                description, category, unit_type
            ),
            DataQualityWarning::ProfileWithoutCriteria {
                profile_id,
                category,
                unit_type,
            } => write!(
                f,
                "profile {} ({} / {}) matches no criteria",
                profile_id, category, unit_type
            ),
        }
    }
}

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub table_version: String,
    pub profile_count: usize,
    pub criteria_count: usize,
    pub warnings: Vec<DataQualityWarning>,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "{} profiles, {} criteria, normalization {}: {} issues ({} warnings)",
            self.profile_count,
            self.criteria_count,
            self.table_version,
            self.warnings.len(),
            self.warnings
                .iter()
                .filter(|w| w.severity() == Severity::Warning)
                .count()
        )
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Check both tables against each other.
///
/// Catalog rows are numbered from 1 (first data row).
pub fn audit_tables(
    profiles: &[Profile],
    criteria: &[Criterion],
    table: &NormalizationTable,
) -> QualityReport {
    let mut warnings = Vec::new();

    // Duplicate ids, reported once each in first-seen order
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();
    for profile in profiles {
        let count = counts.entry(profile.key()).or_insert(0);
        if *count == 0 {
            order.push(profile.key());
        }
        *count += 1;
    }
    for id in order {
        let occurrences = counts[&id];
        if occurrences > 1 {
            warnings.push(DataQualityWarning::DuplicateProfileId { id, occurrences });
        }
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for (index, criterion) in criteria.iter().enumerate() {
        if !criterion.is_matchable(table) {
            warnings.push(DataQualityWarning::UnmatchableCriterion {
                row: index + 1,
                description: criterion.description.clone(),
            });
            continue;
        }

        let (category, unit_type) = table.join_key(&criterion.category, &criterion.unit_type);
        let key = (category, unit_type, criterion.description.trim().to_string());
        if !seen.insert(key.clone()) && reported.insert(key.clone()) {
            let (category, unit_type, description) = key;
            warnings.push(DataQualityWarning::DuplicateCriterion {
                category,
                unit_type,
                description,
            });
        }
    }

    for profile in profiles {
        if match_criteria(profile, criteria, table).is_empty() {
            let normalized = profile.normalized(table);
            warnings.push(DataQualityWarning::ProfileWithoutCriteria {
                profile_id: profile.key(),
                category: normalized.category,
                unit_type: normalized.unit_type,
            });
        }
    }

    QualityReport {
        table_version: table.version().to_string(),
        profile_count: profiles.len(),
        criteria_count: criteria.len(),
        warnings,
    }
}

// ============================================================================
// TESTS
// ============================================================================
