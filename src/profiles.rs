// 👤 Profiles - person/candidate records and id resolution

use crate::data_quality::DataQualityWarning;
use crate::error::FormError;
use crate::labels::NormalizationTable;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Person being evaluated. Owned by the upstream table, never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub unit: String,
    pub unit_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl Profile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        unit: impl Into<String>,
        unit_type: impl Into<String>,
    ) -> Self {
        Profile {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            unit: unit.into(),
            unit_type: unit_type.into(),
            sub_unit: None,
            position: None,
        }
    }

    /// Builder pattern: add sub unit
    pub fn with_sub_unit(mut self, sub_unit: impl Into<String>) -> Self {
        self.sub_unit = Some(sub_unit.into());
        self
    }

    /// Builder pattern: add position
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Comparison key for this profile's id
    pub fn key(&self) -> String {
        canonical_id(&self.id)
    }

    /// Copy with canonical category and unit type
    pub fn normalized(&self, table: &NormalizationTable) -> Profile {
        let mut profile = self.clone();
        profile.category = table.category(&self.category);
        profile.unit_type = table.unit_type(&self.unit_type);
        profile
    }
}

/// The one string-conversion rule for ids: surrounding whitespace is
/// dropped, nothing else. "007" and "7" stay different ids.
pub fn canonical_id(raw: &str) -> String {
    raw.trim().to_string()
}

/// Find the profile with `id`. Duplicate ids resolve to the first row in
/// table order.
pub fn resolve<'a>(id: &str, profiles: &'a [Profile]) -> Result<&'a Profile, FormError> {
    let key = canonical_id(id);
    let mut matches = profiles.iter().filter(|p| p.key() == key);

    let first = matches.next().ok_or_else(|| FormError::not_found(&key))?;

    let extra = matches.count();
    if extra > 0 {
        let warning = DataQualityWarning::DuplicateProfileId {
            id: key,
            occurrences: extra + 1,
        };
        warn!(%warning, "resolving to first occurrence");
    }

    Ok(first)
}
