// 🏷️ Label Normalization - one versioned table of canonical labels
//
// The people table and the criteria catalog are maintained independently,
// so the same category or unit type shows up spelled several ways
// ("Tecnico" / "Técnico", "Facultad" / "FACULTADES Y DEPARTAMENTOS").
// Every join key goes through this table before it is compared.

use crate::error::NormalizationError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// NORMALIZE
// ============================================================================

/// Trim `raw` and map it to its canonical label when the trimmed value is a
/// known alias (case-sensitive). Unknown labels come back trimmed.
pub fn normalize(raw: &str, dictionary: &BTreeMap<String, String>) -> String {
    let trimmed = raw.trim();
    match dictionary.get(trimmed) {
        Some(canonical) => canonical.clone(),
        None => trimmed.to_string(),
    }
}

// ============================================================================
// LABEL DICTIONARY
// ============================================================================

/// Alias → canonical mapping for one column.
///
/// Keys and values are stored trimmed, and no canonical value may itself be
/// an alias, so `normalize(normalize(x)) == normalize(x)` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelDictionary {
    entries: BTreeMap<String, String>,
}

impl LabelDictionary {
    pub fn new() -> Self {
        LabelDictionary::default()
    }

    /// Build a dictionary from (alias, canonical) pairs
    pub fn from_pairs<I, A, C>(pairs: I) -> Result<Self, NormalizationError>
    where
        I: IntoIterator<Item = (A, C)>,
        A: Into<String>,
        C: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (alias, canonical) in pairs {
            let alias: String = alias.into();
            let canonical: String = canonical.into();
            let alias_trimmed = alias.trim();
            if alias_trimmed.is_empty() {
                return Err(NormalizationError::BlankAlias(alias));
            }
            let canonical_trimmed = canonical.trim();
            // Identity mappings add nothing and would trip the chain check
            if alias_trimmed == canonical_trimmed {
                continue;
            }
            entries.insert(alias_trimmed.to_string(), canonical_trimmed.to_string());
        }

        for (alias, canonical) in &entries {
            if entries.contains_key(canonical) {
                return Err(NormalizationError::ChainedAlias {
                    alias: alias.clone(),
                    canonical: canonical.clone(),
                });
            }
        }

        Ok(LabelDictionary { entries })
    }

    pub fn normalize(&self, raw: &str) -> String {
        normalize(raw, &self.entries)
    }

    /// Canonical labels this dictionary can produce
    pub fn canonical_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.entries.values().map(|s| s.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// NORMALIZATION TABLE
// ============================================================================

const BUILTIN_VERSION: &str = "builtin-1";

const DEFAULT_CATEGORY_ALIASES: &[(&str, &str)] = &[
    ("Tecnico", "Técnico"),
    ("TECNICO", "Técnico"),
    ("Técnico Administrativo", "Técnico"),
    ("Administrativo ", "Administrativo"),
    ("ADMINISTRATIVO", "Administrativo"),
    ("Auxiliar de Servicio", "Auxiliar de Servicios"),
    ("Aux. Servicios", "Auxiliar de Servicios"),
    ("Profesional ", "Profesional"),
    ("PROFESIONAL", "Profesional"),
];

const DEFAULT_UNIT_TYPE_ALIASES: &[(&str, &str)] = &[
    ("Facultad", "FACULTADES Y DEPARTAMENTOS"),
    ("Facultades", "FACULTADES Y DEPARTAMENTOS"),
    ("Departamento", "FACULTADES Y DEPARTAMENTOS"),
    ("Facultades y Departamentos", "FACULTADES Y DEPARTAMENTOS"),
    ("Administracion Central", "ADMINISTRACIÓN CENTRAL"),
    ("Administración Central", "ADMINISTRACIÓN CENTRAL"),
    ("Dependencia Administrativa", "ADMINISTRACIÓN CENTRAL"),
    ("Sede", "SEDES REGIONALES"),
    ("Sedes", "SEDES REGIONALES"),
];

/// On-disk shape of the table (JSON)
#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    category: BTreeMap<String, String>,
    #[serde(default)]
    unit_type: BTreeMap<String, String>,
}

/// The single normalization table for both join keys.
///
/// Loaded once and handed to the matcher by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationTable {
    version: String,
    category: LabelDictionary,
    unit_type: LabelDictionary,
}

impl NormalizationTable {
    /// Build a table; the version defaults to a fingerprint of the entries
    pub fn new(
        category: LabelDictionary,
        unit_type: LabelDictionary,
        version: Option<String>,
    ) -> Self {
        let version = version
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| fingerprint(&category, &unit_type));
        NormalizationTable {
            version,
            category,
            unit_type,
        }
    }

    /// Table with no aliases: normalization only trims
    pub fn empty() -> Self {
        NormalizationTable::new(LabelDictionary::new(), LabelDictionary::new(), None)
    }

    /// Built-in aliases seen across the source spreadsheets
    pub fn with_defaults() -> Result<Self, NormalizationError> {
        let category = LabelDictionary::from_pairs(DEFAULT_CATEGORY_ALIASES.iter().copied())?;
        let unit_type = LabelDictionary::from_pairs(DEFAULT_UNIT_TYPE_ALIASES.iter().copied())?;
        Ok(NormalizationTable::new(
            category,
            unit_type,
            Some(BUILTIN_VERSION.to_string()),
        ))
    }

    /// Load the table from a JSON file
    ///
    /// ```json
    /// { "version": "2024-03",
    ///   "category":  { "Tecnico": "Técnico" },
    ///   "unit_type": { "Facultad": "FACULTADES Y DEPARTAMENTOS" } }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read normalization table: {:?}", path.as_ref())
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: TableFile =
            serde_json::from_str(content).context("Failed to parse normalization table JSON")?;

        let category = LabelDictionary::from_pairs(file.category)
            .context("Invalid category aliases")?;
        let unit_type = LabelDictionary::from_pairs(file.unit_type)
            .context("Invalid unit_type aliases")?;

        Ok(NormalizationTable::new(category, unit_type, file.version))
    }

    pub fn category(&self, raw: &str) -> String {
        self.category.normalize(raw)
    }

    pub fn unit_type(&self, raw: &str) -> String {
        self.unit_type.normalize(raw)
    }

    /// Normalized (category, unit_type) join key
    pub fn join_key(&self, category: &str, unit_type: &str) -> (String, String) {
        (self.category(category), self.unit_type(unit_type))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn categories(&self) -> &LabelDictionary {
        &self.category
    }

    pub fn unit_types(&self) -> &LabelDictionary {
        &self.unit_type
    }
}

fn fingerprint(category: &LabelDictionary, unit_type: &LabelDictionary) -> String {
    let mut hasher = Sha256::new();
    for (section, dictionary) in [("category", category), ("unit_type", unit_type)] {
        for (alias, canonical) in dictionary.entries() {
            hasher.update(format!("{}\t{}\t{}\n", section, alias, canonical));
        }
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("sha256:{}", &digest[..12])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("Tecnico".to_string(), "Técnico".to_string());
        map.insert("Facultad".to_string(), "FACULTADES Y DEPARTAMENTOS".to_string());
        map
    }

    #[test]
    fn test_normalize_trims_and_maps() {
        let dict = dictionary();
        assert_eq!(normalize("  Tecnico ", &dict), "Técnico");
        assert_eq!(normalize("Facultad", &dict), "FACULTADES Y DEPARTAMENTOS");
        assert_eq!(normalize("  Docente\t", &dict), "Docente");
    }

    #[test]
    fn test_normalize_is_case_sensitive() {
        let dict = dictionary();
        assert_eq!(normalize("tecnico", &dict), "tecnico");
    }

    #[test]
    fn test_normalize_empty_and_blank() {
        let dict = dictionary();
        assert_eq!(normalize("", &dict), "");
        assert_eq!(normalize("   ", &dict), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let table = NormalizationTable::with_defaults().unwrap();
        let inputs = [
            "", " ", "Tecnico", " Técnico ", "TECNICO", "Facultad", "Sede ", "xyz",
            "FACULTADES Y DEPARTAMENTOS", "Administrativo ",
        ];
        for input in inputs {
            let once = table.category(input);
            assert_eq!(table.category(&once), once, "category: {:?}", input);
            let once = table.unit_type(input);
            assert_eq!(table.unit_type(&once), once, "unit_type: {:?}", input);
        }
    }

    #[test]
    fn test_chained_alias_rejected() {
        let result = LabelDictionary::from_pairs([("Tec", "Tecnico"), ("Tecnico", "Técnico")]);
        assert!(matches!(result, Err(NormalizationError::ChainedAlias { .. })));
    }

    #[test]
    fn test_blank_alias_rejected() {
        let result = LabelDictionary::from_pairs([("  ", "Técnico")]);
        assert_eq!(result, Err(NormalizationError::BlankAlias("  ".to_string())));
    }

    #[test]
    fn test_identity_mapping_is_skipped() {
        let dict = LabelDictionary::from_pairs([("Técnico ", "Técnico"), ("Tecnico", "Técnico")])
            .unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.normalize("Técnico"), "Técnico");
        assert_eq!(dict.canonical_labels(), vec!["Técnico"]);
    }

    #[test]
    fn test_table_from_json() {
        let table = NormalizationTable::from_json(
            r#"{
                "version": "2024-03",
                "category": { "Tecnico": "Técnico" },
                "unit_type": { "Facultad": "FACULTADES Y DEPARTAMENTOS" }
            }"#,
        )
        .unwrap();

        assert_eq!(table.version(), "2024-03");
        assert_eq!(
            table.join_key(" Tecnico", "Facultad "),
            ("Técnico".to_string(), "FACULTADES Y DEPARTAMENTOS".to_string())
        );
    }

    #[test]
    fn test_table_from_json_rejects_chain() {
        let result = NormalizationTable::from_json(
            r#"{ "category": { "A": "B", "B": "C" } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_version_fingerprint_is_stable() {
        let json = r#"{ "category": { "Tecnico": "Técnico" } }"#;
        let first = NormalizationTable::from_json(json).unwrap();
        let second = NormalizationTable::from_json(json).unwrap();
        assert!(first.version().starts_with("sha256:"));
        assert_eq!(first.version(), second.version());

        let other = NormalizationTable::from_json(r#"{ "category": { "Tec": "Técnico" } }"#)
            .unwrap();
        assert_ne!(first.version(), other.version());
    }

    #[test]
    fn test_defaults_are_loaded() {
        let table = NormalizationTable::with_defaults().unwrap();
        assert_eq!(table.version(), "builtin-1");
        assert!(!table.categories().is_empty());
        assert_eq!(table.unit_type("Facultad"), "FACULTADES Y DEPARTAMENTOS");
    }

    #[test]
    fn test_every_builtin_alias_survives_validation() {
        let table = NormalizationTable::with_defaults().unwrap();
        for (alias, canonical) in DEFAULT_CATEGORY_ALIASES {
            assert_eq!(table.category(alias), *canonical, "category alias {:?}", alias);
        }
        for (alias, canonical) in DEFAULT_UNIT_TYPE_ALIASES {
            assert_eq!(table.unit_type(alias), *canonical, "unit_type alias {:?}", alias);
        }
        assert_eq!(
            table.categories().canonical_labels(),
            vec!["Administrativo", "Auxiliar de Servicios", "Profesional", "Técnico"]
        );
    }
}
