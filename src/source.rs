// 📂 Source Tables - people and criteria CSVs, plus the caller-owned cache
//
// The spreadsheets are exported by hand, so headers drift between
// "Categoria" / "Categoría" / "category". Every known spelling is mapped
// onto one schema here, before the core sees any row.

use crate::criteria::{Criterion, InputKind};
use crate::profiles::Profile;
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// HEADER ALIASES
// ============================================================================

const NAME: &[&str] = &["name", "nombre", "nombres", "nombre completo"];
const CATEGORY: &[&str] = &["category", "categoria", "categoría"];
const UNIT: &[&str] = &["unit", "unidad"];
// The oldest people sheet has only Nombre, Categoria, Unidad; the name is the key
const PROFILE_ID: &[&str] = &[
    "id",
    "cedula",
    "cédula",
    "identificacion",
    "identificación",
    "documento",
    "name",
    "nombre",
    "nombres",
    "nombre completo",
];
const SUB_UNIT: &[&str] = &["sub_unit", "subunidad", "sub_unidad", "sub unidad"];
const POSITION: &[&str] = &["position", "cargo"];
const DESCRIPTION: &[&str] = &[
    "description",
    "funcion",
    "función",
    "descripcion",
    "descripción",
    "criterio",
];
// Older sheets keyed both tables by "Unidad" only
const UNIT_TYPE: &[&str] = &[
    "unit_type",
    "tipo_unidad",
    "tipo de unidad",
    "tipo unidad",
    "tipo_de_unidad",
    "unidad",
];
const INPUT_KIND: &[&str] = &[
    "input_kind",
    "tipo",
    "tipo_respuesta",
    "tipo de respuesta",
    "tipo_pregunta",
];

/// Column positions resolved from a header row
struct HeaderMap {
    headers: Vec<String>,
}

impl HeaderMap {
    fn new(record: &StringRecord) -> Self {
        let headers = record
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        HeaderMap { headers }
    }

    /// First alias (in alias order) present in the header row
    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }

    fn require(&self, aliases: &[&str], field: &str, path: &Path) -> Result<usize> {
        match self.find(aliases) {
            Some(index) => Ok(index),
            None => bail!(
                "{}: missing required column '{}' (accepted headers: {})",
                path.display(),
                field,
                aliases.join(", ")
            ),
        }
    }
}

fn cell(record: &StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").to_string()
}

fn optional_cell(record: &StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file))
}

// ============================================================================
// LOADERS
// ============================================================================

/// Read the people table. Every cell is kept as text, so ids keep their
/// leading zeros.
pub fn load_profiles(path: &Path) -> Result<Vec<Profile>> {
    let mut reader = open_reader(path)?;
    let headers = HeaderMap::new(
        reader
            .headers()
            .with_context(|| format!("Failed to read headers of {}", path.display()))?,
    );

    let id = headers.require(PROFILE_ID, "id", path)?;
    let name = headers.require(NAME, "name", path)?;
    let category = headers.require(CATEGORY, "category", path)?;
    let unit_type = headers.require(UNIT_TYPE, "unit_type", path)?;
    let unit = headers.find(UNIT);
    let sub_unit = headers.find(SUB_UNIT);
    let position = headers.find(POSITION);

    let mut profiles = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        let record = result.with_context(|| {
            format!("Failed to parse CSV line {} in {}", line_num + 2, path.display())
        })?;

        // Spreadsheet exports end with blank rows
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        profiles.push(Profile {
            id: cell(&record, id),
            name: cell(&record, name),
            category: cell(&record, category),
            unit: unit.map(|i| cell(&record, i)).unwrap_or_default(),
            unit_type: cell(&record, unit_type),
            sub_unit: optional_cell(&record, sub_unit),
            position: optional_cell(&record, position),
        });
    }

    debug!(path = %path.display(), rows = profiles.len(), "loaded profiles");
    Ok(profiles)
}

/// Read the criteria catalog, keeping catalog order
pub fn load_criteria(path: &Path) -> Result<Vec<Criterion>> {
    let mut reader = open_reader(path)?;
    let headers = HeaderMap::new(
        reader
            .headers()
            .with_context(|| format!("Failed to read headers of {}", path.display()))?,
    );

    let description = headers.require(DESCRIPTION, "description", path)?;
    let category = headers.require(CATEGORY, "category", path)?;
    let unit_type = headers.require(UNIT_TYPE, "unit_type", path)?;
    let input_kind = headers.find(INPUT_KIND);

    let mut criteria = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        let record = result.with_context(|| {
            format!("Failed to parse CSV line {} in {}", line_num + 2, path.display())
        })?;

        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let kind = InputKind::from_raw(input_kind.and_then(|i| record.get(i)));
        criteria.push(Criterion::new(
            cell(&record, description).trim(),
            cell(&record, category),
            cell(&record, unit_type),
            kind,
        ));
    }

    debug!(path = %path.display(), rows = criteria.len(), "loaded criteria");
    Ok(criteria)
}

// ============================================================================
// PROVIDER
// ============================================================================

/// Both source tables, as one snapshot
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub profiles: Vec<Profile>,
    pub criteria: Vec<Criterion>,
}

/// Where the people table and the criteria catalog come from
pub trait SourceTables {
    fn profiles(&self) -> Result<Vec<Profile>>;

    fn criteria(&self) -> Result<Vec<Criterion>>;

    fn load(&self) -> Result<Tables> {
        Ok(Tables {
            profiles: self.profiles()?,
            criteria: self.criteria()?,
        })
    }
}

/// Two CSV files on disk
#[derive(Debug, Clone)]
pub struct CsvSource {
    profiles_path: PathBuf,
    criteria_path: PathBuf,
}

impl CsvSource {
    pub fn new(profiles_path: impl Into<PathBuf>, criteria_path: impl Into<PathBuf>) -> Self {
        CsvSource {
            profiles_path: profiles_path.into(),
            criteria_path: criteria_path.into(),
        }
    }
}

impl SourceTables for CsvSource {
    fn profiles(&self) -> Result<Vec<Profile>> {
        load_profiles(&self.profiles_path)
    }

    fn criteria(&self) -> Result<Vec<Criterion>> {
        load_criteria(&self.criteria_path)
    }
}

// ============================================================================
// CACHE
// ============================================================================

/// Loaded tables, kept until the owner invalidates them
pub struct TableCache<S> {
    source: S,
    loaded: Option<Arc<Tables>>,
}

impl<S: SourceTables> TableCache<S> {
    pub fn new(source: S) -> Self {
        TableCache {
            source,
            loaded: None,
        }
    }

    /// Current snapshot, loading it on first use
    pub fn tables(&mut self) -> Result<Arc<Tables>> {
        if let Some(tables) = &self.loaded {
            return Ok(Arc::clone(tables));
        }

        let tables = Arc::new(self.source.load()?);
        info!(
            profiles = tables.profiles.len(),
            criteria = tables.criteria.len(),
            "source tables loaded"
        );
        self.loaded = Some(Arc::clone(&tables));
        Ok(tables)
    }

    /// Drop the snapshot; the next `tables()` call reloads
    pub fn invalidate(&mut self) {
        self.loaded = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }
}

// ============================================================================
// TESTS
// ============================================================================
