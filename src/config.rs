// ⚙️ Configuration - JSON file with defaults for every field

use crate::form::ChoicePolicy;
use crate::labels::NormalizationTable;
use crate::source::CsvSource;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "EVALFORM_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "evalform.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Spreadsheet webhook (e.g. an Apps Script deployment)
    Webhook {
        url: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// Local SQLite ledger
    Sqlite { path: PathBuf },
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Sqlite {
            path: PathBuf::from("submissions.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub profiles_csv: PathBuf,
    pub criteria_csv: PathBuf,
    /// JSON alias table; built-in aliases when absent
    pub normalization_table: Option<PathBuf>,
    pub sink: SinkConfig,
    pub choices: ChoicePolicy,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            profiles_csv: PathBuf::from("data/postulantes.csv"),
            criteria_csv: PathBuf::from("data/funciones.csv"),
            normalization_table: None,
            sink: SinkConfig::default(),
            choices: ChoicePolicy::default(),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config JSON")
    }

    /// Config named by `EVALFORM_CONFIG`, else `evalform.json` if present,
    /// else defaults. A path given through the environment must exist.
    pub fn from_env() -> Result<Self> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    bail!("{} points to a missing file: {}", CONFIG_ENV, path.display());
                }
                Self::load(&path)
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load(path)
                } else {
                    debug!("no config file found, using defaults");
                    Ok(AppConfig::default())
                }
            }
        }
    }

    pub fn normalization_table(&self) -> Result<NormalizationTable> {
        match &self.normalization_table {
            Some(path) => NormalizationTable::from_file(path),
            None => NormalizationTable::with_defaults().context("Invalid built-in aliases"),
        }
    }

    pub fn source(&self) -> CsvSource {
        CsvSource::new(&self.profiles_csv, &self.criteria_csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::BooleanDefault;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.choices.default_answer, BooleanDefault::No);
    }

    #[test]
    fn test_webhook_sink_config() {
        let config = AppConfig::from_json(
            r#"{
                "profiles_csv": "people.csv",
                "sink": { "kind": "webhook", "url": "https://script.example.com/exec" },
                "choices": { "include_not_applicable": true, "default_answer": "unanswered" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.profiles_csv, PathBuf::from("people.csv"));
        assert_eq!(config.criteria_csv, PathBuf::from("data/funciones.csv"));
        assert_eq!(
            config.sink,
            SinkConfig::Webhook {
                url: "https://script.example.com/exec".to_string(),
                timeout_ms: 10_000,
            }
        );
        assert!(config.choices.include_not_applicable);
        assert_eq!(config.choices.default_answer, BooleanDefault::Unanswered);
    }

    #[test]
    fn test_unknown_sink_kind_rejected() {
        assert!(AppConfig::from_json(r#"{ "sink": { "kind": "ftp" } }"#).is_err());
    }

    #[test]
    fn test_load_from_file_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let table_path = dir.path().join("labels.json");
        fs::write(&table_path, r#"{ "version": "v2", "category": { "Tec": "Técnico" } }"#)
            .unwrap();
        let config_path = dir.path().join("evalform.json");
        fs::write(
            &config_path,
            format!(r#"{{ "normalization_table": {:?} }}"#, table_path.to_str().unwrap()),
        )
        .unwrap();

        let config = AppConfig::load(&config_path).unwrap();
        let table = config.normalization_table().unwrap();
        assert_eq!(table.version(), "v2");
        assert_eq!(table.category("Tec"), "Técnico");
    }

    #[test]
    fn test_default_table_is_builtin() {
        let table = AppConfig::default().normalization_table().unwrap();
        assert_eq!(table.version(), "builtin-1");
    }
}
