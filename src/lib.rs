// Evaluation Forms - Core Library
// Joins people to the evaluation criteria that apply to them and turns the
// matched rows into a typed questionnaire. Used by the CLI, the API server
// and tests.

pub mod labels;
pub mod profiles;
pub mod criteria;
pub mod form;
pub mod submission;
pub mod data_quality;
pub mod source;
pub mod db;
pub mod sink;
pub mod workflow;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use labels::{normalize, LabelDictionary, NormalizationTable};
pub use profiles::{canonical_id, resolve, Profile};
pub use criteria::{match_criteria, Criterion, InputKind};
pub use form::{
    build_field, build_form, BooleanDefault, ChoicePolicy, FieldConstraints, FieldKey,
    FormFieldDescriptor, FormSchema, WidgetKind,
};
pub use submission::{
    assemble, compute_status, status_board, Answer, AnswerValue, CompletionStatus, Submission,
};
pub use data_quality::{audit_tables, DataQualityWarning, QualityReport, Severity};
pub use source::{load_criteria, load_profiles, CsvSource, SourceTables, TableCache, Tables};
pub use sink::{sink_from_config, SqliteSink, SubmissionSink, WebhookSink};
pub use workflow::{Evaluator, FormOutcome, StatusEntry, SubmissionReceipt};
pub use config::{AppConfig, SinkConfig};
pub use error::{FormError, NormalizationError, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the `tracing` subscriber used by both binaries (`RUST_LOG`
/// overrides the default `info` level).
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
