use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use evaluation_forms::{
    audit_tables, init_logging, sink_from_config, AppConfig, Answer, CompletionStatus, Evaluator,
    FormError, FormOutcome, NormalizationTable, Severity, SinkConfig, SourceTables, SqliteSink,
    Tables,
};

const USAGE: &str = "\
Usage: evalform <command>

Commands:
  check                     Audit the people table and the criteria catalog
  form <id>                 Print the questionnaire for one person (JSON)
  status                    Show who has been evaluated
  submit <id> <answers>     Send answers from a JSON file
  history <id>              Show stored evaluations for one person (sqlite sink)

Config: $EVALFORM_CONFIG or ./evalform.json (defaults otherwise)";

/// Shape of the answers file given to `submit`
#[derive(Debug, Deserialize)]
struct AnswersFile {
    #[serde(default)]
    observations: String,
    #[serde(default)]
    answers: Vec<Answer>,
}

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let config = AppConfig::from_env()?;

    match args.get(1).map(|s| s.as_str()) {
        Some("check") => run_check(&config),
        Some("form") => run_form(&config, required_arg(&args, 2, "id")?),
        Some("status") => run_status(&config),
        Some("submit") => run_submit(
            &config,
            required_arg(&args, 2, "id")?,
            Path::new(required_arg(&args, 3, "answers file")?),
        ),
        Some("history") => run_history(&config, required_arg(&args, 2, "id")?),
        _ => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn required_arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(value) => Ok(value),
        None => bail!("missing <{}>\n\n{}", name, USAGE),
    }
}

fn load(config: &AppConfig) -> Result<(Tables, NormalizationTable)> {
    let tables = config.source().load()?;
    let labels = config.normalization_table()?;
    Ok((tables, labels))
}

fn run_check(config: &AppConfig) -> Result<()> {
    let (tables, labels) = load(config)?;
    let report = audit_tables(&tables.profiles, &tables.criteria, &labels);

    println!("🔍 {}", report.summary());
    println!(
        "   categories: {}",
        labels.categories().canonical_labels().join(", ")
    );
    println!(
        "   unit types: {}",
        labels.unit_types().canonical_labels().join(", ")
    );
    for warning in &report.warnings {
        let marker = match warning.severity() {
            Severity::Warning => "⚠️ ",
            Severity::Info => "ℹ️ ",
        };
        println!("  {} {}", marker, warning);
    }
    if report.is_clean() {
        println!("✓ No data quality issues");
    }

    Ok(())
}

fn run_form(config: &AppConfig, id: &str) -> Result<()> {
    let (tables, labels) = load(config)?;
    let evaluator = Evaluator::new(&tables, &labels, config.choices);

    let outcome = evaluator.prepare_form(id)?;
    if let FormOutcome::NoCriteria { profile } = &outcome {
        eprintln!(
            "❌ No criteria configured for {} ({} / {})",
            profile.name, profile.category, profile.unit_type
        );
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}

fn run_status(config: &AppConfig) -> Result<()> {
    let (tables, labels) = load(config)?;
    let evaluator = Evaluator::new(&tables, &labels, config.choices);
    let sink = sink_from_config(&config.sink)?;

    let board = evaluator.status_board(sink.as_ref())?;
    let done = board
        .iter()
        .filter(|e| e.status == CompletionStatus::Done)
        .count();

    for entry in &board {
        println!(
            "{:<8} {:<12} {:<32} {}",
            entry.status.as_str(),
            entry.profile_id,
            entry.name,
            entry.unit
        );
    }
    println!("\n✓ {}/{} evaluated", done, board.len());

    Ok(())
}

fn run_submit(config: &AppConfig, id: &str, answers_path: &Path) -> Result<()> {
    let content = fs::read_to_string(answers_path)
        .with_context(|| format!("Failed to read answers file: {}", answers_path.display()))?;
    let file: AnswersFile =
        serde_json::from_str(&content).context("Failed to parse answers JSON")?;

    let (tables, labels) = load(config)?;
    let evaluator = Evaluator::new(&tables, &labels, config.choices);
    let sink = sink_from_config(&config.sink)?;

    match evaluator.finalize(id, file.answers, &file.observations, sink.as_ref()) {
        Ok(receipt) => {
            println!(
                "✅ Evaluation for {} sent ({} answers)",
                receipt.profile_id, receipt.answer_count
            );
            Ok(())
        }
        Err(e @ FormError::Transport(_)) => {
            eprintln!("❌ {}", e);
            eprintln!("   Nothing was lost: run the same command again to retry.");
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

fn run_history(config: &AppConfig, id: &str) -> Result<()> {
    let SinkConfig::Sqlite { path } = &config.sink else {
        bail!("history needs the sqlite sink; the webhook keeps its own records");
    };
    let ledger = SqliteSink::open(path)?;

    let history = ledger.history(id)?;
    if history.is_empty() {
        println!("No evaluations stored for {}", id);
        return Ok(());
    }

    for (n, submission) in history.iter().enumerate() {
        println!(
            "#{} {} ({}), {} answers",
            n + 1,
            submission.profile_name(),
            submission.unit(),
            submission.answers().len()
        );
        for answer in submission.answers() {
            println!("    {:<40} {}", answer.criterion_description, answer.value);
        }
        if !submission.observations().is_empty() {
            println!("    observations: {}", submission.observations());
        }
    }
    println!("\n✓ {} of {} stored evaluations", history.len(), ledger.count()?);

    Ok(())
}
