// 🔄 Evaluation workflow - normalize → resolve → match → build → assemble → submit

use crate::criteria::match_criteria;
use crate::data_quality::DataQualityWarning;
use crate::error::FormError;
use crate::form::{build_form, ChoicePolicy, FormSchema};
use crate::labels::NormalizationTable;
use crate::profiles::{resolve, Profile};
use crate::sink::SubmissionSink;
use crate::source::Tables;
use crate::submission::{assemble, status_board, Answer, CompletionStatus};
use serde::Serialize;
use tracing::{info, warn};

/// Result of opening the questionnaire for one person
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FormOutcome {
    Ready { profile: Profile, schema: FormSchema },
    /// Nothing in the catalog applies to this person; shown to the user
    NoCriteria { profile: Profile },
}

impl FormOutcome {
    pub fn profile(&self) -> &Profile {
        match self {
            FormOutcome::Ready { profile, .. } | FormOutcome::NoCriteria { profile } => profile,
        }
    }
}

/// What the caller gets back after a successful finalize
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub profile_id: String,
    pub answer_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub profile_id: String,
    pub name: String,
    pub unit: String,
    pub status: CompletionStatus,
}

/// One snapshot of the tables plus the policies applied to it
pub struct Evaluator<'a> {
    tables: &'a Tables,
    labels: &'a NormalizationTable,
    policy: ChoicePolicy,
}

impl<'a> Evaluator<'a> {
    pub fn new(tables: &'a Tables, labels: &'a NormalizationTable, policy: ChoicePolicy) -> Self {
        Evaluator {
            tables,
            labels,
            policy,
        }
    }

    /// Resolve the person and build their questionnaire
    pub fn prepare_form(&self, profile_id: &str) -> Result<FormOutcome, FormError> {
        let profile = resolve(profile_id, &self.tables.profiles)?.normalized(self.labels);
        let matched = match_criteria(&profile, &self.tables.criteria, self.labels);

        if matched.is_empty() {
            let warning = DataQualityWarning::EmptyMatch {
                profile_id: profile.key(),
            };
            warn!(%warning, category = %profile.category, unit_type = %profile.unit_type);
            return Ok(FormOutcome::NoCriteria { profile });
        }

        let schema = build_form(&profile, &matched, &self.policy);
        Ok(FormOutcome::Ready { profile, schema })
    }

    /// Package the answers and hand them to the sink.
    ///
    /// Untouched fields carry their default value; finalizing is never
    /// blocked on missing answers.
    pub fn finalize(
        &self,
        profile_id: &str,
        answers: Vec<Answer>,
        observations: &str,
        sink: &dyn SubmissionSink,
    ) -> Result<SubmissionReceipt, FormError> {
        let (profile, answers) = match self.prepare_form(profile_id)? {
            FormOutcome::Ready { profile, schema } => {
                let answers = schema.complete_answers(answers);
                (profile, answers)
            }
            FormOutcome::NoCriteria { profile } => (profile, Vec::new()),
        };

        let submission = assemble(&profile, answers, observations);
        let receipt = SubmissionReceipt {
            profile_id: submission.profile_id().to_string(),
            answer_count: submission.answers().len(),
        };

        sink.submit(submission)?;
        info!(profile_id = %receipt.profile_id, answers = receipt.answer_count, "evaluation finalized");
        Ok(receipt)
    }

    /// Completion status of every person, in table order
    pub fn status_board(&self, sink: &dyn SubmissionSink) -> Result<Vec<StatusEntry>, FormError> {
        let submitted = sink.list_submitted_ids()?;
        Ok(status_board(&self.tables.profiles, &submitted)
            .into_iter()
            .map(|(profile, status)| StatusEntry {
                profile_id: profile.key(),
                name: profile.name.clone(),
                unit: profile.unit.clone(),
                status,
            })
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
