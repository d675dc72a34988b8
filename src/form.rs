// 🧩 Dynamic Form Schema - criterion input kind → typed field descriptor

use crate::criteria::{Criterion, InputKind};
use crate::data_quality::DataQualityWarning;
use crate::profiles::Profile;
use crate::submission::{Answer, AnswerValue};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const NOT_APPLICABLE: &str = "Not Applicable";
/// Recorded when the boolean default is configured as "unanswered"
pub const UNANSWERED: &str = "Unanswered";

// ============================================================================
// CHOICE POLICY
// ============================================================================

/// What an untouched yes/no field records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanDefault {
    #[default]
    No,
    Unanswered,
}

/// How yes/no questions are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoicePolicy {
    /// Offer a third, neutral "Not Applicable" option
    pub include_not_applicable: bool,
    pub default_answer: BooleanDefault,
}

impl ChoicePolicy {
    fn options(&self) -> Vec<String> {
        let mut options = vec![YES.to_string(), NO.to_string()];
        if self.include_not_applicable {
            options.push(NOT_APPLICABLE.to_string());
        }
        options
    }

    fn default_value(&self) -> AnswerValue {
        match self.default_answer {
            BooleanDefault::No => AnswerValue::Text(NO.to_string()),
            BooleanDefault::Unanswered => AnswerValue::Text(UNANSWERED.to_string()),
        }
    }
}

// ============================================================================
// FIELD DESCRIPTOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    BooleanChoice,
    Text,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
}

/// Natural key of a rendered field: (profile id, criterion description)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    pub profile_id: String,
    pub criterion_description: String,
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.profile_id, self.criterion_description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFieldDescriptor {
    pub criterion_description: String,
    pub widget_kind: WidgetKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Value recorded when the user leaves the field untouched
    pub default_value: AnswerValue,
    #[serde(default)]
    pub constraints: FieldConstraints,
}

impl FormFieldDescriptor {
    /// The given value as this field records it, or `None` when the field
    /// cannot hold it (negative or non-integer numbers, unknown options).
    pub fn accept(&self, value: &AnswerValue) -> Option<AnswerValue> {
        match self.widget_kind {
            WidgetKind::BooleanChoice => match value {
                AnswerValue::Text(s) => {
                    let choice = s.trim();
                    let allowed = self.options.iter().any(|o| o == choice)
                        || self.default_value == AnswerValue::Text(choice.to_string());
                    allowed.then(|| AnswerValue::Text(choice.to_string()))
                }
                AnswerValue::Integer(_) => None,
            },
            WidgetKind::Number => {
                let n = match value {
                    AnswerValue::Integer(n) => *n,
                    AnswerValue::Text(s) => s.trim().parse::<i64>().ok()?,
                };
                (n >= self.constraints.min.unwrap_or(i64::MIN)).then_some(AnswerValue::Integer(n))
            }
            WidgetKind::Text => Some(AnswerValue::Text(value.to_string())),
        }
    }
}

/// Map one criterion to its field. Total: unknown kinds fall back to text.
pub fn build_field(criterion: &Criterion, policy: &ChoicePolicy) -> FormFieldDescriptor {
    let description = criterion.description.clone();
    match criterion.input_kind {
        InputKind::BooleanChoice => FormFieldDescriptor {
            criterion_description: description,
            widget_kind: WidgetKind::BooleanChoice,
            options: policy.options(),
            default_value: policy.default_value(),
            constraints: FieldConstraints::default(),
        },
        InputKind::Number => FormFieldDescriptor {
            criterion_description: description,
            widget_kind: WidgetKind::Number,
            options: Vec::new(),
            default_value: AnswerValue::Integer(0),
            constraints: FieldConstraints {
                min: Some(0),
                step: Some(1),
            },
        },
        InputKind::Text | InputKind::Unspecified => FormFieldDescriptor {
            criterion_description: description,
            widget_kind: WidgetKind::Text,
            options: Vec::new(),
            default_value: AnswerValue::Text(String::new()),
            constraints: FieldConstraints::default(),
        },
    }
}

// ============================================================================
// FORM SCHEMA
// ============================================================================

/// Questionnaire for one profile, fields in catalog order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    pub profile_id: String,
    pub fields: Vec<FormFieldDescriptor>,
}

impl FormSchema {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn key(&self, field: &FormFieldDescriptor) -> FieldKey {
        FieldKey {
            profile_id: self.profile_id.clone(),
            criterion_description: field.criterion_description.clone(),
        }
    }

    /// One answer per field, in field order. Untouched fields carry their
    /// default, and so do fields given a value they cannot hold. Answers for
    /// questions not on this form are dropped.
    pub fn complete_answers(&self, given: Vec<Answer>) -> Vec<Answer> {
        let mut by_description: HashMap<String, AnswerValue> = HashMap::new();
        for answer in given {
            if self
                .fields
                .iter()
                .any(|f| f.criterion_description == answer.criterion_description)
            {
                by_description.insert(answer.criterion_description, answer.value);
            } else {
                debug!(
                    profile_id = %self.profile_id,
                    criterion = %answer.criterion_description,
                    "dropping answer for a question not on this form"
                );
            }
        }

        self.fields
            .iter()
            .map(|field| {
                let value = match by_description.remove(&field.criterion_description) {
                    Some(given) => field.accept(&given).unwrap_or_else(|| {
                        warn!(
                            profile_id = %self.profile_id,
                            criterion = %field.criterion_description,
                            value = %given,
                            "answer rejected by field constraints, using default"
                        );
                        field.default_value.clone()
                    }),
                    None => field.default_value.clone(),
                };
                Answer::new(field.criterion_description.clone(), value)
            })
            .collect()
    }
}

/// Build the questionnaire for a profile from its matched criteria.
///
/// A description repeated in the matched rows would produce two fields with
/// the same key; only the first row is kept.
pub fn build_form(profile: &Profile, matched: &[Criterion], policy: &ChoicePolicy) -> FormSchema {
    let profile_id = profile.key();
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(matched.len());

    for criterion in matched {
        if !seen.insert(criterion.description.as_str()) {
            let warning = DataQualityWarning::DuplicateCriterion {
                category: criterion.category.clone(),
                unit_type: criterion.unit_type.clone(),
                description: criterion.description.clone(),
            };
            warn!(%warning, profile_id = %profile_id, "keeping the first occurrence");
            continue;
        }
        fields.push(build_field(criterion, policy));
    }

    FormSchema { profile_id, fields }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(raw_kind: Option<&str>) -> Criterion {
        Criterion::new("Pregunta", "Técnico", "Facultad", InputKind::from_raw(raw_kind))
    }

    #[test]
    fn test_build_field_is_total() {
        let policy = ChoicePolicy::default();
        let cases = [
            (Some("SI_NO"), WidgetKind::BooleanChoice),
            (Some(" texto "), WidgetKind::Text),
            (Some("Numero"), WidgetKind::Number),
            (Some(""), WidgetKind::Text),
            (Some("xyz"), WidgetKind::Text),
            (None, WidgetKind::Text),
        ];

        for (raw, expected) in cases {
            let field = build_field(&criterion(raw), &policy);
            assert_eq!(field.widget_kind, expected, "input kind {:?}", raw);
            assert_eq!(field.criterion_description, "Pregunta");
        }
    }

    #[test]
    fn test_number_is_non_negative_integer() {
        let field = build_field(&criterion(Some("numero")), &ChoicePolicy::default());
        assert_eq!(field.constraints.min, Some(0));
        assert_eq!(field.constraints.step, Some(1));
        assert_eq!(field.default_value, AnswerValue::Integer(0));
    }

    #[test]
    fn test_boolean_two_options_default_no() {
        let field = build_field(&criterion(Some("si_no")), &ChoicePolicy::default());
        assert_eq!(field.options, vec!["Yes", "No"]);
        assert_eq!(field.default_value, AnswerValue::Text("No".to_string()));
    }

    #[test]
    fn test_boolean_three_options_and_unanswered() {
        let policy = ChoicePolicy {
            include_not_applicable: true,
            default_answer: BooleanDefault::Unanswered,
        };
        let field = build_field(&criterion(Some("si_no")), &policy);
        assert_eq!(field.options, vec!["Yes", "No", "Not Applicable"]);
        assert_eq!(field.default_value, AnswerValue::Text(UNANSWERED.to_string()));
    }

    #[test]
    fn test_text_has_no_constraints() {
        let field = build_field(&criterion(Some("texto")), &ChoicePolicy::default());
        assert_eq!(field.constraints, FieldConstraints::default());
        assert!(field.options.is_empty());
    }

    #[test]
    fn test_complete_answers_fills_defaults_in_field_order() {
        let profile = Profile::new("42", "Eva", "Técnico", "Aula", "Facultad");
        let matched = vec![
            Criterion::new("Puntual", "Técnico", "Facultad", InputKind::BooleanChoice),
            Criterion::new("Horas extra", "Técnico", "Facultad", InputKind::Number),
            Criterion::new("Comentario", "Técnico", "Facultad", InputKind::Text),
        ];
        let schema = build_form(&profile, &matched, &ChoicePolicy::default());

        let answers = schema.complete_answers(vec![
            Answer::new("Horas extra", AnswerValue::Integer(3)),
            Answer::new("No existe", AnswerValue::Text("Yes".into())),
        ]);

        assert_eq!(
            answers,
            vec![
                Answer::new("Puntual", AnswerValue::Text("No".into())),
                Answer::new("Horas extra", AnswerValue::Integer(3)),
                Answer::new("Comentario", AnswerValue::Text(String::new())),
            ]
        );
    }

    fn schema_for(kinds: &[(&str, InputKind)], policy: &ChoicePolicy) -> FormSchema {
        let profile = Profile::new("1", "Eva", "Técnico", "Aula", "Facultad");
        let matched: Vec<Criterion> = kinds
            .iter()
            .map(|(d, k)| Criterion::new(*d, "Técnico", "Facultad", *k))
            .collect();
        build_form(&profile, &matched, policy)
    }

    #[test]
    fn test_out_of_range_number_falls_back_to_default() {
        let schema = schema_for(&[("Horas", InputKind::Number)], &ChoicePolicy::default());

        let answers = schema.complete_answers(vec![Answer::new("Horas", -5i64)]);
        assert_eq!(answers, vec![Answer::new("Horas", 0i64)]);

        let answers = schema.complete_answers(vec![Answer::new("Horas", "tres")]);
        assert_eq!(answers, vec![Answer::new("Horas", 0i64)]);

        let answers = schema.complete_answers(vec![Answer::new("Horas", " 7 ")]);
        assert_eq!(answers, vec![Answer::new("Horas", 7i64)]);
    }

    #[test]
    fn test_unknown_choice_falls_back_to_default() {
        let schema = schema_for(&[("Puntual", InputKind::BooleanChoice)], &ChoicePolicy::default());

        let answers = schema.complete_answers(vec![Answer::new("Puntual", "Maybe")]);
        assert_eq!(answers, vec![Answer::new("Puntual", "No")]);

        let answers = schema.complete_answers(vec![Answer::new("Puntual", 1i64)]);
        assert_eq!(answers, vec![Answer::new("Puntual", "No")]);

        let answers = schema.complete_answers(vec![Answer::new("Puntual", "Yes")]);
        assert_eq!(answers, vec![Answer::new("Puntual", "Yes")]);
    }

    #[test]
    fn test_not_applicable_only_with_three_options() {
        let two = schema_for(&[("Puntual", InputKind::BooleanChoice)], &ChoicePolicy::default());
        let answers = two.complete_answers(vec![Answer::new("Puntual", NOT_APPLICABLE)]);
        assert_eq!(answers, vec![Answer::new("Puntual", NO)]);

        let policy = ChoicePolicy {
            include_not_applicable: true,
            default_answer: BooleanDefault::Unanswered,
        };
        let three = schema_for(&[("Puntual", InputKind::BooleanChoice)], &policy);
        let answers = three.complete_answers(vec![Answer::new("Puntual", NOT_APPLICABLE)]);
        assert_eq!(answers, vec![Answer::new("Puntual", NOT_APPLICABLE)]);
        assert_eq!(three.complete_answers(Vec::new()), vec![Answer::new("Puntual", UNANSWERED)]);
    }

    #[test]
    fn test_text_accepts_numbers_as_text() {
        let schema = schema_for(&[("Comentario", InputKind::Text)], &ChoicePolicy::default());
        let answers = schema.complete_answers(vec![Answer::new("Comentario", 12i64)]);
        assert_eq!(answers, vec![Answer::new("Comentario", "12")]);
    }

    #[test]
    fn test_repeated_description_yields_one_field() {
        let profile = Profile::new("1", "Eva", "Técnico", "Aula", "FACULTADES Y DEPARTAMENTOS");
        let matched = vec![
            Criterion::new("Puntual", "Tecnico", "Facultad", InputKind::BooleanChoice),
            Criterion::new("Puntual", "Técnico", "FACULTADES Y DEPARTAMENTOS", InputKind::Text),
            Criterion::new("Horas", "Técnico", "Facultad", InputKind::Number),
        ];
        let schema = build_form(&profile, &matched, &ChoicePolicy::default());

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields[0].widget_kind, WidgetKind::BooleanChoice);

        let answers = schema.complete_answers(vec![Answer::new("Puntual", "Yes")]);
        assert_eq!(
            answers,
            vec![Answer::new("Puntual", "Yes"), Answer::new("Horas", 0i64)]
        );
    }

    #[test]
    fn test_field_key_uses_natural_identity() {
        let profile = Profile::new(" 007 ", "Luis", "Técnico", "Aula", "Facultad");
        let matched = vec![Criterion::new("Puntual", "Técnico", "Facultad", InputKind::BooleanChoice)];
        let schema = build_form(&profile, &matched, &ChoicePolicy::default());

        let key = schema.key(&schema.fields[0]);
        assert_eq!(key.to_string(), "007::Puntual");
    }
}
