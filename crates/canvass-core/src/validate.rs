//! Form-definition and submission validation.
//!
//! Both entry points collect every violation rather than stopping at the
//! first, and return structured `{field, rule, message}` records so
//! callers can render a complete rejection or act on individual rules.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Field, FieldKind, Form, FormDraft, SubmissionPayload, Visibility};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

/// The closed set of rules a violation can break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    MissingTitle,
    DuplicateFieldId,
    MissingLabel,
    MissingOptions,
    InvalidMultiple,
    UnknownField,
    MissingIdentity,
    MissingRequired,
    InvalidEmail,
    UnknownOption,
    ExpectedScalar,
    ExpectedArray,
    TooFewSelected,
    TooManySelected,
    OutOfRange,
    PatternMismatch,
}

/// One broken rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// The offending field id, when the rule concerns a field.
    pub field: Option<String>,
    pub rule: Rule,
    /// Human-readable description of the broken rule.
    pub message: String,
}

impl Violation {
    fn form(rule: Rule, message: impl Into<String>) -> Self {
        Self {
            field: None,
            rule,
            message: message.into(),
        }
    }

    fn field(field_id: &str, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            field: Some(field_id.to_string()),
            rule,
            message: message.into(),
        }
    }
}

/// Result of a validation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationOutcome {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Validate an owner-authored form definition.
///
/// Collects all structural violations: blank title, duplicate field ids,
/// missing labels, choice kinds without options, and `multiple` on a
/// non-dropdown field.
pub fn validate_form_definition(draft: &FormDraft) -> ValidationOutcome {
    let mut violations = Vec::new();

    if draft.title.trim().is_empty() {
        violations.push(Violation::form(Rule::MissingTitle, "form title is required"));
    }

    let mut seen_ids = HashSet::new();
    for field in &draft.fields {
        if !seen_ids.insert(field.id.as_str()) {
            violations.push(Violation::field(
                &field.id,
                Rule::DuplicateFieldId,
                format!("duplicate field id: {}", field.id),
            ));
        }

        if field.label.trim().is_empty() {
            violations.push(Violation::field(
                &field.id,
                Rule::MissingLabel,
                format!("field {} is missing a label", field.id),
            ));
        }

        if field.kind.is_choice() && field.options.is_empty() {
            violations.push(Violation::field(
                &field.id,
                Rule::MissingOptions,
                format!("{} field {} declares no options", field.kind, field.id),
            ));
        }

        if field.multiple && field.kind != FieldKind::Dropdown {
            violations.push(Violation::field(
                &field.id,
                Rule::InvalidMultiple,
                format!("multiple selection is not valid on a {} field", field.kind),
            ));
        }
    }

    ValidationOutcome::from_violations(violations)
}

/// Validate a public submission against a form's schema.
///
/// Internal-visibility fields are skipped entirely; they are never
/// validated against (or required from) a public submission.
pub fn validate_submission(form: &Form, payload: &SubmissionPayload) -> ValidationOutcome {
    let mut violations = Vec::new();

    check_identity(form, payload, &mut violations);

    let declared: HashSet<&str> = form.fields.iter().map(|f| f.id.as_str()).collect();
    for answer in &payload.answers {
        if !declared.contains(answer.field_id.as_str()) {
            violations.push(Violation::field(
                &answer.field_id,
                Rule::UnknownField,
                format!("unknown field: {}", answer.field_id),
            ));
        }
    }

    for field in &form.fields {
        if field.visibility == Visibility::Internal {
            continue;
        }

        let value = payload.answer(&field.id);

        if is_missing(value) {
            if field.required {
                violations.push(Violation::field(
                    &field.id,
                    Rule::MissingRequired,
                    format!("Missing required: {}", field.label),
                ));
            }
            continue;
        }

        if let Some(value) = value {
            check_value(field, value, &mut violations);
        }
    }

    ValidationOutcome::from_violations(violations)
}

/// The responder snapshot must carry whatever identity attributes the
/// form requires.
fn check_identity(
    form: &Form,
    payload: &SubmissionPayload,
    violations: &mut Vec<Violation>,
) {
    let identity = &form.settings.identity;
    let required: &[(bool, &str, fn(&crate::model::Responder) -> Option<&str>)] = &[
        (identity.require_name, "name", |r| r.name.as_deref()),
        (identity.require_email, "email", |r| r.email.as_deref()),
        (identity.require_student_id, "student id", |r| {
            r.student_id.as_deref()
        }),
    ];

    for (is_required, attr, get) in required {
        if !is_required {
            continue;
        }
        let present = payload
            .responder
            .as_ref()
            .and_then(|r| get(r))
            .is_some_and(|v| !v.trim().is_empty());
        if !present {
            violations.push(Violation::form(
                Rule::MissingIdentity,
                format!("Missing responder {attr}"),
            ));
        }
    }
}

/// A value is missing when it is absent, null, an empty string, or an
/// empty array. Boolean `false` and numeric `0` are NOT missing.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(_) => false,
    }
}

/// Kind-specific checks for a supplied (non-missing) value.
fn check_value(field: &Field, value: &Value, violations: &mut Vec<Violation>) {
    match field.kind {
        FieldKind::Email => {
            let ok = value.as_str().is_some_and(|s| EMAIL_RE.is_match(s));
            if !ok {
                violations.push(Violation::field(
                    &field.id,
                    Rule::InvalidEmail,
                    format!("Invalid email: {}", field.label),
                ));
            }
        }
        FieldKind::Radio => {
            if value.is_array() {
                violations.push(Violation::field(
                    &field.id,
                    Rule::ExpectedScalar,
                    format!("{} expects a single value", field.label),
                ));
            } else {
                check_options(field, std::slice::from_ref(value), violations);
            }
        }
        FieldKind::Checkbox => match value.as_array() {
            Some(selected) => {
                check_options(field, selected, violations);
                check_selection_count(field, selected.len(), violations);
            }
            None => violations.push(Violation::field(
                &field.id,
                Rule::ExpectedArray,
                format!("{} expects a list of values", field.label),
            )),
        },
        FieldKind::Dropdown => {
            if field.multiple {
                match value.as_array() {
                    Some(selected) => {
                        check_options(field, selected, violations);
                        check_selection_count(field, selected.len(), violations);
                    }
                    None => violations.push(Violation::field(
                        &field.id,
                        Rule::ExpectedArray,
                        format!("{} expects a list of values", field.label),
                    )),
                }
            } else if let Some(selected) = value.as_array() {
                check_options(field, selected, violations);
                check_selection_count(field, selected.len(), violations);
            } else {
                check_options(field, std::slice::from_ref(value), violations);
            }
        }
        FieldKind::Number | FieldKind::Rating | FieldKind::Scale => {
            check_range(field, value, violations);
        }
        _ => check_pattern(field, value, violations),
    }
}

/// Every supplied choice value must appear in the declared options.
fn check_options(field: &Field, selected: &[Value], violations: &mut Vec<Violation>) {
    for value in selected {
        match option_repr(value) {
            Some(repr) if field.options.iter().any(|o| *o == repr) => {}
            _ => violations.push(Violation::field(
                &field.id,
                Rule::UnknownOption,
                format!("Unknown option for {}: {}", field.label, value),
            )),
        }
    }
}

fn check_selection_count(field: &Field, count: usize, violations: &mut Vec<Violation>) {
    if let Some(min) = field.rules.min_select {
        if count < min {
            violations.push(Violation::field(
                &field.id,
                Rule::TooFewSelected,
                format!("{} requires at least {min} selections", field.label),
            ));
        }
    }
    if let Some(max) = field.rules.max_select {
        if count > max {
            violations.push(Violation::field(
                &field.id,
                Rule::TooManySelected,
                format!("{} allows at most {max} selections", field.label),
            ));
        }
    }
}

fn check_range(field: &Field, value: &Value, violations: &mut Vec<Violation>) {
    let Some(n) = value.as_f64() else {
        return;
    };
    if let Some(min) = field.rules.min {
        if n < min {
            violations.push(Violation::field(
                &field.id,
                Rule::OutOfRange,
                format!("{} must be at least {min}", field.label),
            ));
        }
    }
    if let Some(max) = field.rules.max {
        if n > max {
            violations.push(Violation::field(
                &field.id,
                Rule::OutOfRange,
                format!("{} must be at most {max}", field.label),
            ));
        }
    }
}

fn check_pattern(field: &Field, value: &Value, violations: &mut Vec<Violation>) {
    let (Some(pattern), Some(text)) = (field.rules.pattern.as_deref(), value.as_str()) else {
        return;
    };
    match Regex::new(pattern) {
        Ok(re) => {
            if !re.is_match(text) {
                violations.push(Violation::field(
                    &field.id,
                    Rule::PatternMismatch,
                    format!("{} does not match the expected format", field.label),
                ));
            }
        }
        Err(e) => {
            // An owner-authored pattern that fails to compile cannot be
            // enforced; the value is accepted as-is.
            tracing::warn!("invalid pattern on field {}: {e}", field.id);
        }
    }
}

/// The string form of a scalar used for option membership.
fn option_repr(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn field(id: &str, kind: FieldKind) -> Field {
        Field {
            id: id.into(),
            label: id.to_uppercase(),
            kind,
            required: false,
            options: vec![],
            multiple: false,
            visibility: Visibility::Public,
            rules: FieldRules::default(),
            quiz: None,
        }
    }

    fn choice(id: &str, kind: FieldKind, options: &[&str]) -> Field {
        Field {
            options: options.iter().map(|s| s.to_string()).collect(),
            ..field(id, kind)
        }
    }

    fn draft(fields: Vec<Field>) -> FormDraft {
        FormDraft {
            title: "Test form".into(),
            description: String::new(),
            form_type: FormType::General,
            fields,
            settings: FormSettings::default(),
            submission_policy: SubmissionPolicy::default(),
        }
    }

    fn form(fields: Vec<Field>) -> Form {
        Form {
            id: Uuid::nil(),
            owner_id: "owner".into(),
            title: "Test form".into(),
            description: String::new(),
            form_type: FormType::General,
            slug: "test-form".into(),
            fields,
            settings: FormSettings::default(),
            submission_policy: SubmissionPolicy::default(),
            status: FormStatus::Published,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payload(answers: Vec<(&str, Value)>) -> SubmissionPayload {
        SubmissionPayload {
            answers: answers
                .into_iter()
                .map(|(id, value)| Answer {
                    field_id: id.into(),
                    value,
                })
                .collect(),
            responder: None,
            started_at: None,
        }
    }

    #[test]
    fn blank_title_rejected() {
        let mut d = draft(vec![]);
        d.title = "   ".into();
        let outcome = validate_form_definition(&d);
        assert!(!outcome.valid);
        assert_eq!(outcome.violations[0].rule, Rule::MissingTitle);
    }

    #[test]
    fn duplicate_field_id_names_the_id() {
        let d = draft(vec![
            field("q1", FieldKind::ShortText),
            field("q1", FieldKind::LongText),
        ]);
        let outcome = validate_form_definition(&d);
        assert!(!outcome.valid);
        let dup = outcome
            .violations
            .iter()
            .find(|v| v.rule == Rule::DuplicateFieldId)
            .unwrap();
        assert!(dup.message.contains("q1"));
        assert_eq!(dup.field.as_deref(), Some("q1"));
    }

    #[test]
    fn choice_without_options_rejected() {
        let d = draft(vec![field("pick", FieldKind::Radio)]);
        let outcome = validate_form_definition(&d);
        assert!(outcome
            .violations
            .iter()
            .any(|v| v.rule == Rule::MissingOptions));
    }

    #[test]
    fn multiple_only_valid_on_dropdown() {
        let mut checkbox = choice("c", FieldKind::Checkbox, &["a"]);
        checkbox.multiple = true;
        let outcome = validate_form_definition(&draft(vec![checkbox]));
        assert!(outcome
            .violations
            .iter()
            .any(|v| v.rule == Rule::InvalidMultiple));

        let mut dropdown = choice("d", FieldKind::Dropdown, &["a"]);
        dropdown.multiple = true;
        let outcome = validate_form_definition(&draft(vec![dropdown]));
        assert!(outcome.valid);
    }

    #[test]
    fn all_violations_collected() {
        let d = draft(vec![
            Field {
                label: String::new(),
                ..field("q1", FieldKind::Radio)
            },
            field("q1", FieldKind::ShortText),
        ]);
        let outcome = validate_form_definition(&d);
        // missing label + missing options + duplicate id
        assert_eq!(outcome.violations.len(), 3);
    }

    #[test]
    fn required_missing_values() {
        let mut f = field("name", FieldKind::ShortText);
        f.required = true;
        let form = form(vec![f]);

        for value in [json!(null), json!(""), json!([])] {
            let outcome = validate_submission(&form, &payload(vec![("name", value)]));
            assert!(!outcome.valid);
            assert_eq!(outcome.violations[0].message, "Missing required: NAME");
        }

        // Absent entirely
        let outcome = validate_submission(&form, &payload(vec![]));
        assert!(!outcome.valid);
    }

    #[test]
    fn false_and_zero_are_not_missing() {
        let mut f = field("answer", FieldKind::ShortText);
        f.required = true;
        let form = form(vec![f]);

        for value in [json!(false), json!(0)] {
            let outcome = validate_submission(&form, &payload(vec![("answer", value)]));
            assert!(outcome.valid, "{outcome:?}");
        }
    }

    #[test]
    fn email_must_match_pattern() {
        let form = form(vec![field("contact", FieldKind::Email)]);

        let ok = validate_submission(&form, &payload(vec![("contact", json!("a@b.co"))]));
        assert!(ok.valid);

        let bad = validate_submission(&form, &payload(vec![("contact", json!("not-an-email"))]));
        assert_eq!(bad.violations[0].rule, Rule::InvalidEmail);
    }

    #[test]
    fn radio_rejects_arrays() {
        let form = form(vec![choice("pick", FieldKind::Radio, &["A", "B"])]);
        let outcome = validate_submission(&form, &payload(vec![("pick", json!(["A"]))]));
        assert_eq!(outcome.violations[0].rule, Rule::ExpectedScalar);
    }

    #[test]
    fn checkbox_requires_array() {
        let form = form(vec![choice("pick", FieldKind::Checkbox, &["A", "B"])]);
        let outcome = validate_submission(&form, &payload(vec![("pick", json!("A"))]));
        assert_eq!(outcome.violations[0].rule, Rule::ExpectedArray);

        let outcome = validate_submission(&form, &payload(vec![("pick", json!(["A", "B"]))]));
        assert!(outcome.valid);
    }

    #[test]
    fn multi_dropdown_requires_array() {
        let mut dropdown = choice("pick", FieldKind::Dropdown, &["A", "B"]);
        dropdown.multiple = true;
        let form = form(vec![dropdown]);

        let outcome = validate_submission(&form, &payload(vec![("pick", json!("A"))]));
        assert_eq!(outcome.violations[0].rule, Rule::ExpectedArray);
    }

    #[test]
    fn choice_values_must_be_declared_options() {
        let form = form(vec![choice("pick", FieldKind::Radio, &["A", "B"])]);
        let outcome = validate_submission(&form, &payload(vec![("pick", json!("C"))]));
        assert_eq!(outcome.violations[0].rule, Rule::UnknownOption);
        assert!(outcome.violations[0].message.contains("C"));
    }

    #[test]
    fn selection_count_limits() {
        let mut f = choice("pick", FieldKind::Checkbox, &["A", "B", "C"]);
        f.rules.min_select = Some(2);
        f.rules.max_select = Some(2);
        let form = form(vec![f]);

        let too_few = validate_submission(&form, &payload(vec![("pick", json!(["A"]))]));
        assert_eq!(too_few.violations[0].rule, Rule::TooFewSelected);

        let too_many =
            validate_submission(&form, &payload(vec![("pick", json!(["A", "B", "C"]))]));
        assert_eq!(too_many.violations[0].rule, Rule::TooManySelected);

        let just_right = validate_submission(&form, &payload(vec![("pick", json!(["A", "B"]))]));
        assert!(just_right.valid);
    }

    #[test]
    fn numeric_range_enforced() {
        let mut f = field("age", FieldKind::Number);
        f.rules.min = Some(0.0);
        f.rules.max = Some(150.0);
        let form = form(vec![f]);

        let outcome = validate_submission(&form, &payload(vec![("age", json!(200))]));
        assert_eq!(outcome.violations[0].rule, Rule::OutOfRange);

        let outcome = validate_submission(&form, &payload(vec![("age", json!(30))]));
        assert!(outcome.valid);
    }

    #[test]
    fn internal_fields_are_skipped() {
        let mut internal = field("notes", FieldKind::ShortText);
        internal.visibility = Visibility::Internal;
        internal.required = true;
        let form = form(vec![internal]);

        let outcome = validate_submission(&form, &payload(vec![]));
        assert!(outcome.valid);
    }

    #[test]
    fn identity_requirements_enforced() {
        let mut f = form(vec![]);
        f.settings.identity.require_email = true;

        let anonymous = validate_submission(&f, &payload(vec![]));
        assert_eq!(anonymous.violations[0].rule, Rule::MissingIdentity);

        let mut with_email = payload(vec![]);
        with_email.responder = Some(Responder {
            email: Some("a@b.co".into()),
            ..Responder::default()
        });
        assert!(validate_submission(&f, &with_email).valid);
    }

    #[test]
    fn unknown_field_flagged() {
        let form = form(vec![field("q1", FieldKind::ShortText)]);
        let outcome = validate_submission(&form, &payload(vec![("mystery", json!("x"))]));
        assert_eq!(outcome.violations[0].rule, Rule::UnknownField);
    }
}
