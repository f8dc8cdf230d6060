//! TOML form-definition parser.
//!
//! Loads owner-authored form definitions from TOML files and directories.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{
    DedupeKey, Field, FieldKind, FieldRules, FormDraft, FormSettings, FormType,
    IdentityRequirements, QuizMeta, SubmissionPolicy, Visibility,
};

/// Intermediate TOML structure for parsing form definition files.
#[derive(Debug, Deserialize)]
struct TomlFormFile {
    form: TomlFormHeader,
    #[serde(default)]
    fields: Vec<TomlField>,
}

#[derive(Debug, Deserialize)]
struct TomlFormHeader {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    form_type: String,
    #[serde(default)]
    settings: TomlSettings,
    #[serde(default)]
    submission_policy: TomlPolicy,
}

#[derive(Debug, Default, Deserialize)]
struct TomlSettings {
    #[serde(default = "default_true")]
    public: bool,
    #[serde(default)]
    allow_multiple: bool,
    #[serde(default)]
    allow_anonymous: bool,
    #[serde(default)]
    identity: TomlIdentity,
    #[serde(default)]
    timer_secs: Option<u32>,
    /// RFC 3339 instant the form opens.
    #[serde(default)]
    open_at: Option<String>,
    /// RFC 3339 instant the form closes.
    #[serde(default)]
    close_at: Option<String>,
    #[serde(default)]
    scored: bool,
    #[serde(default)]
    passing_score: Option<f64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct TomlIdentity {
    #[serde(default)]
    require_name: bool,
    #[serde(default)]
    require_email: bool,
    #[serde(default)]
    require_student_id: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TomlPolicy {
    #[serde(default)]
    dedupe_by: Vec<String>,
    #[serde(default)]
    one_attempt_per_identity: bool,
}

#[derive(Debug, Deserialize)]
struct TomlField {
    id: String,
    label: String,
    kind: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    multiple: bool,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default)]
    rules: Option<TomlRules>,
    #[serde(default)]
    quiz: Option<TomlQuiz>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlRules {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    min_select: Option<usize>,
    #[serde(default)]
    max_select: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlQuiz {
    #[serde(default)]
    correct_options: Vec<usize>,
    #[serde(default)]
    points: f64,
}

/// Parse a single TOML file into a `FormDraft`.
pub fn parse_form_file(path: &Path) -> Result<FormDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read form definition: {}", path.display()))?;
    parse_form_str(&content, path)
}

/// Parse a TOML string into a `FormDraft` (useful for testing).
pub fn parse_form_str(content: &str, source_path: &Path) -> Result<FormDraft> {
    let parsed: TomlFormFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let form_type: FormType = parsed
        .form
        .form_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    let settings = convert_settings(parsed.form.settings)?;
    let submission_policy = convert_policy(parsed.form.submission_policy)?;

    let fields = parsed
        .fields
        .into_iter()
        .map(convert_field)
        .collect::<Result<Vec<_>>>()?;

    Ok(FormDraft {
        title: parsed.form.title,
        description: parsed.form.description,
        form_type,
        fields,
        settings,
        submission_policy,
    })
}

fn convert_settings(raw: TomlSettings) -> Result<FormSettings> {
    Ok(FormSettings {
        public: raw.public,
        allow_multiple: raw.allow_multiple,
        allow_anonymous: raw.allow_anonymous,
        identity: IdentityRequirements {
            require_name: raw.identity.require_name,
            require_email: raw.identity.require_email,
            require_student_id: raw.identity.require_student_id,
        },
        timer_secs: raw.timer_secs,
        open_at: raw.open_at.as_deref().map(parse_instant).transpose()?,
        close_at: raw.close_at.as_deref().map(parse_instant).transpose()?,
        scored: raw.scored,
        passing_score: raw.passing_score,
    })
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid RFC 3339 timestamp: {s}"))
}

fn convert_policy(raw: TomlPolicy) -> Result<SubmissionPolicy> {
    let dedupe_by = raw
        .dedupe_by
        .iter()
        .map(|key| match key.as_str() {
            "email" => Ok(DedupeKey::Email),
            "student_id" => Ok(DedupeKey::StudentId),
            other => anyhow::bail!("unknown dedupe key: {other}"),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SubmissionPolicy {
        dedupe_by,
        one_attempt_per_identity: raw.one_attempt_per_identity,
    })
}

fn convert_field(raw: TomlField) -> Result<Field> {
    let kind: FieldKind = raw
        .kind
        .parse()
        .map_err(|e: String| anyhow::anyhow!("field {}: {}", raw.id, e))?;

    let visibility = match raw.visibility.as_deref() {
        None | Some("public") => Visibility::Public,
        Some("internal") => Visibility::Internal,
        Some(other) => anyhow::bail!("field {}: unknown visibility: {other}", raw.id),
    };

    let rules = raw.rules.unwrap_or_default();

    Ok(Field {
        id: raw.id,
        label: raw.label,
        kind,
        required: raw.required,
        options: raw.options,
        multiple: raw.multiple,
        visibility,
        rules: FieldRules {
            min: rules.min,
            max: rules.max,
            pattern: rules.pattern,
            unique: rules.unique,
            min_select: rules.min_select,
            max_select: rules.max_select,
        },
        quiz: raw.quiz.map(|q| QuizMeta {
            correct_options: q.correct_options,
            points: q.points,
        }),
    })
}

/// Recursively load all `.toml` form definitions from a directory.
pub fn load_forms_directory(dir: &Path) -> Result<Vec<FormDraft>> {
    let mut drafts = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            drafts.extend(load_forms_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_form_file(&path) {
                Ok(draft) => drafts.push(draft),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[form]
title = "Course Feedback"
description = "End-of-term feedback"
type = "survey"

[form.settings]
allow_anonymous = true
close_at = "2030-06-30T23:59:59Z"

[form.submission_policy]
dedupe_by = ["email"]
one_attempt_per_identity = true

[[fields]]
id = "rating"
label = "Overall rating"
kind = "radio"
required = true
options = ["1", "2", "3", "4", "5"]

[[fields]]
id = "topics"
label = "Favourite topics"
kind = "checkbox"
options = ["Ownership", "Traits", "Async"]

[fields.rules]
min_select = 1
max_select = 2
"#;

    #[test]
    fn parse_valid_definition() {
        let draft = parse_form_str(VALID_TOML, &PathBuf::from("feedback.toml")).unwrap();
        assert_eq!(draft.title, "Course Feedback");
        assert_eq!(draft.form_type, FormType::Survey);
        assert!(draft.settings.allow_anonymous);
        assert!(draft.settings.close_at.is_some());
        assert_eq!(draft.submission_policy.dedupe_by, vec![DedupeKey::Email]);
        assert_eq!(draft.fields.len(), 2);
        assert_eq!(draft.fields[0].kind, FieldKind::Radio);
        assert_eq!(draft.fields[1].rules.max_select, Some(2));
    }

    #[test]
    fn parse_minimal_definition_uses_defaults() {
        let toml = r#"
[form]
title = "Minimal"
type = "general"

[[fields]]
id = "q1"
label = "Question"
kind = "short_text"
"#;
        let draft = parse_form_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert!(draft.settings.public);
        assert!(!draft.settings.allow_multiple);
        assert!(draft.submission_policy.dedupe_by.is_empty());
        assert_eq!(draft.fields[0].visibility, Visibility::Public);
        assert!(!draft.fields[0].required);
    }

    #[test]
    fn parse_quiz_metadata() {
        let toml = r#"
[form]
title = "Quiz"
type = "quiz"

[form.settings]
scored = true
passing_score = 5.0

[[fields]]
id = "q1"
label = "Pick B"
kind = "radio"
options = ["A", "B"]

[fields.quiz]
correct_options = [1]
points = 5.0
"#;
        let draft = parse_form_str(toml, &PathBuf::from("quiz.toml")).unwrap();
        assert!(draft.settings.scored);
        let quiz = draft.fields[0].quiz.as_ref().unwrap();
        assert_eq!(quiz.correct_options, vec![1]);
        assert_eq!(quiz.points, 5.0);
    }

    #[test]
    fn unknown_kind_rejected() {
        let toml = r#"
[form]
title = "Bad"
type = "general"

[[fields]]
id = "q1"
label = "Q"
kind = "slider"
"#;
        let err = parse_form_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("unknown field kind"));
    }

    #[test]
    fn unknown_type_rejected() {
        let toml = r#"
[form]
title = "Bad"
type = "poll"
"#;
        let err = parse_form_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("unknown form type"));
    }

    #[test]
    fn missing_type_fails_at_parse() {
        let toml = r#"
[form]
title = "No type"
"#;
        assert!(parse_form_str(toml, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn invalid_timestamp_rejected() {
        let toml = r#"
[form]
title = "Bad window"
type = "general"

[form.settings]
open_at = "yesterday"
"#;
        let err = parse_form_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("RFC 3339"));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_form_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("feedback.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not toml [").unwrap();

        let drafts = load_forms_directory(dir.path()).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Course Feedback");
    }
}
