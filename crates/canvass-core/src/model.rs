//! Core data model types for canvass.
//!
//! These are the fundamental types the entire canvass system uses to
//! represent forms, fields, and collected responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A structured form owned by a single creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    /// Unique identifier for this form.
    pub id: Uuid,
    /// Identifier of the owning user.
    pub owner_id: String,
    /// Human-readable title.
    pub title: String,
    /// Description shown to respondents.
    #[serde(default)]
    pub description: String,
    /// What kind of form this is.
    pub form_type: FormType,
    /// Public URL-safe identifier. Assigned once at creation, never changed.
    pub slug: String,
    /// Ordered field list.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Owner-configurable settings.
    #[serde(default)]
    pub settings: FormSettings,
    /// Deduplication policy for submissions.
    #[serde(default)]
    pub submission_policy: SubmissionPolicy,
    /// Lifecycle status.
    #[serde(default)]
    pub status: FormStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Form {
    /// Look up a field by its identifier.
    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    /// Fields visible to public submitters.
    pub fn public_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|f| f.visibility == Visibility::Public)
    }

    /// The projection of this form exposed to public respondents.
    ///
    /// Strips internal-visibility fields and owner-only settings.
    pub fn public_view(&self) -> PublicForm {
        PublicForm {
            slug: self.slug.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            form_type: self.form_type,
            fields: self.public_fields().cloned().collect(),
            identity: self.settings.identity.clone(),
            allow_anonymous: self.settings.allow_anonymous,
            timer_secs: self.settings.timer_secs,
            open_at: self.settings.open_at,
            close_at: self.settings.close_at,
        }
    }
}

/// The kind of data a form collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormType {
    General,
    Survey,
    Attendance,
    Quiz,
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormType::General => write!(f, "general"),
            FormType::Survey => write!(f, "survey"),
            FormType::Attendance => write!(f, "attendance"),
            FormType::Quiz => write!(f, "quiz"),
        }
    }
}

impl FromStr for FormType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" => Ok(FormType::General),
            "survey" => Ok(FormType::Survey),
            "attendance" => Ok(FormType::Attendance),
            "quiz" => Ok(FormType::Quiz),
            other => Err(format!("unknown form type: {other}")),
        }
    }
}

/// Form lifecycle status.
///
/// Transitions: draft ↔ published, {draft, published} → archived.
/// Archived forms reject edits; deleting an archived form removes it
/// permanently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl FormStatus {
    /// Whether the status machine permits moving to `next`.
    pub fn can_transition(self, next: FormStatus) -> bool {
        use FormStatus::*;
        matches!(
            (self, next),
            (Draft, Published) | (Published, Draft) | (Draft, Archived) | (Published, Archived)
        )
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormStatus::Draft => write!(f, "draft"),
            FormStatus::Published => write!(f, "published"),
            FormStatus::Archived => write!(f, "archived"),
        }
    }
}

/// Owner-configurable form settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSettings {
    /// Whether the form is publicly visible at all.
    #[serde(default = "default_true")]
    pub public: bool,
    /// Whether one respondent may submit more than once.
    #[serde(default)]
    pub allow_multiple: bool,
    /// Whether submissions without a responder identity are accepted.
    #[serde(default)]
    pub allow_anonymous: bool,
    /// Which identity attributes respondents must supply.
    #[serde(default)]
    pub identity: IdentityRequirements,
    /// Optional countdown timer in seconds.
    #[serde(default)]
    pub timer_secs: Option<u32>,
    /// Submissions are rejected before this instant.
    #[serde(default)]
    pub open_at: Option<DateTime<Utc>>,
    /// Submissions are rejected after this instant.
    #[serde(default)]
    pub close_at: Option<DateTime<Utc>>,
    /// Whether quiz scoring is enabled.
    #[serde(default)]
    pub scored: bool,
    /// Minimum score counted as passing, if any.
    #[serde(default)]
    pub passing_score: Option<f64>,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            public: true,
            allow_multiple: false,
            allow_anonymous: false,
            identity: IdentityRequirements::default(),
            timer_secs: None,
            open_at: None,
            close_at: None,
            scored: false,
            passing_score: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Which identity attributes a form requires from respondents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityRequirements {
    #[serde(default)]
    pub require_name: bool,
    #[serde(default)]
    pub require_email: bool,
    #[serde(default)]
    pub require_student_id: bool,
}

/// How repeat submissions are detected and blocked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionPolicy {
    /// Identity attributes that make up the dedupe key.
    #[serde(default)]
    pub dedupe_by: Vec<DedupeKey>,
    /// Whether each identity may submit at most once.
    #[serde(default)]
    pub one_attempt_per_identity: bool,
}

/// An identity attribute usable as a dedupe key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupeKey {
    Email,
    StudentId,
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupeKey::Email => write!(f, "email"),
            DedupeKey::StudentId => write!(f, "student_id"),
        }
    }
}

/// One typed question/input unit within a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Identifier, unique within the owning form.
    pub id: String,
    /// Label shown to respondents.
    pub label: String,
    /// What kind of input this field collects.
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Declared options. Mandatory for dropdown/checkbox/radio.
    #[serde(default)]
    pub options: Vec<String>,
    /// Multiple selection. Valid only when kind = dropdown.
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub rules: FieldRules,
    /// Quiz metadata. Fields without it never contribute to scoring.
    #[serde(default)]
    pub quiz: Option<QuizMeta>,
}

impl Field {
    /// Whether this field contributes to quiz scoring: positive points
    /// and a non-empty correct-option set.
    pub fn is_scorable(&self) -> bool {
        self.quiz
            .as_ref()
            .is_some_and(|q| q.points > 0.0 && !q.correct_options.is_empty())
    }

    /// Resolve an option string to its position in the declared options.
    pub fn option_index(&self, option: &str) -> Option<usize> {
        self.options.iter().position(|o| o == option)
    }
}

/// The closed set of field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    ShortText,
    LongText,
    Email,
    Number,
    Date,
    Time,
    Dropdown,
    Checkbox,
    Radio,
    SingleSelect,
    Matrix,
    File,
    Rating,
    Scale,
    Section,
    Image,
    Video,
}

impl FieldKind {
    /// Choice kinds must declare a non-empty option list.
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            FieldKind::Dropdown | FieldKind::Checkbox | FieldKind::Radio
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::ShortText => "short_text",
            FieldKind::LongText => "long_text",
            FieldKind::Email => "email",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::SingleSelect => "single_select",
            FieldKind::Matrix => "matrix",
            FieldKind::File => "file",
            FieldKind::Rating => "rating",
            FieldKind::Scale => "scale",
            FieldKind::Section => "section",
            FieldKind::Image => "image",
            FieldKind::Video => "video",
        };
        write!(f, "{name}")
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "short_text" => Ok(FieldKind::ShortText),
            "long_text" => Ok(FieldKind::LongText),
            "email" => Ok(FieldKind::Email),
            "number" => Ok(FieldKind::Number),
            "date" => Ok(FieldKind::Date),
            "time" => Ok(FieldKind::Time),
            "dropdown" => Ok(FieldKind::Dropdown),
            "checkbox" => Ok(FieldKind::Checkbox),
            "radio" => Ok(FieldKind::Radio),
            "single_select" => Ok(FieldKind::SingleSelect),
            "matrix" => Ok(FieldKind::Matrix),
            "file" => Ok(FieldKind::File),
            "rating" => Ok(FieldKind::Rating),
            "scale" => Ok(FieldKind::Scale),
            "section" => Ok(FieldKind::Section),
            "image" => Ok(FieldKind::Image),
            "video" => Ok(FieldKind::Video),
            other => Err(format!("unknown field kind: {other}")),
        }
    }
}

/// Who can see a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    /// Never exposed to or required from public submitters.
    Internal,
}

/// Per-field validation constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRules {
    /// Minimum numeric value.
    #[serde(default)]
    pub min: Option<f64>,
    /// Maximum numeric value.
    #[serde(default)]
    pub max: Option<f64>,
    /// Regex the supplied text must match.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Value must be unique across responses.
    #[serde(default)]
    pub unique: bool,
    /// Minimum number of selected options.
    #[serde(default)]
    pub min_select: Option<usize>,
    /// Maximum number of selected options.
    #[serde(default)]
    pub max_select: Option<usize>,
}

/// Quiz metadata attached to a scorable field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizMeta {
    /// Indices into `options` counted as correct.
    #[serde(default)]
    pub correct_options: Vec<usize>,
    /// Points awarded for a correct answer.
    #[serde(default)]
    pub points: f64,
}

/// Snapshot of who submitted a response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Responder {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// One answer within a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub field_id: String,
    pub value: Value,
}

/// A completed submission to a form. Immutable once created, except for
/// owner-triggered deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    pub form_id: Uuid,
    #[serde(default)]
    pub responder: Option<Responder>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    /// Normalized dedupe key this response was stored under, if the form
    /// policy produced one. Backs the storage-level unique constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_key: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl Response {
    /// The submitted value for a field, if any.
    pub fn answer(&self, field_id: &str) -> Option<&Value> {
        self.answers
            .iter()
            .find(|a| a.field_id == field_id)
            .map(|a| &a.value)
    }
}

/// What a public caller submits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub responder: Option<Responder>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

impl SubmissionPayload {
    /// The supplied value for a field, if any.
    pub fn answer(&self, field_id: &str) -> Option<&Value> {
        self.answers
            .iter()
            .find(|a| a.field_id == field_id)
            .map(|a| &a.value)
    }
}

/// Owner-authored form definition, before an id/slug/status are assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub form_type: FormType,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub settings: FormSettings,
    #[serde(default)]
    pub submission_policy: SubmissionPolicy,
}

/// The form projection exposed to public respondents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicForm {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub form_type: FormType,
    pub fields: Vec<Field>,
    pub identity: IdentityRequirements,
    pub allow_anonymous: bool,
    pub timer_secs: Option<u32>,
    pub open_at: Option<DateTime<Utc>>,
    pub close_at: Option<DateTime<Utc>>,
}
