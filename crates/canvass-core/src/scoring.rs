//! Quiz scoring.
//!
//! Scoring is strictly all-or-nothing per field: single-select fields
//! award full points when the resolved option index is in the correct
//! set, and multi-select fields award full points only when the submitted
//! index-set equals the correct set exactly. No partial credit.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Answer, Field, FieldKind, Form};

/// The outcome of scoring one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizScore {
    pub score: f64,
    pub max_score: f64,
    /// Per-field earned/possible breakdown for response feedback.
    pub per_question: Vec<QuestionScore>,
}

impl QuizScore {
    /// Score as a fraction of the maximum, 0.0 when nothing is scorable.
    pub fn percentage(&self) -> f64 {
        if self.max_score > 0.0 {
            self.score / self.max_score * 100.0
        } else {
            0.0
        }
    }

    /// Whether the score clears the passing threshold, if one is set.
    pub fn passed(&self, passing_score: Option<f64>) -> Option<bool> {
        passing_score.map(|threshold| self.score >= threshold)
    }
}

/// Earned/possible points for one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionScore {
    pub field_id: String,
    pub earned: f64,
    pub possible: f64,
}

/// Score a set of answers against a form's quiz metadata.
///
/// Only fields with a positive point value and a non-empty correct-option
/// set contribute to `max_score`, whether or not they were answered.
/// Unanswered or unresolvable fields earn zero.
pub fn score_quiz(form: &Form, answers: &[Answer]) -> QuizScore {
    let mut score = 0.0;
    let mut max_score = 0.0;
    let mut per_question = Vec::new();

    for field in &form.fields {
        if !field.is_scorable() {
            continue;
        }
        let Some(quiz) = field.quiz.as_ref() else {
            continue;
        };

        max_score += quiz.points;

        let answered = answers
            .iter()
            .find(|a| a.field_id == field.id)
            .map(|a| &a.value);

        let correct: BTreeSet<usize> = quiz.correct_options.iter().copied().collect();
        let earned = match answered {
            Some(value) if is_correct(field, &correct, value) => quiz.points,
            _ => 0.0,
        };
        score += earned;

        per_question.push(QuestionScore {
            field_id: field.id.clone(),
            earned,
            possible: quiz.points,
        });
    }

    QuizScore {
        score,
        max_score,
        per_question,
    }
}

fn is_correct(field: &Field, correct: &BTreeSet<usize>, value: &Value) -> bool {
    match field.kind {
        FieldKind::Radio => single_select_correct(field, correct, value),
        FieldKind::Dropdown if field.multiple => multi_select_correct(field, correct, value),
        FieldKind::Dropdown => single_select_correct(field, correct, value),
        FieldKind::Checkbox => multi_select_correct(field, correct, value),
        // Other kinds carry no option semantics to resolve against.
        _ => false,
    }
}

fn single_select_correct(field: &Field, correct: &BTreeSet<usize>, value: &Value) -> bool {
    resolve_index(field, value).is_some_and(|i| correct.contains(&i))
}

/// Strict set equality: any unresolvable element or any difference from
/// the correct set scores zero.
fn multi_select_correct(field: &Field, correct: &BTreeSet<usize>, value: &Value) -> bool {
    let Some(selected) = value.as_array() else {
        return false;
    };
    let mut submitted = BTreeSet::new();
    for v in selected {
        match resolve_index(field, v) {
            Some(i) => {
                submitted.insert(i);
            }
            None => return false,
        }
    }
    submitted == *correct
}

/// Resolve a submitted value to an option index: a numeric index is
/// accepted directly, an option string resolves via its position in the
/// declared options list.
fn resolve_index(field: &Field, value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return Some(n as usize);
    }
    value.as_str().and_then(|s| field.option_index(s))
}
