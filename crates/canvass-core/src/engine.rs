//! Form lifecycle and submission pipeline orchestrator.
//!
//! The engine owns the store collaborators and runs the request-scoped
//! pipelines: submission validation → availability → dedupe → scoring →
//! persistence, plus form lifecycle transitions and analytics queries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::analytics::{
    aggregate_distributions, attendance_stats, time_series, AnalyticsReport, AttendanceStats,
    DEFAULT_WINDOW_DAYS, SAMPLE_CAP,
};
use crate::error::EngineError;
use crate::guard;
use crate::model::{
    Answer, Form, FormDraft, FormStatus, FormType, PublicForm, Response, SubmissionPayload,
    Visibility,
};
use crate::scoring::score_quiz;
use crate::slug::{self, DEFAULT_MAX_SLUG_LEN};
use crate::store::{FormStore, ResponseStore, StoreError};
use crate::summary::{Summarizer, SummaryRequest};
use crate::validate::{validate_form_definition, validate_submission};

/// Configuration for the form engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cap on the response sample an aggregation reads.
    pub analytics_sample_cap: usize,
    /// Insert retries when the store rejects an allocated slug.
    pub slug_insert_retries: u32,
    /// Analytics window when the caller does not pick one.
    pub default_window_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analytics_sample_cap: SAMPLE_CAP,
            slug_insert_retries: 3,
            default_window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

/// What a delete request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The form was soft-archived; its responses are retained.
    Archived,
    /// The form and its responses were permanently removed.
    Deleted,
}

/// The central form engine.
pub struct FormEngine {
    forms: Arc<dyn FormStore>,
    responses: Arc<dyn ResponseStore>,
    summarizer: Option<Arc<dyn Summarizer>>,
    config: EngineConfig,
}

impl FormEngine {
    pub fn new(
        forms: Arc<dyn FormStore>,
        responses: Arc<dyn ResponseStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            forms,
            responses,
            summarizer: None,
            config,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Validate a definition, allocate a slug, and persist a new draft
    /// form. Retries with a fresh slug when the store's unique constraint
    /// rejects the allocated one.
    pub async fn create_form(
        &self,
        owner_id: &str,
        draft: FormDraft,
    ) -> Result<Form, EngineError> {
        let outcome = validate_form_definition(&draft);
        if !outcome.valid {
            return Err(EngineError::Validation(outcome.violations));
        }

        let base = slug::slug_from_title(&draft.title, DEFAULT_MAX_SLUG_LEN);

        for _ in 0..=self.config.slug_insert_retries {
            let slug = self.allocate_slug(&base).await?;
            let now = Utc::now();
            let form = Form {
                id: Uuid::new_v4(),
                owner_id: owner_id.to_string(),
                title: draft.title.clone(),
                description: draft.description.clone(),
                form_type: draft.form_type,
                slug,
                fields: draft.fields.clone(),
                settings: draft.settings.clone(),
                submission_policy: draft.submission_policy.clone(),
                status: FormStatus::Draft,
                created_at: now,
                updated_at: now,
            };

            match self.forms.insert(&form).await {
                Ok(()) => {
                    tracing::info!(form_id = %form.id, slug = %form.slug, "form created");
                    return Ok(form);
                }
                Err(e) if e.is_unique_violation() => {
                    tracing::warn!(slug = %form.slug, "slug lost a race, reallocating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::Conflict("slug allocation exhausted".into()))
    }

    async fn allocate_slug(&self, base: &str) -> Result<String, StoreError> {
        let forms = Arc::clone(&self.forms);
        slug::unique_slug(base, move |candidate| {
            let forms = Arc::clone(&forms);
            async move { forms.slug_exists(&candidate).await }
        })
        .await
    }

    /// Fetch a form and check ownership.
    async fn owned_form(&self, owner_id: &str, form_id: Uuid) -> Result<Form, EngineError> {
        let form = self
            .forms
            .get(form_id)
            .await?
            .ok_or(EngineError::NotFound("form"))?;
        if form.owner_id != owner_id {
            return Err(EngineError::Authorization);
        }
        Ok(form)
    }

    /// Replace a form's definition. The slug and status are untouched;
    /// archived forms reject edits.
    pub async fn update_form(
        &self,
        owner_id: &str,
        form_id: Uuid,
        draft: FormDraft,
    ) -> Result<Form, EngineError> {
        let mut form = self.owned_form(owner_id, form_id).await?;
        if form.status == FormStatus::Archived {
            return Err(EngineError::Conflict("archived forms cannot be edited".into()));
        }

        let outcome = validate_form_definition(&draft);
        if !outcome.valid {
            return Err(EngineError::Validation(outcome.violations));
        }

        form.title = draft.title;
        form.description = draft.description;
        form.fields = draft.fields;
        form.settings = draft.settings;
        form.submission_policy = draft.submission_policy;
        form.updated_at = Utc::now();

        self.forms.update(&form).await?;
        Ok(form)
    }

    async fn transition(
        &self,
        owner_id: &str,
        form_id: Uuid,
        next: FormStatus,
    ) -> Result<Form, EngineError> {
        let mut form = self.owned_form(owner_id, form_id).await?;
        if !form.status.can_transition(next) {
            return Err(EngineError::Conflict(format!(
                "cannot move a {} form to {next}",
                form.status
            )));
        }
        form.status = next;
        form.updated_at = Utc::now();
        self.forms.update(&form).await?;
        tracing::info!(form_id = %form.id, status = %next, "form status changed");
        Ok(form)
    }

    pub async fn publish_form(&self, owner_id: &str, form_id: Uuid) -> Result<Form, EngineError> {
        self.transition(owner_id, form_id, FormStatus::Published).await
    }

    pub async fn unpublish_form(&self, owner_id: &str, form_id: Uuid) -> Result<Form, EngineError> {
        self.transition(owner_id, form_id, FormStatus::Draft).await
    }

    pub async fn archive_form(&self, owner_id: &str, form_id: Uuid) -> Result<Form, EngineError> {
        self.transition(owner_id, form_id, FormStatus::Archived).await
    }

    /// Delete a form: archived forms are removed permanently together
    /// with their responses, anything else is soft-archived instead.
    pub async fn delete_form(
        &self,
        owner_id: &str,
        form_id: Uuid,
    ) -> Result<DeleteOutcome, EngineError> {
        let mut form = self.owned_form(owner_id, form_id).await?;

        if form.status == FormStatus::Archived {
            let removed = self.responses.delete_by_form(form_id).await?;
            self.forms.delete(form_id).await?;
            tracing::info!(form_id = %form_id, responses = removed, "form permanently deleted");
            return Ok(DeleteOutcome::Deleted);
        }

        form.status = FormStatus::Archived;
        form.updated_at = Utc::now();
        self.forms.update(&form).await?;
        Ok(DeleteOutcome::Archived)
    }

    /// The public projection of a form, looked up by slug.
    pub async fn public_form(&self, slug: &str) -> Result<PublicForm, EngineError> {
        let form = self
            .forms
            .get_by_slug(slug)
            .await?
            .ok_or(EngineError::NotFound("form"))?;
        if !form.settings.public {
            return Err(EngineError::NotFound("form"));
        }
        Ok(form.public_view())
    }

    /// Accept one public submission.
    ///
    /// Pipeline: availability → submission validation → dedupe pre-check
    /// → quiz scoring → persistence. The store's identity unique
    /// constraint is the authoritative duplicate decision; a violation on
    /// insert maps to the same conflict the pre-check produces.
    pub async fn submit(
        &self,
        slug: &str,
        payload: SubmissionPayload,
        now: DateTime<Utc>,
    ) -> Result<Response, EngineError> {
        let form = self
            .forms
            .get_by_slug(slug)
            .await?
            .ok_or(EngineError::NotFound("form"))?;

        guard::check_availability(&form, now)?;

        let outcome = validate_submission(&form, &payload);
        if !outcome.valid {
            return Err(EngineError::Validation(outcome.violations));
        }

        let identity_key =
            guard::check_duplicate(self.responses.as_ref(), &form, payload.responder.as_ref())
                .await?;

        let mut metadata = serde_json::Map::new();
        let (score, max_score) = if form.form_type == FormType::Quiz && form.settings.scored {
            let quiz_score = score_quiz(&form, &payload.answers);
            match serde_json::to_value(&quiz_score.per_question) {
                Ok(per_question) => {
                    metadata.insert("per_question".into(), per_question);
                }
                Err(e) => tracing::warn!("per-question breakdown not recorded: {e}"),
            }
            if let Some(passed) = quiz_score.passed(form.settings.passing_score) {
                metadata.insert("passed".into(), serde_json::Value::Bool(passed));
            }
            (Some(quiz_score.score), Some(quiz_score.max_score))
        } else {
            (None, None)
        };

        // Only answers to declared public fields are persisted.
        let answers: Vec<Answer> = payload
            .answers
            .into_iter()
            .filter(|a| {
                form.field(&a.field_id)
                    .is_some_and(|f| f.visibility == Visibility::Public)
            })
            .collect();

        let duration_secs = payload
            .started_at
            .and_then(|started| u32::try_from((now - started).num_seconds()).ok());

        let response = Response {
            id: Uuid::new_v4(),
            form_id: form.id,
            responder: payload.responder,
            started_at: payload.started_at,
            submitted_at: now,
            duration_secs,
            answers,
            score,
            max_score,
            identity_key,
            metadata,
        };

        match self.responses.insert(&response).await {
            Ok(()) => {
                tracing::info!(form_id = %form.id, response_id = %response.id, "response accepted");
                Ok(response)
            }
            Err(e) if e.is_unique_violation() => Err(EngineError::Conflict(
                "a response from this identity already exists".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_forms(&self, owner_id: &str) -> Result<Vec<Form>, EngineError> {
        Ok(self.forms.list_by_owner(owner_id).await?)
    }

    /// Page through a form's responses, oldest first.
    pub async fn list_responses(
        &self,
        owner_id: &str,
        form_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Response>, EngineError> {
        self.owned_form(owner_id, form_id).await?;
        Ok(self.responses.find_by_form(form_id, limit, offset).await?)
    }

    pub async fn delete_response(
        &self,
        owner_id: &str,
        form_id: Uuid,
        response_id: Uuid,
    ) -> Result<(), EngineError> {
        self.owned_form(owner_id, form_id).await?;
        let response = self
            .responses
            .get(response_id)
            .await?
            .ok_or(EngineError::NotFound("response"))?;
        if response.form_id != form_id {
            return Err(EngineError::NotFound("response"));
        }
        self.responses.delete(response_id).await?;
        Ok(())
    }

    /// Bounded response sample for aggregation, plus the true total.
    async fn sample(&self, form_id: Uuid) -> Result<(Vec<Response>, u64), EngineError> {
        let total = self.responses.count_by_form(form_id).await?;
        let sample = self
            .responses
            .find_by_form(form_id, self.config.analytics_sample_cap, 0)
            .await?;
        if total as usize > sample.len() {
            tracing::debug!(
                form_id = %form_id,
                total,
                sampled = sample.len(),
                "analytics sample capped"
            );
        }
        Ok((sample, total))
    }

    /// Aggregate analytics over a trailing window of days.
    pub async fn analytics(
        &self,
        owner_id: &str,
        form_id: Uuid,
        days: Option<u32>,
    ) -> Result<AnalyticsReport, EngineError> {
        let form = self.owned_form(owner_id, form_id).await?;
        let (sample, total) = self.sample(form_id).await?;
        let window_days = days.unwrap_or(self.config.default_window_days);
        let now = Utc::now();

        Ok(AnalyticsReport {
            form_id,
            generated_at: now,
            total,
            sampled: sample.len(),
            window_days,
            by_day: time_series(&sample, window_days, now),
            distributions: aggregate_distributions(&form, &sample),
        })
    }

    /// Attendance summary with its narrower 14-day series.
    pub async fn attendance(
        &self,
        owner_id: &str,
        form_id: Uuid,
    ) -> Result<AttendanceStats, EngineError> {
        self.owned_form(owner_id, form_id).await?;
        let (sample, total) = self.sample(form_id).await?;
        let mut stats = attendance_stats(&sample, Utc::now());
        stats.total = total;
        Ok(stats)
    }

    /// Free-text insight over a response sample, through the configured
    /// summarization collaborator.
    pub async fn summarize(&self, owner_id: &str, form_id: Uuid) -> Result<String, EngineError> {
        let form = self.owned_form(owner_id, form_id).await?;
        let summarizer = self
            .summarizer
            .as_ref()
            .ok_or(EngineError::NotFound("summarizer"))?;

        let (sample, total) = self.sample(form_id).await?;
        let request = SummaryRequest::from_sample(&form, &sample, total);
        summarizer
            .summarize(&request)
            .await
            .map_err(EngineError::Insight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.analytics_sample_cap, SAMPLE_CAP);
        assert_eq!(config.default_window_days, DEFAULT_WINDOW_DAYS);
        assert!(config.slug_insert_retries > 0);
    }
}
