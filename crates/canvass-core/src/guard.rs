//! Deduplication and availability guard.
//!
//! Runs before a submission is accepted: the form must be published and
//! inside its window, and a one-attempt-per-identity policy must not
//! already have a response for the same identity. The duplicate check
//! here is a fast-path courtesy; the storage-level unique constraint on
//! (form_id, identity_key) is what actually decides concurrent races.

use chrono::{DateTime, Utc};

use crate::error::{ClosedReason, EngineError};
use crate::model::{DedupeKey, Form, FormStatus, Responder, SubmissionPolicy};
use crate::store::ResponseStore;

/// Reject submissions to unpublished forms or outside the window.
pub fn check_availability(form: &Form, now: DateTime<Utc>) -> Result<(), EngineError> {
    if form.status != FormStatus::Published {
        return Err(EngineError::WindowClosed(ClosedReason::NotPublished));
    }
    if let Some(open_at) = form.settings.open_at {
        if now < open_at {
            return Err(EngineError::WindowClosed(ClosedReason::NotYetOpen));
        }
    }
    if let Some(close_at) = form.settings.close_at {
        if now > close_at {
            return Err(EngineError::WindowClosed(ClosedReason::Closed));
        }
    }
    Ok(())
}

/// Build the normalized dedupe key for a responder under a policy.
///
/// Email is compared case-insensitively, student id exactly. Returns
/// `None` when the responder carries none of the configured keys.
pub fn identity_key(policy: &SubmissionPolicy, responder: Option<&Responder>) -> Option<String> {
    let responder = responder?;
    let mut parts = Vec::new();
    for key in &policy.dedupe_by {
        match key {
            DedupeKey::Email => {
                if let Some(email) = responder.email.as_deref().filter(|e| !e.is_empty()) {
                    parts.push(format!("email:{}", email.trim().to_lowercase()));
                }
            }
            DedupeKey::StudentId => {
                if let Some(sid) = responder.student_id.as_deref().filter(|s| !s.is_empty()) {
                    parts.push(format!("student_id:{sid}"));
                }
            }
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("|"))
    }
}

/// Fast-path duplicate check. Returns the identity key the response
/// should be stored under, so the store's unique constraint covers the
/// same identity this check saw.
pub async fn check_duplicate(
    store: &dyn ResponseStore,
    form: &Form,
    responder: Option<&Responder>,
) -> Result<Option<String>, EngineError> {
    if !form.submission_policy.one_attempt_per_identity {
        return Ok(None);
    }
    let Some(key) = identity_key(&form.submission_policy, responder) else {
        return Ok(None);
    };
    if store.identity_exists(form.id, &key).await? {
        return Err(EngineError::Conflict(
            "a response from this identity already exists".into(),
        ));
    }
    Ok(Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use chrono::Duration;
    use uuid::Uuid;

    fn form_with_status(status: FormStatus) -> Form {
        Form {
            id: Uuid::nil(),
            owner_id: "owner".into(),
            title: "T".into(),
            description: String::new(),
            form_type: FormType::General,
            slug: "t".into(),
            fields: vec![],
            settings: FormSettings::default(),
            submission_policy: SubmissionPolicy::default(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unpublished_forms_reject() {
        let now = Utc::now();
        for status in [FormStatus::Draft, FormStatus::Archived] {
            let err = check_availability(&form_with_status(status), now).unwrap_err();
            assert!(matches!(
                err,
                EngineError::WindowClosed(ClosedReason::NotPublished)
            ));
        }
        assert!(check_availability(&form_with_status(FormStatus::Published), now).is_ok());
    }

    #[test]
    fn window_bounds_enforced() {
        let now = Utc::now();
        let mut form = form_with_status(FormStatus::Published);

        form.settings.open_at = Some(now + Duration::hours(1));
        let err = check_availability(&form, now).unwrap_err();
        assert!(matches!(
            err,
            EngineError::WindowClosed(ClosedReason::NotYetOpen)
        ));

        form.settings.open_at = None;
        form.settings.close_at = Some(now - Duration::hours(1));
        let err = check_availability(&form, now).unwrap_err();
        assert!(matches!(err, EngineError::WindowClosed(ClosedReason::Closed)));

        form.settings.open_at = Some(now - Duration::hours(1));
        form.settings.close_at = Some(now + Duration::hours(1));
        assert!(check_availability(&form, now).is_ok());
    }

    #[test]
    fn identity_key_normalizes_email() {
        let policy = SubmissionPolicy {
            dedupe_by: vec![DedupeKey::Email],
            one_attempt_per_identity: true,
        };
        let responder = Responder {
            email: Some("Alice@Example.com".into()),
            ..Responder::default()
        };
        assert_eq!(
            identity_key(&policy, Some(&responder)),
            Some("email:alice@example.com".into())
        );
    }

    #[test]
    fn identity_key_student_id_exact() {
        let policy = SubmissionPolicy {
            dedupe_by: vec![DedupeKey::Email, DedupeKey::StudentId],
            one_attempt_per_identity: true,
        };
        let responder = Responder {
            email: Some("a@b.co".into()),
            student_id: Some("S-042".into()),
            ..Responder::default()
        };
        assert_eq!(
            identity_key(&policy, Some(&responder)),
            Some("email:a@b.co|student_id:S-042".into())
        );
    }

    #[test]
    fn identity_key_none_without_attributes() {
        let policy = SubmissionPolicy {
            dedupe_by: vec![DedupeKey::Email],
            one_attempt_per_identity: true,
        };
        assert_eq!(identity_key(&policy, None), None);
        assert_eq!(identity_key(&policy, Some(&Responder::default())), None);
    }

    /// Store stub whose identity index is a fixed set of keys.
    struct StubStore {
        known: Vec<String>,
    }

    #[async_trait]
    impl ResponseStore for StubStore {
        async fn insert(&self, _: &Response) -> Result<(), StoreError> {
            Ok(())
        }
        async fn get(&self, _: Uuid) -> Result<Option<Response>, StoreError> {
            Ok(None)
        }
        async fn delete(&self, _: Uuid) -> Result<(), StoreError> {
            Ok(())
        }
        async fn delete_by_form(&self, _: Uuid) -> Result<u64, StoreError> {
            Ok(0)
        }
        async fn find_by_form(
            &self,
            _: Uuid,
            _: usize,
            _: usize,
        ) -> Result<Vec<Response>, StoreError> {
            Ok(vec![])
        }
        async fn count_by_form(&self, _: Uuid) -> Result<u64, StoreError> {
            Ok(0)
        }
        async fn identity_exists(&self, _: Uuid, key: &str) -> Result<bool, StoreError> {
            Ok(self.known.iter().any(|k| k == key))
        }
    }

    #[tokio::test]
    async fn duplicate_identity_conflicts_case_insensitively() {
        let mut form = form_with_status(FormStatus::Published);
        form.submission_policy = SubmissionPolicy {
            dedupe_by: vec![DedupeKey::Email],
            one_attempt_per_identity: true,
        };
        let store = StubStore {
            known: vec!["email:alice@example.com".into()],
        };

        let responder = Responder {
            email: Some("Alice@Example.com".into()),
            ..Responder::default()
        };
        let err = check_duplicate(&store, &form, Some(&responder))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let other = Responder {
            email: Some("bob@example.com".into()),
            ..Responder::default()
        };
        let key = check_duplicate(&store, &form, Some(&other)).await.unwrap();
        assert_eq!(key, Some("email:bob@example.com".into()));
    }

    #[tokio::test]
    async fn no_policy_means_no_check() {
        let form = form_with_status(FormStatus::Published);
        let store = StubStore {
            known: vec!["email:alice@example.com".into()],
        };
        let responder = Responder {
            email: Some("alice@example.com".into()),
            ..Responder::default()
        };
        let key = check_duplicate(&store, &form, Some(&responder))
            .await
            .unwrap();
        assert_eq!(key, None);
    }
}
