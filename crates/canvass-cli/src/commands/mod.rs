pub mod init;
pub mod insight;
pub mod stats;
pub mod submit;
pub mod validate;

use chrono::Utc;
use uuid::Uuid;

use canvass_core::model::{Form, FormDraft, FormStatus};

/// A form shell for offline commands; the id and slug never leave this
/// process.
pub(crate) fn offline_form(draft: FormDraft) -> Form {
    let now = Utc::now();
    Form {
        id: Uuid::nil(),
        owner_id: "local".into(),
        title: draft.title,
        description: draft.description,
        form_type: draft.form_type,
        slug: "offline".into(),
        fields: draft.fields,
        settings: draft.settings,
        submission_policy: draft.submission_policy,
        status: FormStatus::Published,
        created_at: now,
        updated_at: now,
    }
}
