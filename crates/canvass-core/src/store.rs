//! Store traits for the document-store collaborator.
//!
//! The engine persists forms and responses through these async traits;
//! `canvass-store` ships the in-memory reference implementation. Unique
//! constraints (form slug, submission identity) are enforced at this
//! layer: the in-process checks in the engine are fast-path only.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Form, Response};

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A storage-level unique constraint rejected the write.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is a unique-constraint rejection the caller may
    /// retry with a different key.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

/// Durable storage for forms.
#[async_trait]
pub trait FormStore: Send + Sync {
    /// Insert a new form. Fails with a unique violation if the slug is
    /// already taken.
    async fn insert(&self, form: &Form) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Form>, StoreError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Form>, StoreError>;

    async fn update(&self, form: &Form) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Form>, StoreError>;

    /// Best-effort existence probe used by the slug allocator.
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError>;
}

/// Durable storage for responses.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Insert a new response. Fails with a unique violation if the
    /// response carries an identity key already stored for its form.
    async fn insert(&self, response: &Response) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Response>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Remove every response belonging to a form. Returns the count.
    async fn delete_by_form(&self, form_id: Uuid) -> Result<u64, StoreError>;

    /// Page through a form's responses, oldest first.
    async fn find_by_form(
        &self,
        form_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Response>, StoreError>;

    async fn count_by_form(&self, form_id: Uuid) -> Result<u64, StoreError>;

    /// Best-effort existence probe used by the dedupe pre-check.
    async fn identity_exists(&self, form_id: Uuid, identity_key: &str)
        -> Result<bool, StoreError>;
}
