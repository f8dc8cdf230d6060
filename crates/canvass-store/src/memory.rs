//! In-memory store with unique-constraint enforcement.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use canvass_core::model::{Form, Response};
use canvass_core::store::{FormStore, ResponseStore, StoreError};

#[derive(Default)]
struct ResponseTable {
    rows: HashMap<Uuid, Response>,
    /// Backs the unique constraint on (form_id, identity_key).
    identity_index: HashSet<(Uuid, String)>,
}

/// An in-memory document store for forms and responses.
///
/// Check-then-insert races are decided here: inserts take the table's
/// write lock and reject unique-constraint violations atomically, so
/// concurrent submissions from the same identity (or concurrent slug
/// allocations) resolve to exactly one winner.
#[derive(Default)]
pub struct MemoryStore {
    forms: RwLock<HashMap<Uuid, Form>>,
    responses: RwLock<ResponseTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn insert(&self, form: &Form) -> Result<(), StoreError> {
        let mut forms = self.forms.write().unwrap();
        if forms.values().any(|f| f.slug == form.slug) {
            return Err(StoreError::UniqueViolation {
                constraint: "forms.slug".into(),
            });
        }
        forms.insert(form.id, form.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Form>, StoreError> {
        Ok(self.forms.read().unwrap().get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Form>, StoreError> {
        Ok(self
            .forms
            .read()
            .unwrap()
            .values()
            .find(|f| f.slug == slug)
            .cloned())
    }

    async fn update(&self, form: &Form) -> Result<(), StoreError> {
        let mut forms = self.forms.write().unwrap();
        if !forms.contains_key(&form.id) {
            return Err(StoreError::Backend(format!("no such form: {}", form.id)));
        }
        forms.insert(form.id, form.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.forms.write().unwrap().remove(&id);
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Form>, StoreError> {
        let mut forms: Vec<Form> = self
            .forms
            .read()
            .unwrap()
            .values()
            .filter(|f| f.owner_id == owner_id)
            .cloned()
            .collect();
        forms.sort_by_key(|f| f.created_at);
        Ok(forms)
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(self
            .forms
            .read()
            .unwrap()
            .values()
            .any(|f| f.slug == slug))
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn insert(&self, response: &Response) -> Result<(), StoreError> {
        let mut table = self.responses.write().unwrap();
        if let Some(key) = &response.identity_key {
            if !table
                .identity_index
                .insert((response.form_id, key.clone()))
            {
                return Err(StoreError::UniqueViolation {
                    constraint: "responses.identity".into(),
                });
            }
        }
        table.rows.insert(response.id, response.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Response>, StoreError> {
        Ok(self.responses.read().unwrap().rows.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut table = self.responses.write().unwrap();
        if let Some(response) = table.rows.remove(&id) {
            if let Some(key) = response.identity_key {
                table.identity_index.remove(&(response.form_id, key));
            }
        }
        Ok(())
    }

    async fn delete_by_form(&self, form_id: Uuid) -> Result<u64, StoreError> {
        let mut table = self.responses.write().unwrap();
        let before = table.rows.len();
        table.rows.retain(|_, r| r.form_id != form_id);
        table.identity_index.retain(|(fid, _)| *fid != form_id);
        Ok((before - table.rows.len()) as u64)
    }

    async fn find_by_form(
        &self,
        form_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Response>, StoreError> {
        let table = self.responses.read().unwrap();
        let mut matching: Vec<Response> = table
            .rows
            .values()
            .filter(|r| r.form_id == form_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| (r.submitted_at, r.id));
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_by_form(&self, form_id: Uuid) -> Result<u64, StoreError> {
        Ok(self
            .responses
            .read()
            .unwrap()
            .rows
            .values()
            .filter(|r| r.form_id == form_id)
            .count() as u64)
    }

    async fn identity_exists(
        &self,
        form_id: Uuid,
        identity_key: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .responses
            .read()
            .unwrap()
            .identity_index
            .contains(&(form_id, identity_key.to_string())))
    }
}
