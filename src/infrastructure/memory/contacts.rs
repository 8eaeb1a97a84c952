use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::{Contact, ContactFilter, ContactRepository};
use crate::shared::error::AppError;

/// In-process contact store.
#[derive(Default)]
pub struct MemoryContactRepository {
    contacts: RwLock<HashMap<i64, Contact>>,
}

impl MemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_by_name(contacts: &mut [Contact]) {
    contacts.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.id.cmp(&b.id))
    });
}

#[async_trait]
impl ContactRepository for MemoryContactRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Contact>, AppError> {
        Ok(self.contacts.read().get(&id).cloned())
    }

    async fn find_by_pair(
        &self,
        owner_id: i64,
        target_id: i64,
    ) -> Result<Option<Contact>, AppError> {
        Ok(self
            .contacts
            .read()
            .values()
            .find(|c| c.owner_id == owner_id && c.target_id == target_id)
            .cloned())
    }

    async fn find_by_owner(
        &self,
        owner_id: i64,
        filter: ContactFilter,
    ) -> Result<Vec<Contact>, AppError> {
        let mut found: Vec<Contact> = self
            .contacts
            .read()
            .values()
            .filter(|c| c.owner_id == owner_id && filter.accepts(c))
            .cloned()
            .collect();
        sort_by_name(&mut found);
        Ok(found)
    }

    async fn create(&self, contact: &Contact) -> Result<Contact, AppError> {
        let mut contacts = self.contacts.write();
        if contacts
            .values()
            .any(|c| c.owner_id == contact.owner_id && c.target_id == contact.target_id)
        {
            return Err(AppError::Conflict("Contact already exists".to_string()));
        }
        contacts.insert(contact.id, contact.clone());
        Ok(contact.clone())
    }

    async fn update(&self, contact: &Contact) -> Result<Contact, AppError> {
        let mut contacts = self.contacts.write();
        let stored = contacts
            .get_mut(&contact.id)
            .ok_or_else(|| AppError::NotFound("Contact not found".to_string()))?;
        stored.name = contact.name.clone();
        stored.is_blocked = contact.is_blocked;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.contacts.write().remove(&id).is_some())
    }

    async fn search(
        &self,
        owner_id: i64,
        term: &str,
        limit: i64,
    ) -> Result<Vec<Contact>, AppError> {
        let term = term.to_lowercase();
        let mut found: Vec<Contact> = self
            .contacts
            .read()
            .values()
            .filter(|c| {
                c.owner_id == owner_id && !c.is_blocked && c.name.to_lowercase().contains(&term)
            })
            .cloned()
            .collect();
        sort_by_name(&mut found);
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }
}
