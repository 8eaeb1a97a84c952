//! Contact Service
//!
//! Per-user address book: add, rename, block/unblock, remove, search.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::ContactResponse;
use crate::domain::{Contact, ContactFilter, ContactRepository, User, UserRepository, VirtualNumber};
use crate::shared::error::AppError;
use crate::shared::snowflake::{parse_id, SnowflakeGenerator};

/// Maximum results returned by a contact search
pub const CONTACT_SEARCH_LIMIT: i64 = 20;

/// Shortest accepted contact search term
pub const MIN_SEARCH_TERM: usize = 2;

/// Contact service trait
#[async_trait]
pub trait ContactService: Send + Sync {
    /// Add an identity, given by virtual number or id, to the owner's book
    async fn add(
        &self,
        owner_id: i64,
        target: &str,
        name: Option<String>,
    ) -> Result<ContactResponse, AppError>;

    /// List the owner's contacts ordered by name
    async fn list(
        &self,
        owner_id: i64,
        filter: ContactFilter,
    ) -> Result<Vec<ContactResponse>, AppError>;

    /// Change the display-name override
    async fn rename(
        &self,
        owner_id: i64,
        contact_id: i64,
        name: &str,
    ) -> Result<ContactResponse, AppError>;

    /// Block or unblock an entry
    async fn set_blocked(
        &self,
        owner_id: i64,
        contact_id: i64,
        blocked: bool,
    ) -> Result<ContactResponse, AppError>;

    /// Delete an entry permanently
    async fn remove(&self, owner_id: i64, contact_id: i64) -> Result<(), AppError>;

    /// Name search over unblocked entries
    async fn search(&self, owner_id: i64, term: &str) -> Result<Vec<ContactResponse>, AppError>;
}

/// ContactService implementation
pub struct ContactServiceImpl {
    contacts: Arc<dyn ContactRepository>,
    users: Arc<dyn UserRepository>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl ContactServiceImpl {
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        users: Arc<dyn UserRepository>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            contacts,
            users,
            id_generator,
        }
    }

    async fn resolve_target(&self, target: &str) -> Result<User, AppError> {
        let found = if VirtualNumber::looks_like(target) {
            let number = VirtualNumber::parse(target).ok_or_else(|| {
                AppError::InvalidArgument(format!("Invalid virtual number: {}", target))
            })?;
            self.users.find_by_virtual_number(number.as_str()).await?
        } else {
            self.users.find_by_id(parse_id(target, "user")?).await?
        };

        found.ok_or_else(|| AppError::NotFound(format!("User {} not found", target.trim())))
    }

    /// Load an entry the caller owns.
    async fn owned(&self, owner_id: i64, contact_id: i64) -> Result<Contact, AppError> {
        let contact = self
            .contacts
            .find_by_id(contact_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contact {} not found", contact_id)))?;

        if !contact.is_owned_by(owner_id) {
            return Err(AppError::Forbidden(
                "You can only manage your own contacts".into(),
            ));
        }
        Ok(contact)
    }

    async fn hydrate_one(&self, contact: &Contact) -> Result<ContactResponse, AppError> {
        let target = self
            .users
            .find_by_id(contact.target_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", contact.target_id)))?;
        Ok(ContactResponse::new(contact, &target))
    }

    async fn hydrate(&self, contacts: Vec<Contact>) -> Result<Vec<ContactResponse>, AppError> {
        let ids: Vec<i64> = contacts.iter().map(|c| c.target_id).collect();
        let users = self.users.find_by_ids(&ids).await?;

        Ok(contacts
            .iter()
            .filter_map(|c| {
                users
                    .iter()
                    .find(|u| u.id == c.target_id)
                    .map(|u| ContactResponse::new(c, u))
            })
            .collect())
    }
}

#[async_trait]
impl ContactService for ContactServiceImpl {
    async fn add(
        &self,
        owner_id: i64,
        target: &str,
        name: Option<String>,
    ) -> Result<ContactResponse, AppError> {
        let user = self.resolve_target(target).await?;

        if user.id == owner_id {
            return Err(AppError::InvalidArgument(
                "You cannot add yourself as a contact".into(),
            ));
        }
        if self.contacts.find_by_pair(owner_id, user.id).await?.is_some() {
            return Err(AppError::Conflict("Contact already exists".into()));
        }

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| user.name.clone());

        let now = Utc::now();
        let contact = Contact {
            id: self.id_generator.generate(),
            owner_id,
            target_id: user.id,
            name,
            is_blocked: false,
            created_at: now,
            updated_at: now,
        };

        let created = self.contacts.create(&contact).await?;
        tracing::debug!(owner_id, target_id = user.id, "Contact added");

        Ok(ContactResponse::new(&created, &user))
    }

    async fn list(
        &self,
        owner_id: i64,
        filter: ContactFilter,
    ) -> Result<Vec<ContactResponse>, AppError> {
        let contacts = self.contacts.find_by_owner(owner_id, filter).await?;
        self.hydrate(contacts).await
    }

    async fn rename(
        &self,
        owner_id: i64,
        contact_id: i64,
        name: &str,
    ) -> Result<ContactResponse, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidArgument("Contact name cannot be empty".into()));
        }

        let mut contact = self.owned(owner_id, contact_id).await?;
        contact.name = name.to_string();
        let updated = self.contacts.update(&contact).await?;

        self.hydrate_one(&updated).await
    }

    async fn set_blocked(
        &self,
        owner_id: i64,
        contact_id: i64,
        blocked: bool,
    ) -> Result<ContactResponse, AppError> {
        let mut contact = self.owned(owner_id, contact_id).await?;
        contact.is_blocked = blocked;
        let updated = self.contacts.update(&contact).await?;
        tracing::debug!(owner_id, contact_id, blocked, "Contact block flag changed");

        self.hydrate_one(&updated).await
    }

    async fn remove(&self, owner_id: i64, contact_id: i64) -> Result<(), AppError> {
        self.owned(owner_id, contact_id).await?;

        if !self.contacts.delete(contact_id).await? {
            return Err(AppError::NotFound(format!("Contact {} not found", contact_id)));
        }
        Ok(())
    }

    async fn search(&self, owner_id: i64, term: &str) -> Result<Vec<ContactResponse>, AppError> {
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_TERM {
            return Err(AppError::InvalidArgument(format!(
                "Search term must be at least {} characters",
                MIN_SEARCH_TERM
            )));
        }

        let contacts = self
            .contacts
            .search(owner_id, term, CONTACT_SEARCH_LIMIT)
            .await?;
        self.hydrate(contacts).await
    }
}
