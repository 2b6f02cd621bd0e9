use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    error::StoreError,
    tickets::{
        repo::TicketStore,
        repo_types::{NewTicket, Ticket, TicketOwner, TicketStatus, TicketView},
    },
};

/// In-process stand-in for Postgres. One lock covers every operation, so
/// each call is atomic just like a single SQL statement.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    tickets: Vec<Ticket>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admin_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.users.iter().filter(|u| u.role.is_admin()).count()
    }
}

fn newest_first(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn admin_exists(&self) -> Result<bool, StoreError> {
        Ok(self.admin_count() > 0)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        if user.role.is_admin() && inner.users.iter().any(|u| u.role.is_admin()) {
            return Err(StoreError::AdminExists);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.users.iter().any(|u| u.id == ticket.owner_id) {
            return Err(StoreError::MissingOwner);
        }
        let created = Ticket {
            id: Uuid::new_v4(),
            title: ticket.title,
            description: ticket.description,
            category: ticket.category,
            status: TicketStatus::Open,
            owner_id: ticket.owner_id,
            created_at: ticket.created_at,
        };
        inner.tickets.push(created.clone());
        Ok(created)
    }

    async fn list_all(&self) -> Result<Vec<TicketView>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut tickets = inner.tickets.clone();
        newest_first(&mut tickets);
        Ok(tickets
            .into_iter()
            .map(|ticket| {
                let owner = inner
                    .users
                    .iter()
                    .find(|u| u.id == ticket.owner_id)
                    .map(|u| TicketOwner {
                        email: u.email.clone(),
                        first_name: u.first_name.clone(),
                        last_name: u.last_name.clone(),
                    });
                TicketView { ticket, owner }
            })
            .collect())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Ticket>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut tickets);
        Ok(tickets)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.tickets.iter_mut().find(|t| t.id == id).map(|t| {
            t.status = status;
            t.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tickets.len();
        inner.tickets.retain(|t| t.id != id);
        Ok(inner.tickets.len() < before)
    }
}
