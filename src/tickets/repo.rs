use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::tickets::repo_types::{NewTicket, Ticket, TicketOwner, TicketStatus, TicketView};

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Fails with `MissingOwner` when `owner_id` has no user row.
    async fn insert(&self, ticket: NewTicket) -> Result<Ticket, StoreError>;
    /// Every ticket joined with its owner, newest first.
    async fn list_all(&self) -> Result<Vec<TicketView>, StoreError>;
    /// Tickets of one owner, newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Ticket>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, StoreError>;
    async fn update_status(
        &self,
        id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgTicketStore {
    db: PgPool,
}

impl PgTicketStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(FromRow)]
struct TicketWithOwnerRow {
    #[sqlx(flatten)]
    ticket: Ticket,
    owner_email: Option<String>,
    owner_first_name: Option<String>,
    owner_last_name: Option<String>,
}

impl From<TicketWithOwnerRow> for TicketView {
    fn from(r: TicketWithOwnerRow) -> Self {
        let owner = match (r.owner_email, r.owner_first_name, r.owner_last_name) {
            (Some(email), Some(first_name), Some(last_name)) => Some(TicketOwner {
                email,
                first_name,
                last_name,
            }),
            _ => None,
        };
        Self {
            ticket: r.ticket,
            owner,
        }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn insert(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        // single statement: the owner check and the insert cannot interleave
        let created = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (id, title, description, category, status, owner_id, created_at)
            SELECT $1, $2, $3, $4, $5, u.id, $6
              FROM users u
             WHERE u.id = $7
            RETURNING id, title, description, category, status, owner_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.category.as_str())
        .bind(TicketStatus::Open.as_str())
        .bind(ticket.created_at)
        .bind(ticket.owner_id)
        .fetch_optional(&self.db)
        .await?;
        created.ok_or(StoreError::MissingOwner)
    }

    async fn list_all(&self) -> Result<Vec<TicketView>, StoreError> {
        let rows = sqlx::query_as::<_, TicketWithOwnerRow>(
            r#"
            SELECT t.id, t.title, t.description, t.category, t.status, t.owner_id, t.created_at,
                   u.email AS owner_email,
                   u.first_name AS owner_first_name,
                   u.last_name AS owner_last_name
              FROM tickets t
              LEFT JOIN users u ON u.id = t.owner_id
             ORDER BY t.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(TicketView::from).collect())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Ticket>, StoreError> {
        let rows = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, title, description, category, status, owner_id, created_at
              FROM tickets
             WHERE owner_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, title, description, category, status, owner_id, created_at
              FROM tickets
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
               SET status = $2
             WHERE id = $1
            RETURNING id, title, description, category, status, owner_id, created_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query(r#"DELETE FROM tickets WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
