use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::claims::Claims,
    error::{AppError, FieldError},
    tickets::{
        dto::{CreateTicketRequest, UpdateStatusRequest},
        policy,
        repo::TicketStore,
        repo_types::{Category, NewTicket, Ticket, TicketStatus, TicketView},
    },
};

const TICKET_NOT_FOUND: &str = "Ticket not found";

fn required_trimmed(
    value: Option<String>,
    param: &str,
    msg: &str,
    errors: &mut Vec<FieldError>,
) -> String {
    let trimmed = value.as_deref().map(str::trim).unwrap_or_default().to_string();
    if trimmed.is_empty() {
        errors.push(FieldError::new(param, msg));
    }
    trimmed
}

/// Malformed ids cannot name an existing ticket.
fn parse_ticket_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(TICKET_NOT_FOUND.into()))
}

pub async fn create_ticket(
    tickets: &dyn TicketStore,
    caller: &Claims,
    req: CreateTicketRequest,
) -> Result<Ticket, AppError> {
    let mut errors = Vec::new();
    let title = required_trimmed(req.title, "title", "Title is required", &mut errors);
    let description = required_trimmed(
        req.description,
        "description",
        "Description is required",
        &mut errors,
    );
    let category = match req.category.as_deref() {
        None => Category::default(),
        Some(raw) => raw.parse::<Category>().unwrap_or_else(|_| {
            errors.push(FieldError::new("category", "Invalid category"));
            Category::default()
        }),
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let ticket = tickets
        .insert(NewTicket {
            title,
            description,
            category,
            owner_id: caller.user_id,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;
    info!(ticket_id = %ticket.id, user_id = %caller.user_id, category = ticket.category.as_str(), "ticket created");
    Ok(ticket)
}

pub async fn list_tickets(
    tickets: &dyn TicketStore,
    caller: &Claims,
) -> Result<Vec<TicketView>, AppError> {
    let views = if policy::sees_all_tickets(caller) {
        tickets.list_all().await?
    } else {
        tickets
            .list_by_owner(caller.user_id)
            .await?
            .into_iter()
            .map(|ticket| TicketView {
                ticket,
                owner: None,
            })
            .collect()
    };
    info!(role = %caller.role, count = views.len(), "tickets fetched");
    Ok(views)
}

/// Order of checks: role, then input, then existence.
pub async fn update_status(
    tickets: &dyn TicketStore,
    caller: &Claims,
    ticket_id: &str,
    req: UpdateStatusRequest,
) -> Result<Ticket, AppError> {
    if !policy::may_update_status(caller) {
        warn!(user_id = %caller.user_id, ticket_id, "status update by non-admin");
        return Err(AppError::Forbidden("Admin access required".into()));
    }

    let status = req
        .status
        .as_deref()
        .and_then(|s| s.parse::<TicketStatus>().ok())
        .ok_or_else(|| {
            AppError::Validation(vec![FieldError::new("status", "Invalid status value")])
        })?;

    let id = parse_ticket_id(ticket_id)?;
    let ticket = tickets
        .update_status(id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(TICKET_NOT_FOUND.into()))?;
    info!(ticket_id = %ticket.id, status = %ticket.status, "ticket status updated");
    Ok(ticket)
}

pub async fn delete_ticket(
    tickets: &dyn TicketStore,
    caller: &Claims,
    ticket_id: &str,
) -> Result<(), AppError> {
    let id = parse_ticket_id(ticket_id)?;
    let ticket = tickets
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(TICKET_NOT_FOUND.into()))?;

    if !policy::may_delete(caller, &ticket) {
        warn!(user_id = %caller.user_id, ticket_id = %ticket.id, "delete denied");
        return Err(AppError::Forbidden(
            "Not authorized to delete this ticket".into(),
        ));
    }

    // a concurrent delete may have won; the ticket is gone either way
    tickets.delete(ticket.id).await?;
    info!(ticket_id = %ticket.id, user_id = %caller.user_id, "ticket deleted");
    Ok(())
}
