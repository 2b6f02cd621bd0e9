use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    state::AppState,
    tickets::{
        dto::{CreateTicketRequest, MessageResponse, UpdateStatusRequest},
        repo_types::{Ticket, TicketView},
        services,
    },
};

pub fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/:id", put(update_status).delete(delete_ticket))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_ticket(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Ticket>), AppError> {
    let Json(payload) = payload?;
    let ticket = services::create_ticket(state.tickets.as_ref(), &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[instrument(skip(state, caller))]
pub async fn list_tickets(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<TicketView>>, AppError> {
    let tickets = services::list_tickets(state.tickets.as_ref(), &caller).await?;
    Ok(Json(tickets))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Ticket>, AppError> {
    // authorization runs before a bad body is reported
    let payload = match payload {
        Ok(Json(p)) => p,
        Err(_) if !caller.is_admin() => UpdateStatusRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let ticket = services::update_status(state.tickets.as_ref(), &caller, &id, payload).await?;
    Ok(Json(ticket))
}

#[instrument(skip(state, caller))]
pub async fn delete_ticket(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete_ticket(state.tickets.as_ref(), &caller, &id).await?;
    Ok(Json(MessageResponse {
        msg: "Ticket deleted",
    }))
}
