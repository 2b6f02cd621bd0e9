//! Per-operation authorization rules. Each predicate answers one question
//! about one caller and, where relevant, one ticket.

use crate::{auth::claims::Claims, tickets::repo_types::Ticket};

/// Admins see every ticket; everyone else only their own.
pub fn sees_all_tickets(caller: &Claims) -> bool {
    caller.is_admin()
}

/// Role-only rule: status changes are reserved to the admin.
pub fn may_update_status(caller: &Claims) -> bool {
    caller.is_admin()
}

/// Role-or-ownership rule.
pub fn may_delete(caller: &Claims, ticket: &Ticket) -> bool {
    caller.is_admin() || ticket.owner_id == caller.user_id
}
