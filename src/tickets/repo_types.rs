use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::ParseEnumError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Bug,
    #[serde(rename = "Feature Request")]
    FeatureRequest,
    #[default]
    Support,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bug => "Bug",
            Category::FeatureRequest => "Feature Request",
            Category::Support => "Support",
        }
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bug" => Ok(Category::Bug),
            "Feature Request" => Ok(Category::FeatureRequest),
            "Support" => Ok(Category::Support),
            other => Err(ParseEnumError {
                kind: "category",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Ticket status. Any admin may move a ticket between any two states;
/// there is no transition graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(TicketStatus::Open),
            "In Progress" => Ok(TicketStatus::InProgress),
            "Closed" => Ok(TicketStatus::Closed),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for TicketStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Ticket record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub category: Category,
    #[sqlx(try_from = "String")]
    pub status: TicketStatus,
    pub owner_id: Uuid, // back-reference for authorization only
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A validated ticket ready to be stored.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub owner_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Public identity of a ticket's owner, shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketOwner {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Listing entry. `owner` is only filled for admin listings.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<TicketOwner>,
}
