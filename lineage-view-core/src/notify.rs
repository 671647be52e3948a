//! User-facing notifications for failed lineage operations

use std::fmt;
use tracing::error;

use crate::errors::ApiError;

/// Message shown to the user, rendered in English
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    AddEntityError { entity: String },
    DeleteEntityError { entity: String },
    FetchError { entity: String },
    RemoveEdgePrompt { source: String, target: String },
}

impl Message {
    /// Catalogue key of the message
    pub fn key(&self) -> &'static str {
        match self {
            Message::AddEntityError { .. } => "server.add-entity-error",
            Message::DeleteEntityError { .. } => "server.delete-entity-error",
            Message::FetchError { .. } => "server.entity-fetch-error",
            Message::RemoveEdgePrompt { .. } => "message.remove-edge-between-source-and-target",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::AddEntityError { entity } => write!(f, "Error while adding {}!", entity),
            Message::DeleteEntityError { entity } => {
                write!(f, "Error while deleting {}!", entity)
            }
            Message::FetchError { entity } => write!(f, "Error while fetching {}!", entity),
            Message::RemoveEdgePrompt { source, target } => write!(
                f,
                "Are you sure you want to remove the edge between \"{}\" and \"{}\"?",
                source, target
            ),
        }
    }
}

/// Surfaces a failed operation to the user.
///
/// The server's own message wins over the fallback when the response carried one.
pub trait Notifier: Send + Sync {
    fn error(&self, err: &ApiError, fallback: &Message);
}

/// Text a notifier should display for `err`
pub fn notification_text(err: &ApiError, fallback: &Message) -> String {
    err.server_message().unwrap_or_else(|| fallback.to_string())
}

/// Notifier writing to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, err: &ApiError, fallback: &Message) {
        error!(key = fallback.key(), "{} ({})", notification_text(err, fallback), err);
    }
}
