use thiserror::Error;

/// A source URL could not be fetched.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to fetch {url}: {reason}")]
pub struct FetchError {
    pub url: String,
    pub reason: String,
}

impl FetchError {
    pub fn new(url: &str, reason: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Reading or writing persisted state failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{action}: {reason}")]
pub struct PersistError {
    pub action: &'static str,
    pub reason: String,
}

impl PersistError {
    pub fn new(action: &'static str, err: &anyhow::Error) -> Self {
        Self {
            action,
            reason: format!("{err:#}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl ReconcileError {
    pub(crate) fn source_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "source",
            id: id.to_string(),
        }
    }

    pub(crate) fn channel_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "channel",
            id: id.to_string(),
        }
    }
}
