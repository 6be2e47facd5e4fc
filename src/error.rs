use thiserror::Error;

/// Core error taxonomy.
///
/// The REST layer maps these to HTTP status codes per route; the core never
/// decides status codes itself. Messages are human-readable and ride in the
/// `{"error": ...}` response body.
#[derive(Debug, Error)]
pub enum Error {
    /// A lookup by id found nothing.
    #[error("{0}")]
    NotFound(String),

    /// A state-machine precondition was violated (timer already running,
    /// duplicate username on registration, and so on).
    #[error("{0}")]
    InvalidState(String),

    /// Missing/invalid credentials or a failed role check.
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(what: &str, id: &str) -> Self {
        Error::NotFound(format!("{what} not found with id: {id}"))
    }
}
