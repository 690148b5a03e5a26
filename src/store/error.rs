use thiserror::Error;

/// Typed failures surfaced by history queries.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("encounter {0} not found")]
    NotFound(i64),

    #[error("attempt {attempt_index} of encounter {encounter_id} not found")]
    AttemptNotFound { encounter_id: i64, attempt_index: u32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for QueryError {
    fn from(err: rusqlite::Error) -> Self {
        QueryError::Storage(err.into())
    }
}

impl From<r2d2::Error> for QueryError {
    fn from(err: r2d2::Error) -> Self {
        QueryError::Storage(err.into())
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
