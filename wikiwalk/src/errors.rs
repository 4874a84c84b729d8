use thiserror::Error;

/// Errors raised by the Graph Store. Every variant maps to a failure mode
/// named in the error handling design: precondition violations are
/// surfaced synchronously, storage failures are wrapped from their
/// underlying crate.
#[derive(Debug, Error)]
pub enum GraphStoreError {
    #[error("graph database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("graph database query error: {0}")]
    Storage(#[from] sea_orm::DbErr),

    #[error("invalid title: {0:?}")]
    InvalidTitle(String),

    #[error("invalid page id: {0}")]
    InvalidPageId(u32),
}

/// Errors raised by the Path Solver's public `shortest_paths` operation.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("start page not found: {0:?}")]
    StartPageNotFound(String),

    #[error("target page not found: {0:?}")]
    TargetPageNotFound(String),

    #[error("no path exists between {start:?} and {target:?}")]
    NoPath { start: String, target: String },

    #[error(transparent)]
    Storage(#[from] GraphStoreError),
}
