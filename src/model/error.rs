use thiserror::Error;

/// Domain errors surfaced by the resolution, propagation and association
/// entry points. Store failures arrive wrapped as `Storage`; the unit of
/// work they interrupted has already been rolled back.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("bad request: {0}")]
    InvalidRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
