use thiserror::Error;

/// Failures a catalog operation can report.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// Bad rating, link or template
    #[error("{0}")]
    Validation(String),

    /// Unknown url or index
    #[error("{0}")]
    NotFound(String),

    /// Song or template already stored
    #[error("{0}")]
    Duplicate(String),

    /// Catalog file could not be read, parsed or written
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("the catalog has no songs")]
    EmptyCatalog,
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::StorageUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::StorageUnavailable(e.to_string())
    }
}
