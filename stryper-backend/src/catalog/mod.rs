//! Song and template catalog

pub mod error;
pub mod render;
pub mod store;

pub use error::CatalogError;
pub use render::render;
pub use store::{CatalogStore, Collection};
