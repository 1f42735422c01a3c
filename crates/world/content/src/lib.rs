//! Authored world content and the loaders that read it.
//!
//! Templates live in RON, world tuning in TOML:
//! - [`TemplateCatalog`] is the in-memory [`world_core::TemplateStore`]
//! - [`ContentFactory`] loads both files from a data directory
//!
//! Content is immutable once loaded; runtime state never flows back here.

mod catalog;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use catalog::{CatalogError, TemplateCatalog};

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ContentFactory, LoadResult, TemplateFile, TemplateLoader};
