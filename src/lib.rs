//! City directory service: a read-only city catalog, per-account saved cities
//! and marker colors, catalog filters, and world map rendering.

pub mod account_store;
pub mod basemap;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod renderer;
pub mod seed;
pub mod server;

pub use catalog::Catalog;
pub use error::DirectoryError;
pub use models::{AccountId, City, MarkerColor, RenderKind};
