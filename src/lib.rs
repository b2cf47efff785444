pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::HttpCatalogApi;
pub use config::{ApiSettings, TomlConfig};
pub use crate::core::{
    apply_filters, compute_summary, derive_facets, AggregationController, AggregationResult,
    FilterEngine,
};
pub use domain::model::{FilterState, Listing, TargetRef};
pub use domain::ports::CatalogApi;
pub use utils::error::{CatalogError, Result};
