pub mod aggregation;
pub mod facets;
pub mod filter;
pub mod ratings;
pub mod submissions;

pub use crate::domain::model::{FilterState, Listing, RatingDistribution, RatingEntry, TargetRef};
pub use crate::domain::ports::{CatalogApi, ConfigProvider};
pub use crate::utils::error::Result;
pub use aggregation::{AggregationController, AggregationResult, Organizer, Phase};
pub use facets::{derive_facets, DerivedFacets, FacetDimension, FacetMemo};
pub use filter::{apply_filters, FilterEngine};
pub use ratings::{compute_summary, RatingSummary};
