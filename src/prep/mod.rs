//! Pre-engine transformations: dataset preparation, record filters and
//! shock normalization. Everything here runs before the engine is called and
//! keeps the engine's contract narrow.

pub mod dataset;
pub mod filter;
pub mod normalize;

pub use dataset::{RecordSet, RowRejection};
pub use filter::{
    is_special_area, list_commodities, search_countries, RecordFilter, Region,
    MAX_COUNTRY_RESULTS,
};
pub use normalize::{normalize_shock, parse_shock};
