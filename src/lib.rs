//! Finds amenities around a location and routes to each of them over the
//! OpenStreetMap street network.
//!
//! The flow for one search is: resolve the origin ([`location`]), filter
//! amenity records by radius and category ([`search`]), route to every match
//! ([`route`]), rank the results ([`aggregate`]) and package them as map
//! layers and table rows ([`presentation`]). [`finder::AmenityFinder`] wires
//! these together, fetching amenities and the walking network from Overpass
//! when no static dataset is given.

pub mod aggregate;
pub mod amenities;
pub mod cache;
pub mod config;
pub mod error;
pub mod finder;
pub mod graph;
pub mod location;
pub mod models;
pub mod overpass;
pub mod presentation;
pub mod route;
pub mod search;
pub mod spatial_index;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use aggregate::{SearchEntry, SearchResult};
pub use config::Settings;
pub use error::FinderError;
pub use finder::AmenityFinder;
pub use models::{AmenityCategory, AmenityRecord, Coordinate, Route, SearchRequest};
pub use route::{RouteError, RouteResolver};
