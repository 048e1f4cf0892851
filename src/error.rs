use thiserror::Error;

use crate::amenities::DatasetError;
use crate::location::LocationError;
use crate::models::CoordinateError;
use crate::overpass::OverpassError;

#[derive(Debug, Error)]
pub enum FinderError {
    #[error("{0}")]
    Location(#[from] LocationError),
    #[error("Overpass error: {0}")]
    Overpass(#[from] OverpassError),
    #[error("{0}")]
    Dataset(#[from] DatasetError),
}

impl From<CoordinateError> for FinderError {
    fn from(err: CoordinateError) -> Self {
        FinderError::Location(LocationError::InvalidCoordinate(err))
    }
}
