use crate::config::Settings;
use crate::finder::AmenityFinder;
use crate::models::{AmenityCategory, Coordinate, SearchRequest};
use crate::presentation;
use crate::route::RoutingMode;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

/// Finds amenities around a point and returns the map layers as GeoJSON
#[pyfunction]
#[pyo3(signature = (lat, lon, radius, amenities = None, routing = "Network".to_string()))]
fn find_amenities(
    lat: f64,
    lon: f64,
    radius: f64,
    amenities: Option<Vec<String>>,
    routing: String,
) -> PyResult<String> {
    let origin =
        Coordinate::new(lat, lon).map_err(|err| PyValueError::new_err(err.to_string()))?;

    let categories = match amenities {
        Some(names) => names
            .iter()
            .map(|name| name.parse::<AmenityCategory>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| PyValueError::new_err(err.to_string()))?,
        None => AmenityCategory::ALL.to_vec(),
    };

    let routing_mode = routing
        .parse::<RoutingMode>()
        .map_err(PyValueError::new_err)?;

    let finder = AmenityFinder::new(Settings {
        routing: routing_mode,
        ..Settings::from_env()
    });
    let request = SearchRequest::new(origin, radius, categories);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
    let result = rt.block_on(finder.search_overpass(&request));
    // don't hold Python up on route resolutions that already timed out
    rt.shutdown_background();
    let result = result.map_err(|err| PyRuntimeError::new_err(err.to_string()))?;

    Ok(presentation::map_layers_string(&result, None))
}

/// Python module for finding nearby amenities
#[pymodule]
fn amenity_finder(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(find_amenities, m)?)?;
    Ok(())
}
