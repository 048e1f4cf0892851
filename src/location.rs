use crate::models::{Coordinate, CoordinateError};
use crate::overpass::CLIENT;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Kathmandu, used when a place carries no location.
pub const DEFAULT_ORIGIN: Coordinate = Coordinate::from_trusted(27.7172, 85.3240);

#[derive(Debug, Error)]
pub enum LocationError {
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),
    #[error("Unknown place {0:?}")]
    UnknownPlace(String),
    #[error("Failed to read place catalog: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid place catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to fetch place catalog: {0}")]
    Request(#[from] reqwest::Error),
}

/// What the user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationInput {
    /// Free text in `"lat,lon"` form.
    Manual(String),
    /// Name of a catalog entry.
    Predefined(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    pub name: String,
    /// `"lat,lon"` as listings store it; may be missing.
    #[serde(default)]
    pub location: Option<String>,
    /// Listing page shown next to the results.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PlaceCatalog {
    places: Vec<Place>,
}

impl Default for PlaceCatalog {
    fn default() -> Self {
        Self {
            places: vec![Place {
                name: "Kathmandu".to_string(),
                location: Some(DEFAULT_ORIGIN.to_string()),
                url: None,
            }],
        }
    }
}

impl PlaceCatalog {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LocationError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, LocationError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Downloads a catalog published as JSON.
    pub async fn fetch(url: &str, timeout: Duration) -> Result<Self, LocationError> {
        tracing::debug!(url, "fetching place catalog");
        let body = CLIENT
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Self::from_reader(body.as_bytes())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.places.iter().map(|place| place.name.as_str())
    }

    /// Case-insensitive lookup by name.
    pub fn get(&self, name: &str) -> Option<&Place> {
        self.places
            .iter()
            .find(|place| place.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Listing page of the named place, if it has one.
    pub fn listing_url(&self, name: &str) -> Option<&str> {
        self.get(name)?.url.as_deref()
    }
}

/// Turns the user's choice into an origin coordinate.
///
/// Manual entry must parse and be in range. A catalog place without a
/// location falls back to [`DEFAULT_ORIGIN`]; one with a malformed location
/// is an error.
pub fn resolve_location(
    input: &LocationInput,
    catalog: &PlaceCatalog,
) -> Result<Coordinate, LocationError> {
    match input {
        LocationInput::Manual(text) => Ok(text.parse()?),
        LocationInput::Predefined(name) => {
            let place = catalog
                .get(name)
                .ok_or_else(|| LocationError::UnknownPlace(name.clone()))?;
            match place.location.as_deref() {
                Some(location) => Ok(location.parse()?),
                None => {
                    tracing::warn!(place = %place.name, "place has no location, using default origin");
                    Ok(DEFAULT_ORIGIN)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PlaceCatalog {
        PlaceCatalog::from_reader(
            r#"[
                {"name": "Lazimpat Apartment", "location": "27.7215,85.3203", "url": "https://example.com/1"},
                {"name": "Bhaktapur Plot"},
                {"name": "Broken Listing", "location": "north of the river"}
            ]"#
            .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_manual_entry() {
        let origin = resolve_location(
            &LocationInput::Manual("27.7172,85.3240".into()),
            &PlaceCatalog::default(),
        )
        .unwrap();
        assert_eq!(origin, DEFAULT_ORIGIN);
    }

    #[test]
    fn test_manual_entry_is_validated() {
        let err = resolve_location(
            &LocationInput::Manual("127.7,85.3".into()),
            &PlaceCatalog::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LocationError::InvalidCoordinate(CoordinateError::LatitudeOutOfRange(_))
        ));
        assert_eq!(err.to_string(), "Latitude 127.7 out of range [-90, 90]");
    }

    #[test]
    fn test_predefined_place() {
        let origin = resolve_location(
            &LocationInput::Predefined("lazimpat apartment".into()),
            &catalog(),
        )
        .unwrap();
        assert_eq!(origin, Coordinate::new(27.7215, 85.3203).unwrap());
    }

    #[test]
    fn test_place_without_location_uses_default() {
        let origin =
            resolve_location(&LocationInput::Predefined("Bhaktapur Plot".into()), &catalog())
                .unwrap();
        assert_eq!(origin, DEFAULT_ORIGIN);
    }

    #[test]
    fn test_place_with_bad_location_is_error() {
        let err = resolve_location(&LocationInput::Predefined("Broken Listing".into()), &catalog())
            .unwrap_err();
        assert!(matches!(
            err,
            LocationError::InvalidCoordinate(CoordinateError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_place() {
        let err = resolve_location(&LocationInput::Predefined("Pokhara".into()), &catalog())
            .unwrap_err();
        assert!(matches!(err, LocationError::UnknownPlace(name) if name == "Pokhara"));
    }

    #[test]
    fn test_listing_url() {
        let catalog = catalog();
        assert_eq!(
            catalog.listing_url("Lazimpat Apartment"),
            Some("https://example.com/1")
        );
        assert_eq!(catalog.listing_url("Bhaktapur Plot"), None);
        assert_eq!(catalog.listing_url("Pokhara"), None);
    }

    #[tokio::test]
    async fn test_fetch_catalog() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await.unwrap();
            let body = r#"[{"name": "Patan Flat", "location": "27.6727,85.3240", "url": "https://example.com/patan"}]"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let catalog = PlaceCatalog::fetch(&format!("http://{addr}/places"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Patan Flat"]);
        assert_eq!(catalog.listing_url("patan flat"), Some("https://example.com/patan"));
    }

    #[tokio::test]
    async fn test_fetch_catalog_unreachable() {
        let err = PlaceCatalog::fetch("http://127.0.0.1:9/places", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, LocationError::Request(_)));
    }

    #[test]
    fn test_catalog_names() {
        let catalog = catalog();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["Lazimpat Apartment", "Bhaktapur Plot", "Broken Listing"]);
    }
}
