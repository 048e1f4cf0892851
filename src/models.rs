use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Expected a location as \"latitude,longitude\", got {0:?}")]
    Malformed(String),
}

/// A validated WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lon)
    }
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Skips range checks. Only for positions that were validated on the way
    /// into the street graph.
    pub(crate) const fn from_trusted(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Parses manual entry of the form `"27.7172, 85.3240"`.
impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CoordinateError::Malformed(s.to_string());
        let (lat, lon) = s.split_once(',').ok_or_else(malformed)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| malformed())?;
        let lon = lon.trim().parse::<f64>().map_err(|_| malformed())?;
        Coordinate::new(lat, lon)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown amenity category {0:?}")]
pub struct UnknownCategory(pub String);

/// Values of the OSM `amenity` tag the finder knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmenityCategory {
    Hospital,
    School,
    Pharmacy,
    Atm,
    Restaurant,
    Hotel,
    College,
    Police,
    Gym,
    BusStation,
    Supermarket,
}

impl AmenityCategory {
    pub const ALL: [AmenityCategory; 11] = [
        AmenityCategory::Hospital,
        AmenityCategory::School,
        AmenityCategory::Pharmacy,
        AmenityCategory::Atm,
        AmenityCategory::Restaurant,
        AmenityCategory::Hotel,
        AmenityCategory::College,
        AmenityCategory::Police,
        AmenityCategory::Gym,
        AmenityCategory::BusStation,
        AmenityCategory::Supermarket,
    ];

    /// The OSM tag value, e.g. `bus_station`.
    pub fn as_tag(self) -> &'static str {
        match self {
            AmenityCategory::Hospital => "hospital",
            AmenityCategory::School => "school",
            AmenityCategory::Pharmacy => "pharmacy",
            AmenityCategory::Atm => "atm",
            AmenityCategory::Restaurant => "restaurant",
            AmenityCategory::Hotel => "hotel",
            AmenityCategory::College => "college",
            AmenityCategory::Police => "police",
            AmenityCategory::Gym => "gym",
            AmenityCategory::BusStation => "bus_station",
            AmenityCategory::Supermarket => "supermarket",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AmenityCategory::Hospital => "Hospital",
            AmenityCategory::School => "School",
            AmenityCategory::Pharmacy => "Pharmacy",
            AmenityCategory::Atm => "Atm",
            AmenityCategory::Restaurant => "Restaurant",
            AmenityCategory::Hotel => "Hotel",
            AmenityCategory::College => "College",
            AmenityCategory::Police => "Police",
            AmenityCategory::Gym => "Gym",
            AmenityCategory::BusStation => "Bus station",
            AmenityCategory::Supermarket => "Supermarket",
        }
    }

    /// Marker and route color on the map.
    pub fn marker_color(self) -> &'static str {
        match self {
            AmenityCategory::Hospital => "red",
            AmenityCategory::School => "blue",
            AmenityCategory::Pharmacy => "green",
            AmenityCategory::Atm => "orange",
            AmenityCategory::Restaurant => "purple",
            AmenityCategory::Hotel => "darkblue",
            AmenityCategory::College => "cadetblue",
            AmenityCategory::Police => "darkred",
            AmenityCategory::Gym => "lightgreen",
            AmenityCategory::BusStation => "darkgreen",
            AmenityCategory::Supermarket => "lightblue",
        }
    }
}

impl fmt::Display for AmenityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for AmenityCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        AmenityCategory::ALL
            .into_iter()
            .find(|category| category.as_tag() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmenityRecord {
    pub id: i64,
    pub category: AmenityCategory,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub name: Option<String>,
}

impl AmenityRecord {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub origin: Coordinate,
    /// Meters.
    pub radius_m: f64,
    pub categories: BTreeSet<AmenityCategory>,
}

impl SearchRequest {
    pub fn new(
        origin: Coordinate,
        radius_m: f64,
        categories: impl IntoIterator<Item = AmenityCategory>,
    ) -> Self {
        Self {
            origin,
            radius_m,
            categories: categories.into_iter().collect(),
        }
    }

    /// True when the request can never match anything.
    pub fn is_vacuous(&self) -> bool {
        self.categories.is_empty() || !(self.radius_m > 0.0)
    }
}

/// A path from an origin to an amenity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub path: Vec<Coordinate>,
    pub length_m: f64,
    pub duration_s: f64,
}
