use crate::models::{AmenityCategory, Coordinate};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

// Define an enum for network types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkType {
    Drive,
    DriveService,
    #[default]
    Walk,
    Bike,
    All,
    AllPrivate,
}

impl NetworkType {
    /// Walking ignores `oneway` restrictions.
    pub fn is_bidirectional(self) -> bool {
        matches!(self, NetworkType::Walk)
    }
}

impl FromStr for NetworkType {
    type Err = OverpassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drive" => Ok(NetworkType::Drive),
            "drive_service" | "driveservice" => Ok(NetworkType::DriveService),
            "walk" => Ok(NetworkType::Walk),
            "bike" => Ok(NetworkType::Bike),
            "all" => Ok(NetworkType::All),
            "all_private" | "allprivate" => Ok(NetworkType::AllPrivate),
            _ => Err(OverpassError::InvalidNetworkType(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum OverpassError {
    #[error("Request Error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Invalid Overpass response: {0}")]
    ParseError(#[from] quick_xml::DeError),
    #[error("Invalid Network Type: {0:?}")]
    InvalidNetworkType(String),
}

// Way filter per network type
pub fn get_osm_filter(network_type: NetworkType) -> &'static str {
    match network_type {
        NetworkType::Drive => {
            "[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"abandoned|bridleway|bus_guideway|construction|corridor|cycleway|elevator|escalator|footway|no|path|pedestrian|planned|platform|proposed|raceway|razed|service|steps|track\"][\"motor_vehicle\"!~\"no\"][\"motorcar\"!~\"no\"][\"service\"!~\"alley|driveway|emergency_access|parking|parking_aisle|private\"]"
        }
        NetworkType::DriveService => {
            "[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"abandoned|bridleway|bus_guideway|construction|corridor|cycleway|elevator|escalator|footway|no|path|pedestrian|planned|platform|proposed|raceway|razed|steps|track\"][\"motor_vehicle\"!~\"no\"][\"motorcar\"!~\"no\"][\"service\"!~\"emergency_access|parking|parking_aisle|private\"]"
        }
        NetworkType::Walk => {
            "[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"abandoned|bus_guideway|construction|cycleway|motor|no|planned|platform|proposed|raceway|razed\"][\"foot\"!~\"no\"][\"service\"!~\"private\"]"
        }
        NetworkType::Bike => {
            "[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"abandoned|bus_guideway|construction|corridor|elevator|escalator|footway|motor|no|planned|platform|proposed|raceway|razed|steps\"][\"bicycle\"!~\"no\"][\"service\"!~\"private\"]"
        }
        NetworkType::All => {
            "[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"abandoned|construction|no|planned|platform|proposed|raceway|razed\"][\"service\"!~\"private\"]"
        }
        NetworkType::AllPrivate => {
            "[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"abandoned|construction|no|planned|platform|proposed|raceway|razed\"]"
        }
    }
}

// Street network query: matching ways plus their nodes
pub fn create_overpass_query(polygon_coord_str: &str, network_type: NetworkType) -> String {
    let filter = get_osm_filter(network_type);
    format!("[out:xml];(way{}({});>;);out;", filter, polygon_coord_str)
}

/// Nodes and ways tagged with one of `categories` within `radius_m` of
/// `origin`, followed by the member nodes of those ways.
pub fn create_amenity_query(
    origin: Coordinate,
    radius_m: f64,
    categories: &BTreeSet<AmenityCategory>,
) -> String {
    let tags = categories
        .iter()
        .map(|category| category.as_tag())
        .collect::<Vec<_>>()
        .join("|");
    let around = format!("around:{:.0},{},{}", radius_m, origin.lat(), origin.lon());

    format!(
        "[out:xml];(node[\"amenity\"~\"^({tags})$\"]({around});way[\"amenity\"~\"^({tags})$\"]({around}););(._;>;);out;"
    )
}

// Reuse a single reqwest::Client for multiple requests
lazy_static::lazy_static! {
    pub(crate) static ref CLIENT: reqwest::Client = reqwest::Client::new();
}

pub async fn make_request(
    url: &str,
    query: &str,
    timeout: Duration,
) -> Result<String, OverpassError> {
    tracing::debug!(url, query, "sending overpass query");
    let response = CLIENT
        .post(url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .timeout(timeout)
        .body(query.to_string())
        .send()
        .await?
        .error_for_status()?;

    Ok(response.text().await?)
}

// Function to construct a bounding box from a single lat/lon pair
pub fn bbox_from_point(origin: Coordinate, dist: f64) -> String {
    const EARTH_RADIUS_M: f64 = 6_371_009.0;

    let (lat, lon) = (origin.lat(), origin.lon());
    let delta_lat = (dist / EARTH_RADIUS_M).to_degrees();
    let delta_lon = (dist / EARTH_RADIUS_M).to_degrees() / lat.to_radians().cos();

    let north = (lat + delta_lat).min(90.0);
    let south = (lat - delta_lat).max(-90.0);
    let east = lon + delta_lon;
    let west = lon - delta_lon;

    // south,west,north,east as Overpass expects
    format!("{},{},{},{}", south, west, north, east)
}
