use crate::overpass::{NetworkType, DEFAULT_OVERPASS_URL};
use crate::route::RoutingMode;
use crate::search::DistanceMetric;
use std::time::Duration;

/// Bounds of the radius control, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusSlider {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl Default for RadiusSlider {
    fn default() -> Self {
        Self {
            min: 500.0,
            max: 2000.0,
            step: 100.0,
            default: 1000.0,
        }
    }
}

impl RadiusSlider {
    /// Clamps to the slider range and rounds to the nearest step.
    pub fn snap(&self, radius_m: f64) -> f64 {
        if radius_m.is_nan() {
            return self.default;
        }
        let clamped = radius_m.clamp(self.min, self.max);
        let steps = ((clamped - self.min) / self.step).round();
        (self.min + steps * self.step).min(self.max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub overpass_url: String,
    pub overpass_timeout: Duration,
    pub network_type: NetworkType,
    pub routing: RoutingMode,
    pub metric: DistanceMetric,
    /// Per amenity.
    pub route_timeout: Duration,
    pub walking_speed_kph: f64,
    /// Farthest a point may be from the street network and still be routed.
    pub max_snap_distance_m: f64,
    pub radius: RadiusSlider,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            overpass_timeout: Duration::from_secs(60),
            network_type: NetworkType::Walk,
            routing: RoutingMode::Network,
            metric: DistanceMetric::Haversine,
            route_timeout: Duration::from_secs(10),
            walking_speed_kph: 4.5,
            max_snap_distance_m: 500.0,
            radius: RadiusSlider::default(),
        }
    }
}

impl Settings {
    /// Defaults overridden by `OVERPASS_URL` when set.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = std::env::var("OVERPASS_URL") {
            if !url.trim().is_empty() {
                settings.overpass_url = url;
            }
        }
        settings
    }
}
