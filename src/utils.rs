use crate::models::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (dlat / 2.0).sin().powi(2) + (dlon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c // Distance in meters
}

/// Great-circle distance in meters.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    calculate_distance(a.lat(), a.lon(), b.lat(), b.lon())
}

/// Equirectangular approximation in meters, projected around `origin`.
pub fn planar_m(origin: Coordinate, b: Coordinate) -> f64 {
    // shortest way round, so the antimeridian is not a seam
    let dlon = (b.lon() - origin.lon() + 540.0).rem_euclid(360.0) - 180.0;
    let x = dlon.to_radians() * origin.lat().to_radians().cos();
    let y = (b.lat() - origin.lat()).to_radians();

    EARTH_RADIUS_M * (x * x + y * y).sqrt()
}

pub fn calculate_travel_time(length: f64, speed_kph: f64) -> f64 {
    let speed_m_per_s = speed_kph / 3.6;
    length / speed_m_per_s // Returns time in seconds
}

/// Sum of segment lengths along a path, meters.
pub fn path_length_m(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_m(w[0], w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_haversine_same_point() {
        let point = coord(27.7172, 85.3240);
        assert_eq!(haversine_m(point, point), 0.0);
    }

    #[test]
    fn test_one_millidegree_of_latitude() {
        let d = haversine_m(coord(27.7172, 85.3240), coord(27.7182, 85.3240));
        assert!((d - 111.19).abs() < 0.05, "got {d}");
    }

    #[test]
    fn test_planar_close_to_haversine_at_city_scale() {
        let a = coord(27.7172, 85.3240);
        let b = coord(27.7290, 85.3361);
        let h = haversine_m(a, b);
        let p = planar_m(a, b);
        assert!((h - p).abs() / h < 1e-3, "haversine {h} planar {p}");
    }

    #[test]
    fn test_planar_across_antimeridian() {
        let west = coord(-17.0, 179.999);
        let east = coord(-17.0, -179.999);
        let h = haversine_m(west, east);
        let p = planar_m(west, east);
        assert!((h - 212.7).abs() < 0.5, "haversine {h}");
        assert!((h - p).abs() < 0.01, "haversine {h} planar {p}");
        assert!((planar_m(east, west) - p).abs() < 1e-9);
    }

    #[test]
    fn test_planar_projects_around_origin() {
        let origin = coord(60.0, 10.0);
        let east = coord(61.0, 11.0);
        let dx = 1f64.to_radians() * 60f64.to_radians().cos();
        let dy = 1f64.to_radians();
        let expected = EARTH_RADIUS_M * (dx * dx + dy * dy).sqrt();
        assert!((planar_m(origin, east) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_travel_time() {
        assert!((calculate_travel_time(1000.0, 3.6) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_path_length_empty_and_single() {
        assert_eq!(path_length_m(&[]), 0.0);
        assert_eq!(path_length_m(&[coord(1.0, 1.0)]), 0.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-90.0..=90.0, -180.0..=180.0).prop_map(|(lat, lon)| coord(lat, lon))
        }

        proptest! {
            #[test]
            fn prop_haversine_symmetric(a in valid_coord(), b in valid_coord()) {
                prop_assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-6);
            }

            #[test]
            fn prop_haversine_bounded_by_half_circumference(a in valid_coord(), b in valid_coord()) {
                let d = haversine_m(a, b);
                prop_assert!(d >= 0.0);
                prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_M + 1e-6);
            }
        }
    }
}
