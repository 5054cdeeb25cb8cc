use geo::{Distance, Geodesic, Point};

/// Ellipsoidal (WGS84) surface distance in meters between two
/// `(latitude, longitude)` pairs in decimal degrees.
pub fn geodesic_distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    // geo points are (x, y) = (lon, lat)
    let from = Point::new(from.1, from.0);
    let to = Point::new(to.1, to.0);
    Geodesic::distance(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(geodesic_distance((35.0, 139.0), (35.0, 139.0)), 0.0);
    }

    #[test]
    fn test_one_millidegree_on_equator() {
        // ~111.32 m per millidegree of longitude at the equator on WGS84
        let d = geodesic_distance((0.0, 0.0), (0.0, 0.001));
        assert!((d - 111.319).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_symmetric() {
        let a = (35.6586, 139.7454);
        let b = (35.7101, 139.8107);
        let ab = geodesic_distance(a, b);
        let ba = geodesic_distance(b, a);
        assert!((ab - ba).abs() < 1e-6);
        assert!(ab > 8000.0 && ab < 8500.0, "got {ab}");
    }
}
