use crate::error::AppError;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AppError> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(AppError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Great-circle distance between two points, haversine formula.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates::new(latitude, longitude).expect("valid test coordinates")
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(matches!(
            Coordinates::new(91.0, 0.0),
            Err(AppError::InvalidCoordinates { .. })
        ));
        assert!(matches!(
            Coordinates::new(0.0, -180.5),
            Err(AppError::InvalidCoordinates { .. })
        ));
        assert!(matches!(
            Coordinates::new(f64::NAN, 0.0),
            Err(AppError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn accepts_boundary_coordinates() {
        assert!(Coordinates::new(-90.0, 180.0).is_ok());
        assert!(Coordinates::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn haversine_is_zero_for_identical_points() {
        let p = coords(-8.0630, -34.8710);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Terminal Central -> Recife airport, roughly 8.7 km apart.
        let origin = coords(-8.0630, -34.8710);
        let destination = coords(-8.1264, -34.9176);

        let distance = haversine_km(origin, destination);

        assert!(distance > 8.5 && distance < 9.0, "got {distance}");
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = coords(-8.0476, -34.8770);
        let b = coords(-8.1196, -34.9010);

        let forward = haversine_km(a, b);
        let backward = haversine_km(b, a);

        assert!((forward - backward).abs() < 1e-9);
    }
}
