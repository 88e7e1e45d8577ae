// Display formatting for distances and areas.

pub const SQUARE_METERS_PER_SQUARE_KM: f64 = 1_000_000.0;

pub fn format_distance_km(km: f64, decimals: usize) -> String {
    format!("{:.*} km", decimals, km)
}

/// Takes square meters, prints square kilometers.
pub fn format_area_km2(area_m2: f64, decimals: usize) -> String {
    format!("{:.*} km²", decimals, area_m2 / SQUARE_METERS_PER_SQUARE_KM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_requested_precision() {
        assert_eq!(format_distance_km(1.111_95, 2), "1.11 km");
        assert_eq!(format_distance_km(0.0, 2), "0.00 km");
        assert_eq!(format_distance_km(2.4, 0), "2 km");
        assert_eq!(format_area_km2(4_560_000.0, 2), "4.56 km²");
        assert_eq!(format_area_km2(999_999.0, 2), "1.00 km²");
    }
}
