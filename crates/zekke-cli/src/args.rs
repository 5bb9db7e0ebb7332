use zekke_lib::{Coordinate, MAX_LATITUDE, MAX_LONGITUDE};

/// clap value parser for `LAT,LNG` arguments.
pub fn parse_coordinate(value: &str) -> Result<Coordinate, String> {
    let coordinate: Coordinate = value.parse().map_err(|e: zekke_lib::Error| e.to_string())?;
    if !coordinate.is_within_bounds() {
        return Err(format!(
            "coordinate {coordinate} is outside latitude ±{MAX_LATITUDE} / longitude ±{MAX_LONGITUDE}"
        ));
    }
    Ok(coordinate)
}

/// clap value parser for a radius in meters.
pub fn parse_radius(value: &str) -> Result<f64, String> {
    let radius: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !radius.is_finite() || radius <= 0.0 {
        return Err("radius must be a positive number of meters".to_string());
    }
    Ok(radius)
}
