//! Spherical Mercator helpers.
//!
//! Coordinates are kept as `(lon, latp)` in degrees, where `latp` is the
//! Mercator-projected latitude. Planar lengths and areas computed in this
//! space are converted to meters with [`degp_to_meters`].

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Project a WGS84 latitude to Mercator latitude (degrees).
pub fn lat_to_latp(lat: f64) -> f64 {
    let phi = lat.to_radians();
    (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln().to_degrees()
}

/// Inverse of [`lat_to_latp`].
pub fn latp_to_lat(latp: f64) -> f64 {
    (latp.to_radians().exp().atan() * 2.0 - std::f64::consts::FRAC_PI_2).to_degrees()
}

/// Meters covered by `degp` projected degrees at projected latitude `latp`.
pub fn degp_to_meters(degp: f64, latp: f64) -> f64 {
    EARTH_RADIUS_METERS * degp.to_radians() * latp_to_lat(latp).to_radians().cos()
}
