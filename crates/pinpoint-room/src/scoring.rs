//! Distance and scoring: haversine great-circle distance and the
//! exponential score curve.

use pinpoint_protocol::LatLng;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// The best possible round score.
pub const MAX_SCORE: u32 = 1000;

/// Guesses within this many kilometers of the true location score
/// [`MAX_SCORE`] outright.
pub const PERFECT_RADIUS_KM: f64 = 1.0;

/// e-folding distance of the score curve. At 2000 km the score has
/// dropped to ~368; at the antipode (~20000 km) it rounds to 0.
pub const DECAY_KM: f64 = 2000.0;

/// Great-circle distance between two points, in kilometers.
pub fn distance_km(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Score for a guess at the given distance from the true location.
///
/// `MAX_SCORE * e^(-d / DECAY_KM)`, rounded to the nearest point, with a
/// perfect-score floor inside [`PERFECT_RADIUS_KM`].
pub fn score_for_distance(distance_km: f64) -> u32 {
    if distance_km <= PERFECT_RADIUS_KM {
        return MAX_SCORE;
    }
    (f64::from(MAX_SCORE) * (-distance_km / DECAY_KM).exp()).round() as u32
}
