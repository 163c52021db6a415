//! Spherical Mercator projection onto the unit square.
//!
//! `x` grows eastward from 0 at -180° to 1 at 180°; `y` grows southward from
//! 0 at the top of the Mercator square to 1 at the bottom. Latitudes past the
//! Mercator limit are clamped.

use std::f64::consts::PI;

pub(crate) fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

pub(crate) fn lat_y(lat: f64) -> f64 {
    let sin = lat.to_radians().sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

pub(crate) fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

pub(crate) fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0).to_radians();
    360.0 * y2.exp().atan() / PI - 90.0
}
