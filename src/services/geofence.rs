// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle proximity checks for check-in geofences.

use geo::{Distance, HaversineMeasure, Point};
use serde::{Deserialize, Serialize};

/// Earth radius used for attendance distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

fn earth() -> HaversineMeasure {
    HaversineMeasure::new(EARTH_RADIUS_METERS)
}

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<GeoPoint> for Point<f64> {
    fn from(p: GeoPoint) -> Self {
        Point::new(p.longitude, p.latitude)
    }
}

/// Haversine distance between two points in meters.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    earth().distance(Point::from(a), Point::from(b))
}

/// True if `point` lies within `radius_meters` of `center` (inclusive).
pub fn is_within(center: GeoPoint, radius_meters: f64, point: GeoPoint) -> bool {
    distance_meters(center, point) <= radius_meters
}
