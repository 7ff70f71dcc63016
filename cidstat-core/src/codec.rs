//! # Circular Codec
//!
//! Maps a [`CircularValue`] onto the unit circle and back.
//!
//! The value is read as a signed 64-bit integer before scaling, so the
//! decoded angle lies in `[-π, π)` and matches the `atan2` branch cut used
//! by [`encode`]. Angles close to the 0/max seam stay exact that way, which
//! is where clusters of CIDs usually straddle the wrap.

use std::f64::consts::PI;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// A point on the circle: the full `u64` range is one rotation
pub type CircularValue = u64;

pub const DEG2RAD: f64 = PI / 180.0;
pub const RAD2DEG: f64 = 180.0 / PI;

/// 2^63, half a rotation in CID units
const HALF_TURN: f64 = 9_223_372_036_854_775_808.0;

/// Plain 2D vector used as the intermediate for circular averaging
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitVector2 {
    pub x: f64,
    pub y: f64,
}

impl UnitVector2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Scale to length 1
    ///
    /// Returns `None` when the vector is degenerate (zero or non-finite
    /// length), since no direction can be recovered from it.
    pub fn normalized(&self) -> Option<Self> {
        let length = self.length();
        if length > 0.0 && length.is_finite() {
            Some(Self::new(self.x / length, self.y / length))
        } else {
            None
        }
    }
}

impl Add for UnitVector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for UnitVector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sum for UnitVector2 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Angle of a value in radians, in `[-π, π)`
#[inline]
pub fn to_radians(value: CircularValue) -> f64 {
    (value as i64) as f64 / HALF_TURN * PI
}

/// Angle of a value in degrees, in `[0, 360)`
#[inline]
pub fn to_degrees(value: CircularValue) -> f64 {
    // u64::MAX rounds up to 2^64 as f64
    (value as f64 / HALF_TURN * 180.0) % 360.0
}

/// Value → point on the unit circle
#[inline]
pub fn decode(value: CircularValue) -> UnitVector2 {
    let (sin, cos) = to_radians(value).sin_cos();
    UnitVector2::new(cos, sin)
}

/// Point on the plane → value at the same angle
///
/// Only the angle of `u` matters, its length is ignored. The zero vector
/// and NaN components both encode to 0.
pub fn encode(u: UnitVector2) -> CircularValue {
    let scaled = (u.y.atan2(u.x) / PI * HALF_TURN).round();
    if scaled.is_nan() {
        return 0;
    }
    // atan2 can return exactly +π, which is one past i64::MAX
    if scaled >= HALF_TURN {
        return 1 << 63;
    }
    (scaled as i64) as u64
}

/// Direction of a vector in degrees, always in `[0, 360)`
#[inline]
pub fn direction(u: UnitVector2) -> f64 {
    (u.y.atan2(u.x) * RAD2DEG + 360.0) % 360.0
}

/// Decode every value, preserving order
pub fn batch_decode(values: &[CircularValue]) -> Vec<UnitVector2> {
    values.iter().map(|&v| decode(v)).collect()
}

/// Signed distance walking from `from` to `to` the short way round
///
/// Wrapping subtraction read as two's complement: a result in
/// `[-2^63, 2^63)` that stays correct across the 0/max seam.
#[inline]
pub fn signed_distance(from: CircularValue, to: CircularValue) -> i64 {
    to.wrapping_sub(from) as i64
}

/// Move `base` by a signed distance, wrapping around the ring
#[inline]
pub fn offset(base: CircularValue, distance: i64) -> CircularValue {
    base.wrapping_add_signed(distance)
}
