//! # Statistics Reducer
//!
//! Turns a set of CIDs into circular statistics by summing their unit
//! vectors. Summing is associative, so a group computed from its children's
//! pooled observations agrees with the children; averaging already-averaged
//! directions would not.
//!
//! ## Min / Max on a ring
//!
//! A plain unsigned min/max breaks as soon as a cluster straddles the
//! 0/max seam. Instead every value is measured as a signed distance from
//! the mean, and min/max are the mean moved by the smallest and largest of
//! those distances.

use cidstat_core::codec::{self, CircularValue, UnitVector2, RAD2DEG};
use cidstat_core::{CalcError, CalcResult, DeviceId, Observation, StatisticResult};
use serde::{Deserialize, Serialize};

/// Resultant lengths at or below this have no usable mean direction
pub const DEGENERATE_LENGTH: f64 = 1e-9;

/// Reducer output, everything in a [`StatisticResult`] except identity and counts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircularSummary {
    /// Raw vector sum
    pub sum: UnitVector2,
    /// Normalized sum, zero when degenerate
    pub mean_vector: UnitVector2,
    pub mean_value: CircularValue,
    pub direction: f64,
    pub length: f64,
    pub variance: f64,
    pub std_deviation: Option<f64>,
    pub min: CircularValue,
    pub max: CircularValue,
    /// Number of values reduced
    pub count: usize,
}

impl CircularSummary {
    /// True when the values cancel out and the summary is anchored at zero
    pub fn is_degenerate(&self) -> bool {
        self.length <= DEGENERATE_LENGTH
    }

    /// Attach identity and package counts
    pub fn into_result(self, device_id: DeviceId, iteration: u64, timestamp: f64, package_count: u32, unique_package_count: u32) -> StatisticResult {
        StatisticResult {
            device_id,
            iteration,
            timestamp,
            mean_vector: self.mean_vector,
            mean_value: self.mean_value,
            direction: self.direction,
            length: self.length,
            variance: self.variance,
            std_deviation: self.std_deviation,
            package_count,
            unique_package_count,
            min: self.min,
            max: self.max,
        }
    }
}

/// Sum of the decoded unit vectors
pub fn vector_sum(values: &[CircularValue]) -> UnitVector2 {
    values.iter().map(|&v| codec::decode(v)).sum()
}

/// Angular spread in degrees for a resultant length
///
/// `sqrt(-2·log10(R))·(180/π)`. Not defined for `R ≈ 0`, where this
/// returns `None` instead of taking the log of zero.
pub fn spread_degrees(length: f64) -> Option<f64> {
    if length <= DEGENERATE_LENGTH || !length.is_finite() {
        return None;
    }
    // length is clamped to 1, so the log is never positive
    Some((-2.0 * length.log10()).max(0.0).sqrt() * RAD2DEG)
}

/// Reduce a non-empty set of CIDs
pub fn reduce(values: &[CircularValue]) -> CalcResult<CircularSummary> {
    if values.is_empty() {
        return Err(CalcError::EmptyReduction);
    }

    let sum = vector_sum(values);
    let count = values.len();
    // Floating-point sums can overshoot 1 by an ulp
    let length = (sum.length() / count as f64).min(1.0);

    // Cancelled-out values are anchored at zero instead of at rounding noise
    let anchor = if length <= DEGENERATE_LENGTH { UnitVector2::ZERO } else { sum };
    let mean_value = codec::encode(anchor);

    let (mut lowest, mut highest) = (i64::MAX, i64::MIN);
    for &value in values {
        let d = codec::signed_distance(mean_value, value);
        lowest = lowest.min(d);
        highest = highest.max(d);
    }

    Ok(CircularSummary {
        sum,
        mean_vector: anchor.normalized().unwrap_or(UnitVector2::ZERO),
        mean_value,
        direction: codec::direction(anchor),
        length,
        variance: 1.0 - length,
        std_deviation: spread_degrees(length),
        min: codec::offset(mean_value, lowest),
        max: codec::offset(mean_value, highest),
        count,
    })
}

/// Reduce the values carried by a set of observations
pub fn reduce_observations(observations: &[Observation]) -> CalcResult<CircularSummary> {
    let values: Vec<CircularValue> = observations.iter().map(|o| o.value).collect();
    reduce(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_empty_is_an_error() {
        assert!(matches!(reduce(&[]), Err(CalcError::EmptyReduction)));
    }

    #[test]
    fn test_uniform_input() {
        for v in [0u64, 5, u64::MAX - 4] {
            let s = reduce(&[v, v, v, v]).unwrap();
            assert_eq!(s.mean_value, v);
            assert_eq!(s.min, v);
            assert_eq!(s.max, v);
            assert!((s.length - 1.0).abs() < EPS);
            assert!(s.variance.abs() < EPS);
            assert!(s.std_deviation.unwrap() < 1e-3);
        }
    }

    #[test]
    fn test_uniform_input_anywhere_on_the_ring() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let v: u64 = rng.gen();
            let s = reduce(&[v, v, v]).unwrap();
            // min/max are exact even where the mean carries encoding error
            assert_eq!(s.min, v);
            assert_eq!(s.max, v);
            assert!(codec::signed_distance(v, s.mean_value).unsigned_abs() <= 1 << 14);
            assert!((s.length - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_antipodal_pair_is_degenerate() {
        let s = reduce(&[0, 1 << 63]).unwrap();

        assert!(s.length < 1e-12);
        assert!(s.is_degenerate());
        assert_eq!(s.std_deviation, None);
        assert_eq!(s.mean_vector, UnitVector2::ZERO);
        assert!((s.variance - 1.0).abs() < 1e-12);
        assert_eq!(s.direction, 0.0);
        assert_eq!(s.mean_value, 0);
    }

    #[test]
    fn test_min_max_across_the_seam() {
        let max = u64::MAX;
        let s = reduce(&[max - 2, max - 1, 0, 1]).unwrap();

        assert_eq!(s.min, max - 2);
        assert_eq!(s.max, 1);
        // Mean sits right at the seam
        assert!(codec::signed_distance(0, s.mean_value).abs() <= 1);
    }

    #[test]
    fn test_quarter_spread() {
        let quarter = 1u64 << 62;
        let s = reduce(&[0, quarter]).unwrap();

        assert!((s.direction - 45.0).abs() < 1e-6);
        assert!((s.length - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert_eq!(s.min, 0);
        assert_eq!(s.max, quarter);
        let expected = (-2.0 * s.length.log10()).sqrt() * RAD2DEG;
        assert!((s.std_deviation.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_length_is_clamped() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let base: u64 = rng.gen();
            let values: Vec<u64> = (0..rng.gen_range(1..40)).map(|i| base.wrapping_add(i)).collect();
            let s = reduce(&values).unwrap();
            assert!(s.length <= 1.0);
            assert!(s.variance >= 0.0);
            assert!((0.0..360.0).contains(&s.direction));
        }
    }

    #[test]
    fn test_into_result_carries_counts() {
        let s = reduce(&[10, 20]).unwrap();
        let r = s.clone().into_result(7, 3, 60.0, 5, 2);

        assert_eq!(r.device_id, 7);
        assert_eq!(r.iteration, 3);
        assert_eq!(r.package_count, 5);
        assert_eq!(r.unique_package_count, 2);
        assert_eq!(r.mean_value, s.mean_value);
        assert_eq!(r.min, 10);
        assert_eq!(r.max, 20);
    }

    #[test]
    fn test_spread_degrees_boundaries() {
        assert_eq!(spread_degrees(0.0), None);
        assert_eq!(spread_degrees(DEGENERATE_LENGTH), None);
        assert_eq!(spread_degrees(f64::NAN), None);
        assert_eq!(spread_degrees(1.0), Some(0.0));
    }
}
