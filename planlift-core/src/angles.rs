//! Azimuth arithmetic on the circle group.
//!
//! Azimuths are degrees clockwise from true north in [0, 360). They are
//! never compared or averaged as plain reals: distance wraps at north and
//! the mean of 10 and 350 is 0, not 180.

/// Normalise any angle in degrees into [0, 360).
pub fn normalize(deg: f64) -> f64 {
    let r = deg % 360.0;
    if r < 0.0 {
        r + 360.0
    } else {
        r
    }
}

/// Shortest angular distance between two azimuths, in [0, 180].
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (normalize(a) - normalize(b)).abs();
    diff.min(360.0 - diff)
}

/// Circular mean of two azimuths, normalised to [0, 360).
///
/// Each angle becomes a unit vector, the vectors are averaged
/// component-wise, and the result is the direction of the sum. Antipodal
/// inputs have a degenerate sum; the first angle is returned in that case.
pub fn circular_mean(a: f64, b: f64) -> f64 {
    let (sin_a, cos_a) = a.to_radians().sin_cos();
    let (sin_b, cos_b) = b.to_radians().sin_cos();
    let y = (sin_a + sin_b) / 2.0;
    let x = (cos_a + cos_b) / 2.0;
    if y.abs() < 1e-12 && x.abs() < 1e-12 {
        return normalize(a);
    }
    normalize(y.atan2(x).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wraps_negative_and_large_angles() {
        assert_eq!(normalize(-90.0), 270.0);
        assert_eq!(normalize(720.0), 0.0);
        assert_eq!(normalize(359.5), 359.5);
    }

    #[test]
    fn distance_is_symmetric_and_bounded() {
        let cases = [0.0, 1.0, 45.0, 90.0, 179.0, 180.0, 181.0, 270.0, 359.0];
        for &a in &cases {
            for &b in &cases {
                let d1 = angular_distance(a, b);
                let d2 = angular_distance(b, a);
                assert_eq!(d1, d2, "asymmetric for ({a}, {b})");
                assert!((0.0..=180.0).contains(&d1), "out of range for ({a}, {b}): {d1}");
            }
        }
    }

    #[test]
    fn distance_wraps_at_north() {
        assert!((angular_distance(10.0, 350.0) - 20.0).abs() < 1e-9);
        assert!((angular_distance(359.0, 1.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn mean_of_nearby_angles() {
        assert!((circular_mean(20.0, 30.0) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn mean_crosses_north() {
        let m = circular_mean(10.0, 350.0);
        // 0 and 360 are the same point; accept either representation.
        assert!(m < 1e-9 || (360.0 - m) < 1e-9, "expected ~0, got {m}");
    }

    #[test]
    fn mean_of_antipodal_angles_falls_back_to_first() {
        assert_eq!(circular_mean(90.0, 270.0), 90.0);
    }
}
