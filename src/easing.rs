//! Easing curves
//!
//! All curves take progress in [0, 1]. `elastic_out` overshoots past 1
//! before settling, which is what makes a pop-in read.

use std::f64::consts::PI;

/// Maps progress in [0, 1] to an eased value
pub type Easing = fn(f64) -> f64;

pub fn linear(t: f64) -> f64 {
    t
}

/// Cubic ease-in; strictly increasing on [0, 1]
pub fn ease_in_cubic(t: f64) -> f64 {
    t * t * t
}

pub fn ease_out_cubic(t: f64) -> f64 {
    let u = 1.0 - t;
    1.0 - u * u * u
}

/// Elastic overshoot that settles at exactly 1
pub fn elastic_out(t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let period = 0.3;
    let s = period / 4.0;
    2f64.powf(-10.0 * t) * ((t - s) * (2.0 * PI) / period).sin() + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        for ease in [linear as Easing, ease_in_cubic, ease_out_cubic, elastic_out] {
            assert!(ease(0.0).abs() < 1e-9);
            assert!((ease(1.0) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ease_in_monotonic() {
        let mut prev = ease_in_cubic(0.0);
        for i in 1..=1000 {
            let v = ease_in_cubic(i as f64 / 1000.0);
            assert!(v > prev);
            prev = v;
        }
    }

    #[test]
    fn test_pop_in_curve_overshoots() {
        let peak = (0..=100).map(|i| elastic_out(i as f64 / 100.0)).fold(0.0, f64::max);
        assert!(peak > 1.0);
    }
}
