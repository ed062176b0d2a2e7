use crate::RfError;

/// Floating point type used throughout system
pub type Real = f64;

/// Two schedule times closer than this (in seconds) are the same instant.
pub const SCHEDULE_EPSILON: Real = 1e-9;

/// Latest schedule time in seconds, a little under 32 years.
pub const MAX_SCHEDULE_SECONDS: Real = 1e9;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// Absolute comparison of two schedule times in seconds.
pub fn same_instant(a: Real, b: Real) -> bool {
    (a - b).abs() <= SCHEDULE_EPSILON
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, RfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(RfError::NonFinite { what, value: v })
    }
}

/// Finite and no later than [`MAX_SCHEDULE_SECONDS`].
pub fn ensure_schedulable(v: Real, what: &'static str) -> Result<Real, RfError> {
    let v = ensure_finite(v, what)?;
    if v > MAX_SCHEDULE_SECONDS {
        return Err(RfError::TooLate {
            what,
            value: v,
            max: MAX_SCHEDULE_SECONDS,
        });
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn same_instant_uses_absolute_epsilon() {
        assert!(same_instant(300.0, 300.0 + 1e-10));
        assert!(!same_instant(300.0, 300.0 + 1e-6));
        assert!(same_instant(0.1 + 0.2, 0.3));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn schedulable_times_are_bounded() {
        assert_eq!(ensure_schedulable(3600.0, "stop"), Ok(3600.0));
        assert!(matches!(
            ensure_schedulable(1e20, "stop"),
            Err(RfError::TooLate { what: "stop", .. })
        ));
        assert!(matches!(
            ensure_schedulable(Real::INFINITY, "stop"),
            Err(RfError::NonFinite { .. })
        ));
    }
}
