//! One-dimensional search: bounded Brent minimization, plus grid helpers.

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};

/// Outcome of a bounded scalar minimization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinimizeResult {
    pub x: f64,
    pub value: f64,
    pub evaluations: usize,
    pub converged: bool,
}

/// Bounded minimization of `f` on `[lower, upper]` by Brent's method
/// (golden-section steps with parabolic interpolation).
///
/// Non-finite objective values are tolerated: they simply lose every
/// comparison, so `f64::INFINITY` marks a candidate as unusable.
/// `converged` is false when the evaluation budget runs out or the
/// search ends on NaN.
pub fn minimize_bounded<F>(
    f: F,
    lower: f64,
    upper: f64,
    xatol: f64,
    max_evaluations: usize,
) -> Result<MinimizeResult>
where
    F: Fn(f64) -> f64,
{
    if !(lower.is_finite() && upper.is_finite()) || lower >= upper {
        return Err(CalibrationError::InvalidBounds { min: lower, max: upper });
    }

    let sqrt_eps = (2.2e-16_f64).sqrt();
    let golden_mean = 0.5 * (3.0 - 5.0_f64.sqrt());

    let (mut a, mut b) = (lower, upper);
    let mut fulc = a + golden_mean * (b - a);
    let mut nfc = fulc;
    let mut xf = fulc;
    let mut rat = 0.0_f64;
    let mut e = 0.0_f64;
    let mut fx = f(xf);
    let mut evaluations = 1;
    let mut fu = f64::INFINITY;
    let mut ffulc = fx;
    let mut fnfc = fx;
    let mut xm = 0.5 * (a + b);
    let mut tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
    let mut tol2 = 2.0 * tol1;
    let mut budget_exhausted = false;

    while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
        let mut golden = true;

        // Try a parabolic fit through the three best points
        if e.abs() > tol1 {
            golden = false;
            let mut r = (xf - nfc) * (fx - ffulc);
            let mut q = (xf - fulc) * (fx - fnfc);
            let mut p = (xf - fulc) * q - (xf - nfc) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            r = e;
            e = rat;

            let acceptable = p.is_finite()
                && q.is_finite()
                && p.abs() < (0.5 * q * r).abs()
                && p > q * (a - xf)
                && p < q * (b - xf);

            if acceptable {
                rat = p / q;
                let x = xf + rat;
                if (x - a) < tol2 || (b - x) < tol2 {
                    let si = if xm - xf >= 0.0 { 1.0 } else { -1.0 };
                    rat = tol1 * si;
                }
            } else {
                golden = true;
            }
        }

        if golden {
            e = if xf >= xm { a - xf } else { b - xf };
            rat = golden_mean * e;
        }

        let si = if rat >= 0.0 { 1.0 } else { -1.0 };
        let x = xf + si * rat.abs().max(tol1);
        fu = f(x);
        evaluations += 1;

        if fu <= fx {
            if x >= xf {
                a = xf;
            } else {
                b = xf;
            }
            fulc = nfc;
            ffulc = fnfc;
            nfc = xf;
            fnfc = fx;
            xf = x;
            fx = fu;
        } else {
            if x < xf {
                a = x;
            } else {
                b = x;
            }
            if fu <= fnfc || nfc == xf {
                fulc = nfc;
                ffulc = fnfc;
                nfc = x;
                fnfc = fu;
            } else if fu <= ffulc || fulc == xf || fulc == nfc {
                fulc = x;
                ffulc = fu;
            }
        }

        xm = 0.5 * (a + b);
        tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
        tol2 = 2.0 * tol1;

        if evaluations >= max_evaluations {
            budget_exhausted = true;
            break;
        }
    }

    let converged = !budget_exhausted && !(xf.is_nan() || fx.is_nan() || fu.is_nan());

    Ok(MinimizeResult {
        x: xf,
        value: fx,
        evaluations,
        converged,
    })
}

/// `samples` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimize_parabola() {
        let result = minimize_bounded(|x| (x - 1.3).powi(2) + 2.0, 0.0, 5.0, 1e-10, 500).unwrap();
        assert!(result.converged);
        assert!((result.x - 1.3).abs() < 1e-6);
        assert!((result.value - 2.0).abs() < 1e-10);
        assert!(result.evaluations < 50);
    }

    #[test]
    fn test_minimize_at_bound() {
        // Monotonic: the minimum sits against the lower bound
        let result = minimize_bounded(|x| x, 2.0, 3.0, 1e-8, 500).unwrap();
        assert!(result.converged);
        assert!((result.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_minimize_routes_around_infinity() {
        let f = |x: f64| if x < 0.4 { f64::INFINITY } else { (x - 0.7).powi(2) };
        let result = minimize_bounded(f, 0.0, 1.0, 1e-9, 500).unwrap();
        assert!((result.x - 0.7).abs() < 1e-5);
        assert!(result.value.is_finite());
    }

    #[test]
    fn test_minimize_reports_exhausted_budget() {
        let result = minimize_bounded(|x| (x - 0.123).powi(2), 0.0, 1.0, 1e-14, 3).unwrap();
        assert!(!result.converged);
        assert_eq!(result.evaluations, 3);
    }

    #[test]
    fn test_minimize_rejects_bad_bounds() {
        assert!(minimize_bounded(|x| x, 1.0, 1.0, 1e-8, 10).is_err());
        assert!(minimize_bounded(|x| x, 2.0, 1.0, 1e-8, 10).is_err());
        assert!(minimize_bounded(|x| x, f64::NAN, 1.0, 1e-8, 10).is_err());
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 0), Vec::<f64>::new());
        assert_eq!(linspace(0.5, 1.0, 1), vec![0.5]);
        let values = linspace(0.005, 0.03, 300);
        assert_eq!(values.len(), 300);
        assert_eq!(values[0], 0.005);
        assert_eq!(values[299], 0.03);
        assert!(values.windows(2).all(|w| w[1] > w[0]));
    }
}
