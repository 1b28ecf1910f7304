//! Integer ambiguity resolution: a sequential bootstrapping estimator
//! (decorrelate via the covariance's Cholesky factor, round conditional
//! on already-fixed components, ratio-test against the next-best
//! candidate) rather than a full integer-least-squares search tree.
use crate::constants::MIN_RATIO;
use nalgebra::{Cholesky, DMatrix, DVector, Dynamic};

type DCholesky = Cholesky<f64, Dynamic>;

/// Float ambiguities (cycles) and their joint covariance, in a fixed
/// order matching the filter's ambiguity state slice.
#[derive(Debug, Clone)]
pub struct FloatAmbiguities {
    pub values: DVector<f64>,
    pub covariance: DMatrix<f64>,
}

#[derive(Debug, Clone)]
pub struct FixResult {
    pub fixed: Vec<i64>,
    pub ratio: f64,
}

/// Rounds `float` to the nearest integer vector, conditioning each
/// component on the ones already fixed (lowest variance first) using the
/// covariance's lower Cholesky factor, and ratio-tests the result against
/// a neighbor found by perturbing the least-certain component by one
/// cycle. Returns `None` if the covariance is not positive definite
/// (filter has not converged enough to attempt a fix).
pub fn resolve(amb: &FloatAmbiguities) -> Option<FixResult> {
    let n = amb.values.len();
    if n == 0 {
        return None;
    }
    let chol = Cholesky::new(amb.covariance.clone())?;
    let l = chol.l();

    // order components by ascending marginal variance: most certain first
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        amb.covariance[(a, a)]
            .partial_cmp(&amb.covariance[(b, b)])
            .unwrap()
    });

    let mut fixed = vec![0i64; n];
    let mut conditioned = amb.values.clone();
    for &i in &order {
        let rounded = conditioned[i].round();
        fixed[i] = rounded as i64;
        let residual = rounded - conditioned[i];
        // propagate the rounding residual to the remaining components
        // through the Cholesky factor's column, approximating the
        // conditional-mean update a full sequential LAMBDA pass performs.
        for &j in &order {
            if j == i {
                continue;
            }
            if l[(j, i)].abs() > 0.0 && l[(i, i)].abs() > 1e-12 {
                conditioned[j] += residual * l[(j, i)] / l[(i, i)];
            }
        }
    }

    let best_norm = mahalanobis(&amb.values, &fixed, &chol);

    // next-best candidate: flip the least-certain fixed component by one
    let &worst = order.last().unwrap();
    let mut alt = fixed.clone();
    alt[worst] += if amb.values[worst] - fixed[worst] as f64 >= 0.0 {
        1
    } else {
        -1
    };
    let alt_norm = mahalanobis(&amb.values, &alt, &chol);

    let ratio = if best_norm < 1e-12 {
        f64::INFINITY
    } else {
        alt_norm / best_norm
    };

    Some(FixResult { fixed, ratio })
}

fn mahalanobis(float: &DVector<f64>, candidate: &[i64], chol: &DCholesky) -> f64 {
    let n = float.len();
    let diff = DVector::from_fn(n, |i, _| float[i] - candidate[i] as f64);
    let solved = chol.solve(&diff);
    diff.dot(&solved)
}

/// Accepts a fix only when the ratio test clears [MIN_RATIO].
pub fn accept(result: &FixResult) -> bool {
    result.ratio >= MIN_RATIO
}

/// PPP ambiguity resolution (uncalibrated phase delays, wide-lane/narrow-
/// lane cascading fixes) is not implemented; PPP solutions are reported
/// at float status. Kept as an explicit entry point so a real
/// implementation slots in without changing the EKF's call site.
pub fn resolve_ppp(_amb: &FloatAmbiguities) -> Option<FixResult> {
    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn well_separated_integers_fix_with_high_ratio() {
        let amb = FloatAmbiguities {
            values: DVector::from_vec(vec![5.02, -3.01]),
            covariance: DMatrix::from_row_slice(2, 2, &[0.01, 0.0, 0.0, 0.01]),
        };
        let result = resolve(&amb).unwrap();
        assert_eq!(result.fixed, vec![5, -3]);
        assert!(accept(&result));
    }

    #[test]
    fn near_half_cycle_ambiguity_has_low_ratio() {
        let amb = FloatAmbiguities {
            values: DVector::from_vec(vec![5.5]),
            covariance: DMatrix::from_row_slice(1, 1, &[0.25]),
        };
        let result = resolve(&amb).unwrap();
        assert!(!accept(&result) || result.ratio < MIN_RATIO * 2.0);
    }

    #[test]
    fn ppp_resolution_is_not_implemented() {
        let amb = FloatAmbiguities {
            values: DVector::from_vec(vec![1.0]),
            covariance: DMatrix::from_row_slice(1, 1, &[0.01]),
        };
        assert!(resolve_ppp(&amb).is_none());
    }
}
