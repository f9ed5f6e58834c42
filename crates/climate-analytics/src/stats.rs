//! Statistical primitives: Pearson correlation and simple linear regression,
//! both with two-tailed Student's t p-values.

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{AnalyticsError, Result};

/// Fewest samples either test accepts (`n - 2` degrees of freedom must be positive).
pub const MIN_SAMPLES: usize = 3;

/// Pearson correlation summary. `r` and `p_value` are absent when either
/// variable has zero variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub r: Option<f64>,
    pub p_value: Option<f64>,
    pub n: usize,
}

/// Ordinary least squares fit of `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Absent when `y` is constant.
    pub r_squared: Option<f64>,
    /// p-value of the slope; absent when `y` is constant.
    pub p_value: Option<f64>,
    pub n: usize,
    x_mean: f64,
    y_mean: f64,
}

impl LinearFit {
    /// Fitted value at `x`, evaluated around the sample means.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope.mul_add(x - self.x_mean, self.y_mean)
    }
}

struct Moments {
    n: f64,
    x_mean: f64,
    y_mean: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

#[allow(clippy::cast_precision_loss)]
fn moments(xs: &[f64], ys: &[f64]) -> Moments {
    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    Moments {
        n,
        x_mean,
        y_mean,
        sxx,
        syy,
        sxy,
    }
}

#[allow(clippy::float_cmp)]
fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

fn require_samples(available: usize) -> Result<()> {
    if available < MIN_SAMPLES {
        return Err(AnalyticsError::InsufficientData {
            required: MIN_SAMPLES,
            available,
        });
    }
    Ok(())
}

/// Pearson's r over paired samples.
///
/// # Errors
///
/// [`AnalyticsError::InsufficientData`] below [`MIN_SAMPLES`] pairs.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Result<Correlation> {
    let n = xs.len().min(ys.len());
    require_samples(n)?;
    let (xs, ys) = (&xs[..n], &ys[..n]);

    if is_constant(xs) || is_constant(ys) {
        return Ok(Correlation {
            r: None,
            p_value: None,
            n,
        });
    }

    let m = moments(xs, ys);
    let r = (m.sxy / (m.sxx * m.syy).sqrt()).clamp(-1.0, 1.0);

    Ok(Correlation {
        r: Some(r),
        p_value: r_p_value(r, m.n - 2.0),
        n,
    })
}

/// Least-squares line through `(x, y)` points.
///
/// # Errors
///
/// [`AnalyticsError::InsufficientData`] below [`MIN_SAMPLES`] points or when
/// every point shares one `x`.
pub fn linear_regression(points: &[(f64, f64)]) -> Result<LinearFit> {
    let n = points.len();
    require_samples(n)?;

    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    if is_constant(&xs) {
        return Err(AnalyticsError::InsufficientData {
            required: MIN_SAMPLES,
            available: 1,
        });
    }

    let m = moments(&xs, &ys);
    let slope = m.sxy / m.sxx;
    let intercept = slope.mul_add(-m.x_mean, m.y_mean);

    let (r_squared, p_value) = if is_constant(&ys) {
        (None, None)
    } else {
        let r2 = ((m.sxy * m.sxy) / (m.sxx * m.syy)).clamp(0.0, 1.0);
        (Some(r2), r_p_value(r2.sqrt(), m.n - 2.0))
    };

    Ok(LinearFit {
        slope: if is_constant(&ys) { 0.0 } else { slope },
        intercept: if is_constant(&ys) { m.y_mean } else { intercept },
        r_squared,
        p_value,
        n,
        x_mean: m.x_mean,
        y_mean: m.y_mean,
    })
}

/// Two-tailed p-value of a correlation coefficient via `t = r * sqrt(df / (1 - r^2))`.
///
/// For simple regression this equals the slope t-test.
fn r_p_value(r: f64, df: f64) -> Option<f64> {
    let residual = r.mul_add(-r, 1.0);
    if residual <= 0.0 {
        return Some(0.0);
    }
    let t = r * (df / residual).sqrt();
    two_tailed_p(t, df)
}

/// Two-tailed p-value for a t statistic with `df` degrees of freedom.
#[must_use]
pub fn two_tailed_p(t: f64, df: f64) -> Option<f64> {
    if t.is_nan() {
        return None;
    }
    if t.is_infinite() {
        return Some(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_pearson_known_values() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [2.0, 4.0, 5.0, 4.0, 5.0];
        let c = pearson(&xs, &ys).unwrap();
        assert!((c.r.unwrap() - 0.774_596_669_241_483_4).abs() < EPS);
        assert!((c.p_value.unwrap() - 0.124_03).abs() < 1e-3);
        assert_eq!(c.n, 5);
    }

    #[test]
    fn test_pearson_is_symmetric() {
        let xs = [3.1, 0.4, 7.7, 2.2, 9.0, 4.5];
        let ys = [1.0, 5.5, 2.5, 8.1, 0.3, 4.4];
        let a = pearson(&xs, &ys).unwrap();
        let b = pearson(&ys, &xs).unwrap();
        assert_eq!(a.r, b.r);
        assert_eq!(a.p_value, b.p_value);
    }

    #[test]
    fn test_pearson_perfect_line() {
        let c = pearson(&[1.0, 2.0, 3.0], &[-2.0, -4.0, -6.0]).unwrap();
        assert!((c.r.unwrap() + 1.0).abs() < EPS);
        assert_eq!(c.p_value, Some(0.0));
    }

    #[test]
    fn test_pearson_below_minimum() {
        assert!(matches!(
            pearson(&[1.0, 2.0], &[3.0, 4.0]),
            Err(AnalyticsError::InsufficientData {
                required: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn test_pearson_zero_variance_is_absent() {
        let c = pearson(&[0.1, 0.1, 0.1], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(c.r, None);
        assert_eq!(c.p_value, None);
    }

    #[test]
    fn test_regression_exact_line() {
        let fit = linear_regression(&[(1990.0, 1.0), (2000.0, 2.0), (2010.0, 3.0)]).unwrap();
        assert!((fit.slope - 0.1).abs() < EPS);
        assert!((fit.r_squared.unwrap() - 1.0).abs() < EPS);
        assert_eq!(fit.p_value, Some(0.0));
        assert!((fit.predict(2030.0) - 5.0).abs() < EPS);
        assert!((fit.intercept + 198.0).abs() < 1e-6);
    }

    #[test]
    fn test_regression_noisy_line() {
        let points = [(1.0, 1.1), (2.0, 1.9), (3.0, 3.2), (4.0, 3.9), (5.0, 5.1)];
        let fit = linear_regression(&points).unwrap();
        assert!(fit.r_squared.unwrap() > 0.98);
        assert!(fit.p_value.unwrap() < 0.01);
    }

    #[test]
    fn test_regression_constant_values() {
        let fit = linear_regression(&[(1.0, 4.0), (2.0, 4.0), (3.0, 4.0)]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, None);
        assert_eq!(fit.p_value, None);
        assert!((fit.predict(10.0) - 4.0).abs() < EPS);
    }

    #[test]
    fn test_regression_two_points_rejected() {
        assert!(matches!(
            linear_regression(&[(1.0, 1.0), (2.0, 2.0)]),
            Err(AnalyticsError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_two_tailed_p_bounds() {
        assert!((two_tailed_p(0.0, 5.0).unwrap() - 1.0).abs() < EPS);
        assert_eq!(two_tailed_p(f64::INFINITY, 5.0), Some(0.0));
        assert_eq!(two_tailed_p(f64::NAN, 5.0), None);
    }
}
