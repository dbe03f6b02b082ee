//! Automated vs human comparison
//!
//! Both sources are flattened row-major (`t1.on, t1.off, t2.on, ...`) and compared
//! with a Pearson correlation. The two-sided p-value comes from the Student t
//! distribution with `n - 2` degrees of freedom.

use crate::error::ReconcileError;
use crate::types::{round3, ComparisonResult, TrialLookTotals};
use std::f64::consts::PI;

/// Flatten per-trial totals into `[on, off, on, off, ...]`
pub fn flatten(totals: &[TrialLookTotals]) -> Vec<f64> {
    totals.iter().flat_map(|t| t.as_pair()).collect()
}

/// Correlate automated against human per-trial totals.
///
/// Both statistics are reported rounded to 3 decimals; the p-value is computed from
/// the unrounded coefficient.
pub fn compare(
    automated: &[TrialLookTotals],
    human: &[TrialLookTotals],
) -> Result<ComparisonResult, ReconcileError> {
    if automated.len() != human.len() {
        return Err(ReconcileError::TrialCountMismatch {
            automated: automated.len(),
            human: human.len(),
        });
    }

    let xs = flatten(automated);
    let ys = flatten(human);
    let correlation = pearson_correlation(&xs, &ys)?;

    Ok(ComparisonResult {
        correlation: round3(correlation),
        p_value: round3(two_sided_p_value(correlation, xs.len())),
        n: xs.len(),
    })
}

/// Pearson correlation coefficient of two equal-length samples
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Result<f64, ReconcileError> {
    if xs.len() != ys.len() {
        return Err(ReconcileError::DegenerateComparison(format!(
            "sample lengths differ ({} vs {})",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(ReconcileError::DegenerateComparison(format!(
            "need at least 2 paired values, got {}",
            xs.len()
        )));
    }

    let x_mean = mean(xs);
    let y_mean = mean(ys);
    let mut cov = 0.0;
    let mut x_var = 0.0;
    let mut y_var = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let xd = x - x_mean;
        let yd = y - y_mean;
        cov += xd * yd;
        x_var += xd * xd;
        y_var += yd * yd;
    }

    if x_var <= f64::EPSILON || y_var <= f64::EPSILON {
        return Err(ReconcileError::DegenerateComparison(
            "zero variance in one of the sources".to_string(),
        ));
    }

    Ok((cov / (x_var.sqrt() * y_var.sqrt())).clamp(-1.0, 1.0))
}

/// Two-sided p-value for correlation `r` over `n` pairs
pub fn two_sided_p_value(r: f64, n: usize) -> f64 {
    if n <= 2 {
        // Two points always fit a line exactly
        return 1.0;
    }
    let df = (n - 2) as f64;
    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= 0.0 {
        return 0.0;
    }
    let t2 = r * r * df / one_minus_r2;
    regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t2)).clamp(0.0, 1.0)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Regularized incomplete beta function I_x(a, b)
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // The continued fraction converges fastest below the mean of the distribution
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPSILON: f64 = 1e-15;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }

    h
}

fn ln_gamma(z: f64) -> f64 {
    let coeffs = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if z < 0.5 {
        return PI.ln() - (PI * z).sin().ln() - ln_gamma(1.0 - z);
    }
    let z = z - 1.0;
    let mut x = coeffs[0];
    for (i, coeff) in coeffs.iter().enumerate().skip(1) {
        x += coeff / (z + i as f64);
    }
    let t = z + 7.5;
    0.5 * (2.0 * PI).ln() + (z + 0.5) * t.ln() - t + x.ln()
}
