use crate::{
    error::FitError,
    models::{FittedModel, Sample},
};

/// Fewer usable samples than this and the system is under-determined or
/// noise-dominated for the bias + feature unknowns used here.
const MIN_SAMPLES: usize = 6;

/// Pivot magnitudes at or below this are treated as singular.
const PIVOT_EPS: f64 = 1e-15;

/// Fit an OLS linear model through the normal equations `XᵗX·θ = Xᵗy`.
///
/// The feature dimension comes from the first sample; samples with a
/// mismatched dimension or any non-finite value are silently excluded.
/// Works for any dimension ≥ 1.
pub fn fit_linear_regression(samples: &[Sample]) -> Result<FittedModel, FitError> {
    if samples.len() < MIN_SAMPLES {
        return Err(FitError::InsufficientData);
    }
    let d = samples[0].x.len();
    if d == 0 {
        return Err(FitError::InsufficientData);
    }

    // design size (bias + d features)
    let p = d + 1;
    let mut xtx = vec![vec![0.0f64; p]; p];
    let mut xty = vec![0.0f64; p];

    let mut used = 0usize;
    for s in samples {
        if !is_usable(s, d) {
            continue;
        }

        // row = [1, x1, x2, ...]
        let mut row = Vec::with_capacity(p);
        row.push(1.0);
        row.extend_from_slice(&s.x);

        // Only the upper triangle is accumulated; XᵗX is symmetric.
        for r in 0..p {
            xty[r] += row[r] * s.y;
            for c in r..p {
                xtx[r][c] += row[r] * row[c];
            }
        }
        used += 1;
    }
    if used < MIN_SAMPLES {
        return Err(FitError::InsufficientData);
    }

    // mirror lower triangle
    for r in 0..p {
        for c in 0..r {
            xtx[r][c] = xtx[c][r];
        }
    }

    let theta = solve_linear_system(xtx, xty).ok_or(FitError::SingularSystem)?;

    // training MSE over the same usable set
    let mut sse = 0.0;
    let mut n = 0usize;
    for s in samples {
        if !is_usable(s, d) {
            continue;
        }
        let mut pred = theta[0];
        for j in 0..d {
            pred += theta[j + 1] * s.x[j];
        }
        if !pred.is_finite() {
            continue;
        }
        let err = pred - s.y;
        sse += err * err;
        n += 1;
    }
    if n == 0 {
        return Err(FitError::InsufficientData);
    }

    Ok(FittedModel {
        bias: theta[0],
        weights: theta[1..].to_vec(),
        mse: sse / n as f64,
    })
}

/// Apply a fitted model to a feature vector. `None` on dimension mismatch
/// or any non-finite value; the result is floored at 0 (a fee cannot be
/// negative).
pub fn predict(model: &FittedModel, features: &[f64]) -> Option<f64> {
    if features.len() != model.weights.len() || !model.bias.is_finite() {
        return None;
    }

    let mut v = model.bias;
    for (w, f) in model.weights.iter().zip(features) {
        if !w.is_finite() || !f.is_finite() {
            return None;
        }
        v += w * f;
    }

    if v.is_finite() {
        Some(v.max(0.0))
    } else {
        None
    }
}

fn is_usable(s: &Sample, d: usize) -> bool {
    s.x.len() == d && s.y.is_finite() && s.x.iter().all(|v| v.is_finite())
}

/// Solve `A·x = b` by Gaussian elimination with partial pivoting. `None`
/// when the system is singular at the tolerance or any intermediate value
/// goes non-finite; a non-finite value never passes through as a result.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = a.len();
    if n == 0 || b.len() != n {
        return None;
    }
    for (row, rhs) in a.iter().zip(&b) {
        if row.len() != n || row.iter().any(|v| !v.is_finite()) || !rhs.is_finite() {
            return None;
        }
    }

    for i in 0..n {
        // pivot search: largest magnitude in the current column
        let mut pivot = i;
        let mut max_abs = a[i][i].abs();
        for r in i + 1..n {
            let val = a[r][i].abs();
            if val > max_abs {
                max_abs = val;
                pivot = r;
            }
        }
        if !(max_abs > PIVOT_EPS) || !max_abs.is_finite() {
            return None;
        }

        if pivot != i {
            a.swap(i, pivot);
            b.swap(i, pivot);
        }

        let diag = a[i][i];
        let bi = b[i];
        let (upper, lower) = a.split_at_mut(i + 1);
        let pivot_row = &upper[i];
        for (offset, row) in lower.iter_mut().enumerate() {
            let factor = row[i] / diag;
            if !factor.is_finite() {
                return None;
            }
            row[i] = 0.0;
            for c in i + 1..n {
                row[c] -= factor * pivot_row[c];
            }
            b[i + 1 + offset] -= factor * bi;
        }
    }

    // back substitution
    let mut x = vec![0.0f64; n];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for c in i + 1..n {
            sum -= a[i][c] * x[c];
        }
        let diag = a[i][i];
        if !(diag.abs() > PIVOT_EPS) || !diag.is_finite() {
            return None;
        }
        x[i] = sum / diag;
        if !x[i].is_finite() {
            return None;
        }
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn sample(x: Vec<f64>, y: f64) -> Sample {
        Sample { x, y }
    }

    /// Exact samples of y = 3 + 2·x1 - 1·x2 over a small grid.
    fn grid_samples() -> Vec<Sample> {
        let mut samples = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                let x1 = i as f64;
                let x2 = j as f64;
                samples.push(sample(vec![x1, x2], 3.0 + 2.0 * x1 - x2));
            }
        }
        samples
    }

    #[test]
    fn recovers_exact_linear_function() {
        let model = fit_linear_regression(&grid_samples()).unwrap();

        assert_relative_eq!(model.bias, 3.0, epsilon = 1e-9);
        assert_relative_eq!(model.weights[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(model.weights[1], -1.0, epsilon = 1e-9);
        assert!(model.mse >= 0.0 && model.mse < 1e-15);
    }

    #[test]
    fn solves_simple_square_system() {
        // y = 2 + 3x on x = [0, 1, 2]
        let a = vec![vec![3.0, 3.0], vec![3.0, 5.0]];
        let b = vec![15.0, 21.0];

        let x = solve_linear_system(a, b).unwrap();
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn fits_a_single_feature_model() {
        let samples: Vec<Sample> = (0..8)
            .map(|i| {
                let x = i as f64;
                sample(vec![x], 2.0 + 3.0 * x)
            })
            .collect();

        let model = fit_linear_regression(&samples).unwrap();
        assert_relative_eq!(model.bias, 2.0, epsilon = 1e-9);
        assert_relative_eq!(model.weights[0], 3.0, epsilon = 1e-9);
    }

    #[test]
    fn fewer_than_minimum_samples_is_insufficient() {
        let samples: Vec<Sample> = grid_samples().into_iter().take(5).collect();
        assert_eq!(fit_linear_regression(&samples), Err(FitError::InsufficientData));
        assert_eq!(fit_linear_regression(&[]), Err(FitError::InsufficientData));
    }

    #[test]
    fn non_finite_samples_are_excluded_from_the_fit() {
        let mut samples: Vec<Sample> = grid_samples().into_iter().take(6).collect();
        samples[3] = sample(vec![f64::NAN, 1.0], 4.0);

        assert_eq!(fit_linear_regression(&samples), Err(FitError::InsufficientData));
    }

    #[test]
    fn mismatched_dimension_samples_are_excluded() {
        let mut samples: Vec<Sample> = grid_samples().into_iter().take(6).collect();
        samples[5] = sample(vec![1.0, 2.0, 3.0], 4.0);

        assert_eq!(fit_linear_regression(&samples), Err(FitError::InsufficientData));
    }

    #[test]
    fn collinear_features_are_singular() {
        let samples: Vec<Sample> = (0..10)
            .map(|i| {
                let x1 = i as f64;
                sample(vec![x1, 2.0 * x1], 1.0 + x1)
            })
            .collect();

        assert_eq!(fit_linear_regression(&samples), Err(FitError::SingularSystem));
    }

    #[test]
    fn fit_is_reproducible() {
        let samples = grid_samples();
        let first = fit_linear_regression(&samples).unwrap();
        let second = fit_linear_regression(&samples).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn noisy_fit_recovers_function_within_tolerance() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<Sample> = (0..60)
            .map(|_| {
                let x1 = rng.gen_range(1.0..50.0);
                let x2 = rng.gen_range(0.0..1.0);
                let noise = rng.gen_range(-0.05..0.05);
                sample(vec![x1, x2], 3.0 + 2.0 * x1 - x2 + noise)
            })
            .collect();

        let model = fit_linear_regression(&samples).unwrap();
        assert!(model.mse >= 0.0 && model.mse < 0.01);

        let held_out = predict(&model, &[5.0, 1.0]).unwrap();
        assert!((held_out - 12.0).abs() < 0.5);
    }

    #[test]
    fn predict_rejects_dimension_mismatch() {
        let model = fit_linear_regression(&grid_samples()).unwrap();

        assert_eq!(predict(&model, &[1.0]), None);
        assert_eq!(predict(&model, &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn predict_rejects_non_finite_features() {
        let model = fit_linear_regression(&grid_samples()).unwrap();

        assert_eq!(predict(&model, &[f64::NAN, 1.0]), None);
        assert_eq!(predict(&model, &[f64::INFINITY, 1.0]), None);
    }

    #[test]
    fn predict_floors_at_zero() {
        let model = FittedModel {
            bias: -5.0,
            weights: vec![1.0],
            mse: 0.0,
        };

        assert_eq!(predict(&model, &[1.0]), Some(0.0));
    }
}
