//! Damped least squares fit of a single exponential decay

// external crates
use log::trace;
use nalgebra::{Matrix2, Vector2};

const MAX_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1e-14;

/// Fit `y = p0 exp(-t / gamma)`, returning `(p0, gamma)`
///
/// Returns `None` when the data cannot constrain a decay, i.e. fewer than
/// two distinct times or a fit that does not decay.
pub(crate) fn fit_exponential(t: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if t.len() < 2 || t.iter().all(|ti| (ti - t[0]).abs() <= f64::EPSILON) {
        return None;
    }

    let mut params = initial_guess(t, y);
    let mut damping = 1e-3;
    let mut cost = sum_of_squares(t, y, &params);

    for iteration in 0..MAX_ITERATIONS {
        let mut jtj = Matrix2::<f64>::zeros();
        let mut jtr = Vector2::<f64>::zeros();

        for (ti, yi) in t.iter().zip(y) {
            let e = (-params[1] * ti).exp();
            let residual = yi - params[0] * e;
            let j = Vector2::new(e, -params[0] * ti * e);
            jtj += j * j.transpose();
            jtr += j * residual;
        }

        let mut a = jtj;
        a[(0, 0)] *= 1.0 + damping;
        a[(1, 1)] *= 1.0 + damping;

        let Some(step) = a.lu().solve(&jtr) else {
            break;
        };

        let trial = params + step;
        let trial_cost = sum_of_squares(t, y, &trial);

        if trial_cost.is_finite() && trial_cost <= cost {
            params = trial;
            cost = trial_cost;
            damping = (damping * 0.1).max(1e-12);
            if step.norm() <= TOLERANCE * (params.norm() + TOLERANCE) {
                trace!("decay fit converged after {} iterations", iteration + 1);
                break;
            }
        } else {
            damping *= 10.0;
            if damping > 1e12 {
                break;
            }
        }
    }

    let (p0, rate) = (params[0], params[1]);
    if rate > 0.0 && rate.is_finite() && p0.is_finite() {
        Some((p0, 1.0 / rate))
    } else {
        None
    }
}

/// Log-linear regression where possible, flat otherwise
fn initial_guess(t: &[f64], y: &[f64]) -> Vector2<f64> {
    let n = t.len() as f64;
    let mean_y = y.iter().sum::<f64>() / n;

    if y.iter().any(|v| *v <= 0.0) {
        return Vector2::new(mean_y, 0.0);
    }

    let ln_y = y.iter().map(|v| v.ln()).collect::<Vec<f64>>();
    let mean_t = t.iter().sum::<f64>() / n;
    let mean_ln = ln_y.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (ti, li) in t.iter().zip(&ln_y) {
        sxy += (ti - mean_t) * (li - mean_ln);
        sxx += (ti - mean_t).powi(2);
    }

    let slope = sxy / sxx;
    Vector2::new((mean_ln - slope * mean_t).exp(), -slope)
}

fn sum_of_squares(t: &[f64], y: &[f64], params: &Vector2<f64>) -> f64 {
    t.iter()
        .zip(y)
        .map(|(ti, yi)| (yi - params[0] * (-params[1] * ti).exp()).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_decay() {
        let t = [0.0, 5.0, 12.0, 30.0, 48.0];
        let y = t.map(|ti: f64| 0.75 * (-ti / 120.0).exp());
        let (p0, gamma) = fit_exponential(&t, &y).unwrap();
        assert!((p0 - 0.75).abs() < 1e-9);
        assert!((gamma - 120.0).abs() < 1e-6);
    }

    #[test]
    fn noisy_data_still_converges() {
        let t = [0.0, 10.0, 20.0, 30.0];
        let y = [0.80, 0.74, 0.69, 0.63];
        let (p0, gamma) = fit_exponential(&t, &y).unwrap();
        assert!(p0 > 0.75 && p0 < 0.85);
        assert!(gamma > 100.0 && gamma < 150.0);
    }

    #[test]
    fn single_time_is_unconstrained() {
        assert!(fit_exponential(&[3.0], &[0.7]).is_none());
        assert!(fit_exponential(&[3.0, 3.0], &[0.7, 0.71]).is_none());
    }

    #[test]
    fn growth_is_not_a_decay() {
        assert!(fit_exponential(&[0.0, 10.0], &[0.5, 0.6]).is_none());
    }
}
