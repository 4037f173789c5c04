//! Horizon cost function

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{CostWeights, Layout, StateComponent};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Weighted sum of tracking, speed, effort and smoothness terms over a
/// decision vector.
///
/// The cost is quadratic in the decision variables:
///
/// ```text
///   sum_{k=0..N}   w_cte cte_k^2 + w_epsi epsi_k^2 + w_speed (v_k - v_ref)^2
/// + sum_{k=0..N-1} w_steer delta_k^2 + w_accel a_k^2
/// + sum_{k=0..N-2} w_steer_rate (delta_k+1 - delta_k)^2 + w_accel_rate (a_k+1 - a_k)^2
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostFunction {
    layout: Layout,
    weights: CostWeights,
    ref_speed_ms: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CostFunction {
    pub fn new(layout: Layout, weights: CostWeights, ref_speed_ms: f64) -> Self {
        Self { layout, weights, ref_speed_ms }
    }

    /// Evaluate the cost of the decision vector `z`.
    pub fn evaluate(&self, z: &[f64]) -> f64 {
        let l = &self.layout;
        let w = &self.weights;
        let n = l.horizon();
        let mut cost = 0f64;

        // Tracking and speed regulation
        for k in 0..=n {
            cost += w.cte * z[l.state(StateComponent::Cte, k)].powi(2);
            cost += w.epsi * z[l.state(StateComponent::Epsi, k)].powi(2);
            cost += w.speed * (z[l.state(StateComponent::V, k)] - self.ref_speed_ms).powi(2);
        }

        // Effort
        for k in 0..n {
            cost += w.steer * z[l.steer(k)].powi(2);
            cost += w.accel * z[l.accel(k)].powi(2);
        }

        // Smoothness
        for k in 1..n {
            cost += w.steer_rate * (z[l.steer(k)] - z[l.steer(k - 1)]).powi(2);
            cost += w.accel_rate * (z[l.accel(k)] - z[l.accel(k - 1)]).powi(2);
        }

        cost
    }

    /// Write the gradient of the cost at `z` into `grad`.
    pub fn gradient(&self, z: &[f64], grad: &mut [f64]) {
        let l = &self.layout;
        let w = &self.weights;
        let n = l.horizon();

        grad.iter_mut().for_each(|g| *g = 0.0);

        for k in 0..=n {
            let cte = l.state(StateComponent::Cte, k);
            let epsi = l.state(StateComponent::Epsi, k);
            let v = l.state(StateComponent::V, k);

            grad[cte] += 2.0 * w.cte * z[cte];
            grad[epsi] += 2.0 * w.epsi * z[epsi];
            grad[v] += 2.0 * w.speed * (z[v] - self.ref_speed_ms);
        }

        for k in 0..n {
            grad[l.steer(k)] += 2.0 * w.steer * z[l.steer(k)];
            grad[l.accel(k)] += 2.0 * w.accel * z[l.accel(k)];
        }

        for k in 1..n {
            let d_steer = 2.0 * w.steer_rate * (z[l.steer(k)] - z[l.steer(k - 1)]);
            grad[l.steer(k)] += d_steer;
            grad[l.steer(k - 1)] -= d_steer;

            let d_accel = 2.0 * w.accel_rate * (z[l.accel(k)] - z[l.accel(k - 1)]);
            grad[l.accel(k)] += d_accel;
            grad[l.accel(k - 1)] -= d_accel;
        }
    }
}
