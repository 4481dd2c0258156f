//! Derivative-free minimisation
//!
//! Nelder-Mead downhill simplex, used to estimate model coefficients when the
//! objective is cheap to evaluate but has no convenient gradient.

use crate::{MathError, Result};

/// Outcome of a successful minimisation
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Location of the best vertex
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations used
    pub iterations: usize,
}

/// Nelder-Mead simplex minimiser
#[derive(Debug, Clone)]
pub struct NelderMead {
    max_iterations: usize,
    tolerance: f64,
    initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 4000,
            tolerance: 1e-8,
            initial_step: 0.1,
        }
    }
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Create a minimiser with the given iteration budget and relative tolerance
    pub fn new(max_iterations: usize, tolerance: f64) -> Result<Self> {
        if max_iterations == 0 {
            return Err(MathError::InvalidInput(
                "max_iterations must be greater than zero".to_string(),
            ));
        }
        if !(tolerance > 0.0) {
            return Err(MathError::InvalidInput(
                "tolerance must be positive".to_string(),
            ));
        }

        Ok(Self {
            max_iterations,
            tolerance,
            ..Self::default()
        })
    }

    /// Set the offset used to build the initial simplex around the start point
    pub fn with_initial_step(mut self, step: f64) -> Self {
        self.initial_step = step;
        self
    }

    /// Minimise `objective` starting from `start`
    ///
    /// Non-finite objective values are treated as +infinity so the simplex
    /// moves away from them. Fails if the simplex has not converged within the
    /// iteration budget or if the best value found is not finite.
    pub fn minimize<F>(&self, objective: F, start: &[f64]) -> Result<Minimum>
    where
        F: Fn(&[f64]) -> f64,
    {
        if start.is_empty() {
            return Err(MathError::InvalidInput(
                "Cannot minimise over zero parameters".to_string(),
            ));
        }

        let eval = |x: &[f64]| {
            let v = objective(x);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        let n = start.len();
        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(start.to_vec());
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += if vertex[i] != 0.0 {
                self.initial_step * vertex[i].abs().max(1.0)
            } else {
                self.initial_step
            };
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v.as_slice())).collect();

        for iteration in 0..self.max_iterations {
            order_simplex(&mut simplex, &mut values);

            let best = values[0];
            let worst = values[n];
            if converged(best, worst, self.tolerance) {
                return finish(simplex.swap_remove(0), best, iteration);
            }

            let centroid = centroid(&simplex[..n]);
            let reflected = along(&centroid, &simplex[n], -REFLECTION);
            let reflected_value = eval(reflected.as_slice());

            if reflected_value < best {
                let expanded = along(&centroid, &simplex[n], -EXPANSION);
                let expanded_value = eval(expanded.as_slice());
                if expanded_value < reflected_value {
                    simplex[n] = expanded;
                    values[n] = expanded_value;
                } else {
                    simplex[n] = reflected;
                    values[n] = reflected_value;
                }
                continue;
            }

            if reflected_value < values[n - 1] {
                simplex[n] = reflected;
                values[n] = reflected_value;
                continue;
            }

            // Contract towards the better of the worst vertex and its reflection
            let (toward, toward_value) = if reflected_value < worst {
                (reflected.clone(), reflected_value)
            } else {
                (simplex[n].clone(), worst)
            };
            let contracted = along(&centroid, &toward, CONTRACTION);
            let contracted_value = eval(contracted.as_slice());

            if contracted_value < toward_value {
                simplex[n] = contracted;
                values[n] = contracted_value;
                continue;
            }

            let anchor = simplex[0].clone();
            for i in 1..=n {
                simplex[i] = along(&anchor, &simplex[i], SHRINK);
                values[i] = eval(simplex[i].as_slice());
            }
        }

        order_simplex(&mut simplex, &mut values);
        if converged(values[0], values[n], self.tolerance) {
            return finish(simplex.swap_remove(0), values[0], self.max_iterations);
        }

        Err(MathError::CalculationError(format!(
            "Nelder-Mead did not converge within {} iterations (best objective {})",
            self.max_iterations, values[0]
        )))
    }
}

fn finish(point: Vec<f64>, value: f64, iterations: usize) -> Result<Minimum> {
    if !value.is_finite() {
        return Err(MathError::CalculationError(
            "Objective is not finite at the optimum".to_string(),
        ));
    }

    Ok(Minimum {
        point,
        value,
        iterations,
    })
}

fn converged(best: f64, worst: f64, tolerance: f64) -> bool {
    if !best.is_finite() || !worst.is_finite() {
        return false;
    }
    2.0 * (worst - best).abs() <= tolerance * (best.abs() + worst.abs()) + f64::EPSILON
}

fn order_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    *simplex = indices.iter().map(|&i| simplex[i].clone()).collect();
    *values = indices.iter().map(|&i| values[i]).collect();
}

fn centroid(vertices: &[Vec<f64>]) -> Vec<f64> {
    let n = vertices.len() as f64;
    let dim = vertices[0].len();

    (0..dim)
        .map(|j| vertices.iter().map(|v| v[j]).sum::<f64>() / n)
        .collect()
}

/// `origin + factor * (target - origin)`
fn along(origin: &[f64], target: &[f64], factor: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target.iter())
        .map(|(o, t)| o + factor * (t - o))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimize_quadratic_bowl() {
        let nm = NelderMead::default();
        let min = nm
            .minimize(
                |x| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2) + 1.0,
                &[0.0, 0.0],
            )
            .unwrap();

        assert!((min.point[0] - 3.0).abs() < 1e-3);
        assert!((min.point[1] + 1.0).abs() < 1e-3);
        assert!((min.value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_minimize_rosenbrock() {
        let nm = NelderMead::new(10_000, 1e-12).unwrap();
        let min = nm
            .minimize(
                |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2) + 1.0,
                &[-1.2, 1.0],
            )
            .unwrap();

        assert!((min.point[0] - 1.0).abs() < 1e-2);
        assert!((min.point[1] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_flat_objective_converges_immediately() {
        let min = NelderMead::default().minimize(|_| 0.0, &[0.0; 6]).unwrap();
        assert_eq!(min.iterations, 0);
        assert_eq!(min.point, vec![0.0; 6]);
    }

    #[test]
    fn test_non_finite_objective_is_avoided() {
        let min = NelderMead::default()
            .minimize(
                |x| if x[0] > 0.05 { f64::NAN } else { (x[0] + 2.0).powi(2) + 1.0 },
                &[0.0],
            )
            .unwrap();
        assert!((min.point[0] + 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_everywhere_infinite_fails() {
        let result = NelderMead::new(50, 1e-8)
            .unwrap()
            .minimize(|_| f64::INFINITY, &[0.0, 0.0]);
        assert!(matches!(result, Err(MathError::CalculationError(_))));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(NelderMead::new(0, 1e-8).is_err());
        assert!(NelderMead::new(10, 0.0).is_err());
        assert!(NelderMead::default().minimize(|_| 0.0, &[]).is_err());
    }
}
