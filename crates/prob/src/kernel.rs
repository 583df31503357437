//! Markov kernels (stochastic maps) between finite sets.

use tracing::debug;

use crate::dist::Dist;
use crate::error::ProbError;
use crate::PROB_TOLERANCE;

/// A Markov kernel (stochastic map) from a finite set X to a finite set Y.
///
/// Represented as a row-stochastic matrix where:
/// - `k[i][j]` = P(output = j | input = i)
/// - Each row sums to 1
///
/// # Example
///
/// ```rust
/// use dungeon_prob::{Kernel, Dist};
///
/// // A portal pair: each end sends you to the other
/// let portals = Kernel::new(vec![
///     vec![0.0, 1.0],
///     vec![1.0, 0.0],
/// ]).unwrap();
///
/// let here = Dist::point(2, 0);
/// let there = portals.apply(&here).unwrap();
/// assert!((there.p[1] - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    /// Row-stochastic matrix: `k[i][j]` = P(output=j | input=i)
    pub k: Vec<Vec<f64>>,
    /// Number of input states
    pub n_inputs: usize,
    /// Number of output states
    pub n_outputs: usize,
}

/// Outcome of iterating a kernel towards a fixed point.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedPoint {
    /// Last distribution computed.
    pub dist: Dist,
    /// Number of kernel applications performed.
    pub iterations: usize,
    /// Whether successive iterates came within tolerance before the cap.
    pub converged: bool,
}

impl Kernel {
    /// Create a new kernel from a row-stochastic matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The matrix is empty
    /// - Rows have different lengths
    /// - Any row doesn't sum to 1 (within tolerance)
    pub fn new(k: Vec<Vec<f64>>) -> Result<Self, ProbError> {
        if k.is_empty() {
            return Err(ProbError::EmptyKernel);
        }

        let n_inputs = k.len();
        let n_outputs = k[0].len();

        if n_outputs == 0 {
            return Err(ProbError::EmptyKernel);
        }

        for (i, row) in k.iter().enumerate() {
            if row.len() != n_outputs {
                return Err(ProbError::RaggedMatrix);
            }

            if row.iter().any(|&x| x < -PROB_TOLERANCE) {
                return Err(ProbError::NegativeProbability);
            }

            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > PROB_TOLERANCE {
                return Err(ProbError::RowNotNormalized { row: i, sum });
            }
        }

        Ok(Self {
            k,
            n_inputs,
            n_outputs,
        })
    }

    /// Build a kernel from one distribution per input.
    pub fn from_rows(rows: Vec<Dist>) -> Result<Self, ProbError> {
        Self::new(rows.into_iter().map(|d| d.p).collect())
    }

    /// Apply the kernel to a distribution.
    ///
    /// `K(p)[j] = Σᵢ p[i] · K[i,j]`
    ///
    /// Inputs with zero mass are skipped, so sparse distributions are cheap.
    ///
    /// # Errors
    ///
    /// Returns an error if the distribution size doesn't match n_inputs.
    pub fn apply(&self, dist: &Dist) -> Result<Dist, ProbError> {
        if dist.p.len() != self.n_inputs {
            return Err(ProbError::ShapeMismatch {
                expected: self.n_inputs,
                got: dist.p.len(),
            });
        }

        let mut result = vec![0.0; self.n_outputs];
        for (row, &mass) in self.k.iter().zip(dist.p.iter()) {
            if mass == 0.0 {
                continue;
            }
            for (out, &x) in result.iter_mut().zip(row.iter()) {
                *out += mass * x;
            }
        }

        Ok(Dist { p: result })
    }

    /// Apply the kernel to a single input state (deterministic input).
    ///
    /// Returns the i-th row as a distribution.
    pub fn apply_to_state(&self, i: usize) -> Result<Dist, ProbError> {
        if i >= self.n_inputs {
            return Err(ProbError::IndexOutOfBounds {
                index: i,
                size: self.n_inputs,
            });
        }
        Ok(Dist {
            p: self.k[i].clone(),
        })
    }

    /// Apply the kernel `steps` times.
    pub fn iterate(&self, dist: &Dist, steps: usize) -> Result<Dist, ProbError> {
        let mut current = dist.clone();
        for _ in 0..steps {
            current = self.apply(&current)?;
        }
        Ok(current)
    }

    /// Iterate `μ ← μK` until two successive iterates differ by at most
    /// `tol` in every component, or `max_iter` applications have been made.
    ///
    /// Only meaningful for square kernels.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dungeon_prob::{Dist, Kernel};
    ///
    /// // 0 drains into the absorbing state 1
    /// let k = Kernel::new(vec![vec![0.0, 1.0], vec![0.0, 1.0]]).unwrap();
    /// let fp = k.converge(&Dist::point(2, 0), 100, 1e-12).unwrap();
    /// assert!(fp.converged);
    /// assert_eq!(fp.iterations, 2);
    /// ```
    pub fn converge(&self, dist: &Dist, max_iter: usize, tol: f64) -> Result<FixedPoint, ProbError> {
        if self.n_inputs != self.n_outputs {
            return Err(ProbError::ShapeMismatch {
                expected: self.n_inputs,
                got: self.n_outputs,
            });
        }

        let mut current = dist.clone();
        for iter in 1..=max_iter {
            let next = self.apply(&current)?;
            let diff = next.max_abs_diff(&current)?;
            current = next;
            if diff <= tol {
                return Ok(FixedPoint {
                    dist: current,
                    iterations: iter,
                    converged: true,
                });
            }
        }

        debug!(max_iter, "kernel iteration hit the cap");
        Ok(FixedPoint {
            dist: current,
            iterations: max_iter,
            converged: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_new_valid() {
        let k = Kernel::new(vec![vec![0.7, 0.3], vec![0.4, 0.6]]).unwrap();
        assert_eq!(k.n_inputs, 2);
        assert_eq!(k.n_outputs, 2);
    }

    #[test]
    fn test_kernel_row_not_normalized() {
        let result = Kernel::new(vec![vec![0.7, 0.3], vec![0.4, 0.5]]);
        assert!(matches!(
            result,
            Err(ProbError::RowNotNormalized { row: 1, .. })
        ));
    }

    #[test]
    fn test_kernel_ragged() {
        let result = Kernel::new(vec![vec![1.0], vec![0.5, 0.5]]);
        assert!(matches!(result, Err(ProbError::RaggedMatrix)));
    }

    #[test]
    fn test_from_rows() {
        let k = Kernel::from_rows(vec![Dist::point(3, 2), Dist::uniform(3)]).unwrap();
        assert_eq!(k.n_inputs, 2);
        assert_eq!(k.k[0], vec![0.0, 0.0, 1.0]);
        assert!((k.k[1][0] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_skips_zero_mass() {
        let k = Kernel::new(vec![vec![0.6, 0.4], vec![0.0, 1.0]]).unwrap();
        let out = k.apply(&Dist::new(vec![0.5, 0.5]).unwrap()).unwrap();
        assert!((out.p[0] - 0.3).abs() < 1e-12);
        assert!((out.p[1] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_apply_shape_mismatch() {
        let k = Kernel::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert!(matches!(
            k.apply(&Dist::uniform(3)),
            Err(ProbError::ShapeMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_iterate() {
        let swap = Kernel::new(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let d = swap.iterate(&Dist::point(2, 0), 3).unwrap();
        assert_eq!(d.p, vec![0.0, 1.0]);
    }

    #[test]
    fn test_converge_stationary_is_immediate() {
        let stay = Kernel::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let fp = stay.converge(&Dist::uniform(2), 10, 1e-12).unwrap();
        assert!(fp.converged);
        assert_eq!(fp.iterations, 1);
    }

    #[test]
    fn test_converge_periodic_hits_cap() {
        let swap = Kernel::new(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let fp = swap.converge(&Dist::point(2, 0), 7, 1e-12).unwrap();
        assert!(!fp.converged);
        assert_eq!(fp.iterations, 7);
        assert_eq!(fp.dist.p, vec![0.0, 1.0]);
    }

    #[test]
    fn test_converge_geometric() {
        // Half the mass leaks into the sink each step.
        let k = Kernel::new(vec![vec![0.5, 0.5], vec![0.0, 1.0]]).unwrap();
        let fp = k.converge(&Dist::point(2, 0), 1000, 1e-9).unwrap();
        assert!(fp.converged);
        assert!((fp.dist.p[1] - 1.0).abs() < 1e-8);
    }
}
