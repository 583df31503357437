//! Probability distributions over finite sets.

use crate::error::ProbError;
use crate::PROB_TOLERANCE;

/// A probability distribution over a finite set {0, 1, ..., n-1}.
///
/// Invariants:
/// - All probabilities are non-negative
/// - Probabilities sum to 1 (within tolerance)
///
/// # Example
///
/// ```rust
/// use dungeon_prob::Dist;
///
/// // Trap outcome: nothing, back to start, death
/// let trap = Dist::new(vec![0.6, 0.3, 0.1]).unwrap();
/// assert_eq!(trap.sample(0.5), 0);
/// assert_eq!(trap.sample(0.95), 2);
///
/// // Point mass (certain outcome)
/// let certain = Dist::point(3, 1);
/// assert_eq!(certain.sample(0.0), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Dist {
    /// Probability vector (sums to 1).
    pub p: Vec<f64>,
}

impl Dist {
    /// Create a new distribution from a probability vector.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The vector is empty
    /// - Any probability is negative
    /// - The probabilities don't sum to 1 (within tolerance)
    pub fn new(p: Vec<f64>) -> Result<Self, ProbError> {
        if p.is_empty() {
            return Err(ProbError::EmptyDistribution);
        }

        if p.iter().any(|&x| x < -PROB_TOLERANCE) {
            return Err(ProbError::NegativeProbability);
        }

        let sum: f64 = p.iter().sum();
        if (sum - 1.0).abs() > PROB_TOLERANCE {
            return Err(ProbError::NotNormalized { sum });
        }

        Ok(Self { p })
    }

    /// Create a distribution from unnormalized weights.
    pub fn from_weights(weights: Vec<f64>) -> Result<Self, ProbError> {
        if weights.is_empty() {
            return Err(ProbError::EmptyDistribution);
        }

        if weights.iter().any(|&x| x < 0.0) {
            return Err(ProbError::NegativeProbability);
        }

        let sum: f64 = weights.iter().sum();
        if sum <= 0.0 {
            return Err(ProbError::ZeroWeights);
        }

        Ok(Self {
            p: weights.iter().map(|w| w / sum).collect(),
        })
    }

    /// Create a uniform distribution over n elements.
    pub fn uniform(n: usize) -> Self {
        assert!(n > 0, "Cannot create uniform distribution over empty set");
        Self {
            p: vec![1.0 / n as f64; n],
        }
    }

    /// Uniform over the given outcomes, zero elsewhere.
    pub fn uniform_over(n: usize, support: &[usize]) -> Result<Self, ProbError> {
        if support.is_empty() {
            return Err(ProbError::ZeroWeights);
        }
        let mut p = vec![0.0; n];
        let mass = 1.0 / support.len() as f64;
        for &i in support {
            if i >= n {
                return Err(ProbError::IndexOutOfBounds { index: i, size: n });
            }
            p[i] += mass;
        }
        Ok(Self { p })
    }

    /// Create a point mass (Dirac delta) at index i.
    ///
    /// P(i) = 1, P(j) = 0 for j ≠ i
    pub fn point(n: usize, i: usize) -> Self {
        assert!(i < n, "Index {} out of bounds for size {}", i, n);
        let mut p = vec![0.0; n];
        p[i] = 1.0;
        Self { p }
    }

    /// The number of outcomes in the sample space.
    pub fn len(&self) -> usize {
        self.p.len()
    }

    /// Check if the distribution is over an empty set (always false for valid Dist).
    pub fn is_empty(&self) -> bool {
        self.p.is_empty()
    }

    /// Largest per-outcome difference `max |p[i] - q[i]|`.
    pub fn max_abs_diff(&self, other: &Dist) -> Result<f64, ProbError> {
        if self.p.len() != other.p.len() {
            return Err(ProbError::ShapeMismatch {
                expected: self.p.len(),
                got: other.p.len(),
            });
        }
        Ok(self
            .p
            .iter()
            .zip(other.p.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max))
    }

    /// Copy this distribution into a larger sample space of size `n`,
    /// outcome `i` landing at `offset + i`.
    pub fn embed(&self, n: usize, offset: usize) -> Result<Dist, ProbError> {
        if offset + self.p.len() > n {
            return Err(ProbError::ShapeMismatch {
                expected: n,
                got: offset + self.p.len(),
            });
        }
        let mut p = vec![0.0; n];
        p[offset..offset + self.p.len()].copy_from_slice(&self.p);
        Ok(Dist { p })
    }

    /// Sample from the distribution using a uniform random value in [0, 1).
    ///
    /// This uses inverse transform sampling.
    pub fn sample(&self, u: f64) -> usize {
        let mut cumsum = 0.0;
        for (i, &p) in self.p.iter().enumerate() {
            cumsum += p;
            if u < cumsum {
                return i;
            }
        }
        // u = 1.0 or rounding: last outcome with mass
        self.p
            .iter()
            .rposition(|&p| p > 0.0)
            .unwrap_or(self.p.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dist_new_valid() {
        let d = Dist::new(vec![0.3, 0.7]).unwrap();
        assert_eq!(d.len(), 2);
        assert!((d.p[0] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_dist_new_not_normalized() {
        let result = Dist::new(vec![0.3, 0.6]);
        assert!(matches!(result, Err(ProbError::NotNormalized { .. })));
    }

    #[test]
    fn test_dist_new_negative() {
        let result = Dist::new(vec![-0.5, 1.5]);
        assert!(matches!(result, Err(ProbError::NegativeProbability)));
    }

    #[test]
    fn test_dist_from_weights() {
        let d = Dist::from_weights(vec![1.0, 2.0, 3.0]).unwrap();
        assert!((d.p[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_over() {
        let d = Dist::uniform_over(5, &[1, 3]).unwrap();
        assert_eq!(d.p, vec![0.0, 0.5, 0.0, 0.5, 0.0]);
        assert!(matches!(
            Dist::uniform_over(3, &[]),
            Err(ProbError::ZeroWeights)
        ));
        assert!(matches!(
            Dist::uniform_over(3, &[4]),
            Err(ProbError::IndexOutOfBounds { index: 4, size: 3 })
        ));
    }

    #[test]
    fn test_embed() {
        let d = Dist::new(vec![0.25, 0.75]).unwrap();
        let big = d.embed(5, 2).unwrap();
        assert_eq!(big.p, vec![0.0, 0.0, 0.25, 0.75, 0.0]);
        assert!(d.embed(2, 1).is_err());
    }

    #[test]
    fn test_max_abs_diff() {
        let p = Dist::new(vec![0.5, 0.5]).unwrap();
        let q = Dist::new(vec![0.9, 0.1]).unwrap();
        assert!((p.max_abs_diff(&q).unwrap() - 0.4).abs() < 1e-12);
        assert!(p.max_abs_diff(&Dist::uniform(3)).is_err());
    }

    #[test]
    fn test_sample() {
        let d = Dist::new(vec![0.3, 0.7, 0.0]).unwrap();
        assert_eq!(d.sample(0.0), 0);
        assert_eq!(d.sample(0.29), 0);
        assert_eq!(d.sample(0.31), 1);
        assert_eq!(d.sample(1.0), 1);
    }
}
