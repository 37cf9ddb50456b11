//! Type-safe wrappers and core types for vector search functionality.
//!
//! Newtypes here keep dimensions and similarity scores from being passed
//! around as bare primitives, and `VectorError` is shared by the index,
//! the on-disk matrix and the embedding adapters.

use thiserror::Error;

/// Output dimension of the default embedding model (all-MiniLM-L6-v2).
pub const VECTOR_DIMENSION_384: usize = 384;

/// Tolerance used when checking that a vector is unit length.
pub const NORM_TOLERANCE: f32 = 1e-5;

/// Type-safe wrapper for vector dimensions.
///
/// Ensures runtime validation of vector dimensions to prevent
/// dimension mismatches during operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Creates a standard 384-dimensional vector dimension.
    #[must_use]
    pub const fn dimension_384() -> Self {
        Self(VECTOR_DIMENSION_384)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cosine similarity between a query and a stored row.
///
/// Always finite and within `[-1.0, 1.0]`; higher means more relevant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score(f32);

impl Score {
    /// Creates a new `Score` with validation.
    ///
    /// Returns an error if the value is NaN or outside `[-1.0, 1.0]`.
    pub fn new(value: f32) -> Result<Self, VectorError> {
        if value.is_nan() {
            return Err(VectorError::InvalidScore {
                value,
                reason: "Score cannot be NaN",
            });
        }
        if !(-1.0..=1.0).contains(&value) {
            return Err(VectorError::InvalidScore {
                value,
                reason: "Score must be in range [-1.0, 1.0]",
            });
        }
        Ok(Self(value))
    }

    /// Builds a score from a raw inner product of two unit vectors.
    ///
    /// Float accumulation can land a hair outside `[-1, 1]`, so the value is
    /// clamped before validation.
    pub fn from_inner_product(value: f32) -> Result<Self, VectorError> {
        Self::new(if value.is_nan() { value } else { value.clamp(-1.0, 1.0) })
    }

    /// Returns the underlying f32 value.
    #[must_use]
    pub fn get(&self) -> f32 {
        self.0
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Scales `vector` to unit L2 norm in place.
///
/// Zero-norm and non-finite vectors have no direction and are rejected.
pub fn normalize_l2(vector: &mut [f32]) -> Result<(), VectorError> {
    let norm = l2_norm(vector);
    if !norm.is_finite() {
        return Err(VectorError::InvalidVector {
            reason: "vector contains non-finite values",
        });
    }
    if norm == 0.0 {
        return Err(VectorError::InvalidVector {
            reason: "zero vector cannot be normalized",
        });
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
    Ok(())
}

/// Euclidean length of a vector.
#[must_use]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Inner product of two equal-length slices.
///
/// Equals cosine similarity when both inputs are unit length.
#[must_use]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Errors that can occur during vector operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors use the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error("Invalid vector: {reason}\nSuggestion: Check the embedding model output")]
    InvalidVector { reason: &'static str },

    #[error("Invalid score value: {value}\nReason: {reason}")]
    InvalidScore { value: f32, reason: &'static str },

    #[error(
        "Embedding generation failed: {0}\nSuggestion: Verify the embedding model is properly initialized"
    )]
    EmbeddingFailed(String),

    #[error(
        "Embedding model unavailable: {0}\nSuggestion: Check the model name and that the model cache is reachable (first run downloads it)"
    )]
    ModelUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_dimension() {
        let dim = VectorDimension::new(384).unwrap();
        assert_eq!(dim.get(), 384);
        assert_eq!(VectorDimension::dimension_384(), dim);

        assert!(VectorDimension::new(0).is_err());

        assert!(dim.validate_vector(&vec![0.1; 384]).is_ok());
        match dim.validate_vector(&vec![0.1; 100]) {
            Err(VectorError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 384);
                assert_eq!(actual, 100);
            }
            other => panic!("Expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_score_validation() {
        assert_eq!(Score::new(0.5).unwrap().get(), 0.5);
        assert_eq!(Score::new(-1.0).unwrap().get(), -1.0);

        assert!(Score::new(1.1).is_err());
        assert!(Score::new(-1.1).is_err());
        assert!(Score::new(f32::NAN).is_err());
    }

    #[test]
    fn test_score_clamps_rounding_noise() {
        let score = Score::from_inner_product(1.000_000_2).unwrap();
        assert_eq!(score.get(), 1.0);
        assert!(Score::from_inner_product(f32::NAN).is_err());
    }

    #[test]
    fn test_score_ordering() {
        let mut scores = vec![
            Score::new(0.2).unwrap(),
            Score::new(-0.4).unwrap(),
            Score::new(0.9).unwrap(),
        ];
        scores.sort_by(|a, b| b.cmp(a));
        let values: Vec<f32> = scores.iter().map(Score::get).collect();
        assert_eq!(values, vec![0.9, 0.2, -0.4]);
    }

    #[test]
    fn test_normalize_l2() {
        let mut v = vec![3.0, 4.0];
        normalize_l2(&mut v).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert!((l2_norm(&v) - 1.0).abs() < NORM_TOLERANCE);
    }

    #[test]
    fn test_normalize_rejects_degenerate_vectors() {
        assert!(matches!(
            normalize_l2(&mut [0.0, 0.0, 0.0]),
            Err(VectorError::InvalidVector { .. })
        ));
        assert!(matches!(
            normalize_l2(&mut [1.0, f32::INFINITY]),
            Err(VectorError::InvalidVector { .. })
        ));
    }

    #[test]
    fn test_inner_product_of_unit_vectors_is_cosine() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        let c = [-1.0, 0.0, 0.0];
        assert!((inner_product(&a, &a) - 1.0).abs() < 1e-6);
        assert!(inner_product(&a, &b).abs() < 1e-6);
        assert!((inner_product(&a, &c) + 1.0).abs() < 1e-6);
    }
}
