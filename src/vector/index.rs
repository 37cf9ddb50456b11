//! Exact inner-product index over unit-length vectors.
//!
//! Rows are stored contiguously in insertion order, so row `i` of the index
//! is the `i`-th vector ever appended. Every row is L2-normalized on the way
//! in, which makes the inner product with a normalized query equal to cosine
//! similarity. Search is a brute-force scan: the corpus is a few thousand
//! rows, well below the point where an approximate structure pays off.

use std::cmp::Ordering;

use crate::vector::{
    NORM_TOLERANCE, Score, VectorDimension, VectorError, inner_product, l2_norm, normalize_l2,
};

/// Append-only matrix of normalized embedding vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    /// Established on the first non-empty build, or up front via `with_dimension`.
    dimension: Option<VectorDimension>,

    /// Row-major `rows * dimension` floats.
    data: Vec<f32>,

    rows: usize,
}

impl VectorIndex {
    /// Creates an empty index whose dimension is taken from the first build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index that only accepts vectors of `dimension`.
    #[must_use]
    pub fn with_dimension(dimension: VectorDimension) -> Self {
        Self {
            dimension: Some(dimension),
            data: Vec::new(),
            rows: 0,
        }
    }

    /// Reassembles an index from rows that were normalized before being persisted.
    ///
    /// Fails if `data` is not a whole number of rows or any row is not unit length.
    pub fn from_normalized_rows(
        dimension: VectorDimension,
        data: Vec<f32>,
    ) -> Result<Self, VectorError> {
        let dim = dimension.get();
        if data.len() % dim != 0 {
            return Err(VectorError::InvalidVector {
                reason: "matrix length is not a multiple of the dimension",
            });
        }

        for row in data.chunks_exact(dim) {
            let norm = l2_norm(row);
            if !norm.is_finite() || (norm - 1.0).abs() > NORM_TOLERANCE {
                return Err(VectorError::InvalidVector {
                    reason: "stored row is not unit length",
                });
            }
        }

        let rows = data.len() / dim;
        Ok(Self {
            dimension: Some(dimension),
            data,
            rows,
        })
    }

    /// Normalizes and appends `vectors` as new rows.
    ///
    /// The whole batch is validated before anything is appended, so a bad
    /// vector leaves the existing rows untouched.
    pub fn build(&mut self, vectors: &[Vec<f32>]) -> Result<(), VectorError> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };

        let dimension = match self.dimension {
            Some(dimension) => dimension,
            None => VectorDimension::new(first.len())?,
        };

        let mut staged = Vec::with_capacity(vectors.len() * dimension.get());
        for vector in vectors {
            dimension.validate_vector(vector)?;
            let start = staged.len();
            staged.extend_from_slice(vector);
            normalize_l2(&mut staged[start..])?;
        }

        self.dimension = Some(dimension);
        self.data.extend_from_slice(&staged);
        self.rows += vectors.len();
        Ok(())
    }

    /// Returns up to `top_k` `(row, score)` pairs ordered by descending score.
    ///
    /// The query is normalized here as well, so raw model output can be passed
    /// directly. Ties keep the lower row first. An index with no rows returns an
    /// empty result for any query.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(usize, Score)>, VectorError> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        dimension.validate_vector(query)?;
        let mut query = query.to_vec();
        normalize_l2(&mut query)?;

        let mut scored = Vec::with_capacity(self.rows);
        for (row, stored) in self.data.chunks_exact(dimension.get()).enumerate() {
            scored.push((row, Score::from_inner_product(inner_product(&query, stored))?));
        }

        let by_rank = |a: &(usize, Score), b: &(usize, Score)| -> Ordering {
            b.1.cmp(&a.1).then(a.0.cmp(&b.0))
        };

        let k = top_k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_rank);
            scored.truncate(k);
        }
        scored.sort_by(by_rank);

        Ok(scored)
    }

    /// Number of stored rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Dimension of stored rows, if one has been established.
    #[must_use]
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.dimension
    }

    /// Borrows row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let dim = self.dimension?.get();
        (index < self.rows).then(|| &self.data[index * dim..(index + 1) * dim])
    }

    /// Row-major view of every stored float.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
