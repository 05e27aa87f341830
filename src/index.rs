//! In-memory vector index and chunk store.
//!
//! A single append-only container of (vector, text) records. Keeping the
//! vector and its source text in one record makes the index and the store
//! grow together by construction; a vector's position resolves to its
//! chunk text in O(1).
//!
//! Search is brute-force squared Euclidean distance over all records,
//! nearest first. Ties are broken by insertion order.

/// One indexed chunk: its embedding vector and its text.
#[derive(Debug, Clone)]
struct ChunkRecord {
    vector: Vec<f32>,
    text: String,
}

/// Index error. A dimensionality mismatch indicates a model or
/// configuration error and aborts the operation; the index is never
/// partially grown by a failed call.
#[derive(Debug)]
pub enum IndexError {
    /// A vector's length disagrees with the index's fixed dimensionality.
    DimensionalityMismatch { expected: usize, got: usize },
    /// The vector batch and the chunk batch have different lengths.
    CountMismatch { vectors: usize, chunks: usize },
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::DimensionalityMismatch { expected, got } => write!(
                f,
                "embedding dimensionality mismatch: index expects {}, got {}",
                expected, got
            ),
            IndexError::CountMismatch { vectors, chunks } => write!(
                f,
                "vector/chunk count mismatch: {} vectors, {} chunks",
                vectors, chunks
            ),
        }
    }
}

impl std::error::Error for IndexError {}

/// Append-only index of embedded chunks with k-nearest-neighbor search.
#[derive(Debug)]
pub struct ChunkIndex {
    dims: usize,
    records: Vec<ChunkRecord>,
}

impl ChunkIndex {
    /// Create an empty index with a fixed vector dimensionality.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            records: Vec::new(),
        }
    }

    /// The fixed dimensionality every stored vector must have.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append `n` vectors and their `n` chunk texts as one unit.
    ///
    /// The whole batch is validated before anything is appended, so a
    /// failed call leaves the index unchanged. After a successful call the
    /// index has grown by exactly `vectors.len()` records.
    pub fn add(&mut self, vectors: &[Vec<f32>], chunks: &[String]) -> Result<(), IndexError> {
        if vectors.len() != chunks.len() {
            return Err(IndexError::CountMismatch {
                vectors: vectors.len(),
                chunks: chunks.len(),
            });
        }

        for vector in vectors {
            if vector.len() != self.dims {
                return Err(IndexError::DimensionalityMismatch {
                    expected: self.dims,
                    got: vector.len(),
                });
            }
        }

        self.records
            .extend(vectors.iter().zip(chunks.iter()).map(|(v, t)| ChunkRecord {
                vector: v.clone(),
                text: t.clone(),
            }));

        Ok(())
    }

    /// Return up to `k` (position, distance) pairs, nearest first.
    ///
    /// Distance is squared L2. The sort is stable, so equidistant chunks
    /// come back in insertion order. An empty index yields an empty Vec.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut hits: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(pos, record)| (pos, squared_l2(query, &record.vector)))
            .collect();

        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        hits
    }

    /// Resolve a position returned by [`search`](Self::search) to its
    /// chunk text. Out-of-bounds positions yield `None`.
    pub fn resolve(&self, position: usize) -> Option<&str> {
        self.records.get(position).map(|r| r.text.as_str())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_grows_index_and_store_together() {
        let mut index = ChunkIndex::new(2);
        index
            .add(&[vec![0.0, 0.0], vec![1.0, 1.0]], &texts(&["a", "b"]))
            .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.resolve(0), Some("a"));
        assert_eq!(index.resolve(1), Some("b"));
    }

    #[test]
    fn test_add_rejects_wrong_dimensionality_atomically() {
        let mut index = ChunkIndex::new(2);
        let err = index
            .add(&[vec![0.0, 0.0], vec![1.0]], &texts(&["a", "b"]))
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionalityMismatch { expected: 2, got: 1 }
        ));
        // Nothing appended, not even the valid first vector.
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_add_rejects_count_mismatch() {
        let mut index = ChunkIndex::new(2);
        let err = index.add(&[vec![0.0, 0.0]], &texts(&["a", "b"])).unwrap_err();
        assert!(matches!(err, IndexError::CountMismatch { .. }));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_search_empty_index_returns_empty() {
        let index = ChunkIndex::new(2);
        assert!(index.search(&[0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_search_returns_at_most_k_sorted_ascending() {
        let mut index = ChunkIndex::new(1);
        index
            .add(
                &[vec![4.0], vec![1.0], vec![3.0], vec![2.0]],
                &texts(&["d", "a", "c", "b"]),
            )
            .unwrap();

        let hits = index.search(&[0.0], 3);
        assert_eq!(hits.len(), 3);
        assert!(hits[0].1 <= hits[1].1 && hits[1].1 <= hits[2].1);
        assert_eq!(index.resolve(hits[0].0), Some("a"));
    }

    #[test]
    fn test_exact_match_is_top_with_zero_distance() {
        let mut index = ChunkIndex::new(2);
        index
            .add(
                &[vec![5.0, 5.0], vec![1.0, 2.0]],
                &texts(&["far", "near"]),
            )
            .unwrap();

        let hits = index.search(&[1.0, 2.0], 2);
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits[0].1, 0.0);
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let mut index = ChunkIndex::new(1);
        index
            .add(
                &[vec![1.0], vec![-1.0], vec![1.0]],
                &texts(&["first", "mirror", "second"]),
            )
            .unwrap();

        // All three are at squared distance 1 from the origin.
        let hits = index.search(&[0.0], 3);
        let order: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_resolve_out_of_bounds_is_none() {
        let mut index = ChunkIndex::new(1);
        index.add(&[vec![0.0]], &texts(&["only"])).unwrap();
        assert_eq!(index.resolve(1), None);
    }

    #[test]
    fn test_repeated_add_appends_duplicates() {
        let mut index = ChunkIndex::new(1);
        let vectors = [vec![1.0]];
        let chunks = texts(&["same"]);
        index.add(&vectors, &chunks).unwrap();
        index.add(&vectors, &chunks).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.resolve(0), index.resolve(1));
    }
}
