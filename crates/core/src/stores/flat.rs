use crate::traits::VectorIndex;
use crate::{Neighbor, SearchError};

#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<(), SearchError> {
        if actual != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

impl VectorIndex for FlatL2Index {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn reset(&mut self) {
        self.data.clear();
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), SearchError> {
        for vector in vectors {
            self.check_dimension(vector.len())?;
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<Neighbor>, SearchError> {
        self.check_dimension(query_vector.len())?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, stored)| Neighbor {
                ordinal,
                distance: squared_l2(stored, query_vector),
            })
            .collect();

        scored.sort_by(|left, right| {
            left.distance
                .total_cmp(&right.distance)
                .then(left.ordinal.cmp(&right.ordinal))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: &[Vec<f32>]) -> FlatL2Index {
        let mut index = FlatL2Index::new(2);
        index.add(vectors).unwrap();
        index
    }

    #[test]
    fn search_orders_by_ascending_distance() {
        let index = index_with(&[
            vec![10.0, 10.0],
            vec![0.0, 1.0],
            vec![3.0, 3.0],
            vec![0.0, 0.0],
        ]);

        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let ordinals: Vec<_> = hits.iter().map(|hit| hit.ordinal).collect();
        assert_eq!(ordinals, vec![3, 1, 2]);
        assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[2].distance, 18.0);
    }

    #[test]
    fn search_returns_everything_when_k_exceeds_len() {
        let index = index_with(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(index.search(&[0.0, 0.0], 3).unwrap().len(), 2);
    }

    #[test]
    fn ties_break_by_ordinal() {
        let index = index_with(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]]);
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        assert_eq!(
            hits.iter().map(|hit| hit.ordinal).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn reset_discards_previous_document() {
        let mut index = index_with(&[
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 2.0],
            vec![3.0, 3.0],
            vec![4.0, 4.0],
        ]);
        index.reset();
        index.add(&[vec![5.0, 5.0], vec![6.0, 6.0]]).unwrap();

        assert_eq!(index.len(), 2);
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.ordinal < 2));
    }

    #[test]
    fn wrong_dimension_is_rejected_without_partial_add() {
        let mut index = index_with(&[vec![0.0, 0.0]]);
        let result = index.add(&[vec![1.0, 1.0], vec![1.0, 1.0, 1.0]]);
        assert!(matches!(
            result,
            Err(SearchError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(index.len(), 1);
        assert!(index.search(&[0.0], 1).is_err());
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let index = FlatL2Index::new(4);
        assert!(index.search(&[0.0; 4], 3).unwrap().is_empty());
    }
}
