
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{MineError, Result};

/// Heap entry pairing a score with its candidate index. Ordered by score
/// with the ascending index deciding ties, so extraction order is
/// deterministic and reproducible.
#[derive( Debug, PartialEq )]
struct ScoredIndex {
    score: f64,
    index: usize,
}

impl Eq for ScoredIndex {}

impl Ord for ScoredIndex {
    fn cmp( &self, other: &ScoredIndex ) -> Ordering {
        self.score.total_cmp( &other.score )
            .then_with( || other.index.cmp( &self.index ))
    }
}

impl PartialOrd for ScoredIndex {
    fn partial_cmp( &self, other: &ScoredIndex ) -> Option<Ordering> {
        Some( self.cmp( other ))
    }
}

/// Returns the indices of the k highest scores, in strictly descending
/// score order. A k beyond the number of candidates is a caller error and
/// is rejected before any heap work.
pub fn top_k( scores: &[f64], k: usize ) -> Result<Vec<usize>> {
    if k > scores.len() {
        return Err( MineError::KOutOfRange { k, n: scores.len() } );
    }

    let mut queue: BinaryHeap<ScoredIndex> = scores.iter()
        .enumerate()
        .map( |(index, score)| ScoredIndex { score: *score, index } )
        .collect();

    let mut top = Vec::with_capacity( k );
    for _ in 0 .. k {
        let entry = queue.pop().expect( "k is at most the queue length" );
        top.push( entry.index );
    }
    Ok( top )
}

/// Cosine similarity of two equally long vectors. A zero-norm vector has
/// no direction, so the degenerate case is reported instead of silently
/// propagating NaN.
pub fn cosine_similarity( left: &[f64], right: &[f64] ) -> Result<f64> {
    if left.len() != right.len() {
        return Err( MineError::LengthMismatch { left: left.len(), right: right.len() } );
    }

    let dot: f64 = left.iter().zip( right ).map( |(a, b)| a * b ).sum();
    let left_norm = norm( left );
    let right_norm = norm( right );
    if left_norm == 0.0 || right_norm == 0.0 {
        return Err( MineError::DegenerateVector );
    }
    Ok( dot / (left_norm * right_norm) )
}

fn norm( vector: &[f64] ) -> f64 {
    vector.iter().map( |v| v * v ).sum::<f64>().sqrt()
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_top_k_descends() {
        let scores = vec!( 0.1, 0.9, 0.4, 0.7 );
        assert_eq!( top_k( &scores, 3 ).unwrap(), vec!( 1, 3, 2 ));
    }

    #[test]
    fn test_top_k_matches_full_sort() {
        let scores = vec!( 3.0, -1.0, 2.5, 0.0, 7.25, 2.5, -4.0 );
        let k = scores.len();
        let ranked = top_k( &scores, k ).unwrap();

        let mut expected: Vec<usize> = (0 .. scores.len()).collect();
        expected.sort_by( |a, b| scores[*b].total_cmp( &scores[*a] ).then( a.cmp( b )));
        assert_eq!( ranked, expected );
    }

    #[test]
    fn test_top_k_breaks_ties_by_ascending_index() {
        let scores = vec!( 0.5, 0.5, 0.5, 0.1 );
        assert_eq!( top_k( &scores, 3 ).unwrap(), vec!( 0, 1, 2 ));
    }

    #[test]
    fn test_top_k_rejects_oversized_k() {
        let scores = vec!( 0.5, 0.1 );
        assert!( matches!( top_k( &scores, 3 ), Err( MineError::KOutOfRange { k: 3, n: 2 } )));
    }

    #[test]
    fn test_top_zero_is_empty() {
        let scores = vec!( 0.5, 0.1 );
        assert_eq!( top_k( &scores, 0 ).unwrap(), Vec::<usize>::new() );
    }

    #[test]
    fn test_cosine_similarity_of_orthogonal_vectors() {
        assert_eq!( cosine_similarity( &[1.0, 0.0], &[0.0, 1.0] ).unwrap(), 0.0 );
    }

    #[test]
    fn test_cosine_similarity_of_equal_vectors() {
        let value = cosine_similarity( &[1.0, 1.0], &[1.0, 1.0] ).unwrap();
        assert!( (value - 1.0).abs() < 1e-12 );
    }

    #[test]
    fn test_cosine_similarity_rejects_zero_vector() {
        let result = cosine_similarity( &[0.0, 0.0], &[1.0, 2.0] );
        assert!( matches!( result, Err( MineError::DegenerateVector )));
    }

    #[test]
    fn test_cosine_similarity_rejects_length_mismatch() {
        let result = cosine_similarity( &[1.0], &[1.0, 2.0] );
        assert!( matches!( result, Err( MineError::LengthMismatch { left: 1, right: 2 } )));
    }
}
