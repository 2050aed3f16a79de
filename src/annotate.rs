
use crate::data::{Itemvec, TransactionStore};
use crate::error::{MineError, Result};
use crate::rank::{cosine_similarity, top_k};
use crate::relation::{PatternType, RelationMatrix};

/// Query layer over a built relationship matrix. Answers the three
/// annotation questions for a target pattern; rendering ids back to names
/// is left to the caller.
pub struct Annotator<'a> {
    store: &'a TransactionStore,
    matrix: &'a RelationMatrix,
    patterns: &'a [Itemvec],
}

impl <'a> Annotator<'a> {

    pub fn new( store: &'a TransactionStore, matrix: &'a RelationMatrix, patterns: &'a [Itemvec] ) -> Annotator<'a> {
        Annotator { store, matrix, patterns }
    }

    /// The k patterns with the highest mutual information to the target,
    /// in descending strength
    pub fn strongest_context_indicators( &self, pattern_id: usize, k: usize ) -> Result<Vec<usize>> {
        let scores = self.matrix.mi_vector( pattern_id, self.patterns.len() )?;
        top_k( &scores, k )
    }

    /// The k patterns whose relationship vectors point in the most
    /// similar direction to the target's, by cosine similarity. The
    /// target itself participates and typically ranks first.
    pub fn semantically_similar_patterns( &self, pattern_id: usize, k: usize ) -> Result<Vec<usize>> {
        let dimension = self.patterns.len();
        let target = self.matrix.mi_vector( pattern_id, dimension )?;

        let mut scores = Vec::with_capacity( dimension );
        for index in 0 .. dimension {
            let other = self.matrix.mi_vector( index, dimension )?;
            scores.push( cosine_similarity( &target, &other )? );
        }
        top_k( &scores, k )
    }

    /// The k papers whose own context model is most similar to the
    /// target pattern's relationship vector. Only same-type matrices
    /// describe papers against their own pattern list, so cross-type
    /// matrices are rejected.
    pub fn representative_transactions( &self, pattern_id: usize, k: usize ) -> Result<Vec<usize>> {
        let context_models = match self.matrix.pattern_type() {
            PatternType::AuthorAuthor => self.store.author_context_models( self.patterns ),
            PatternType::TitleTitle => self.store.title_context_models( self.patterns ),
            cross => return Err( MineError::CrossTypeContext( cross )),
        };

        let target = self.matrix.mi_vector( pattern_id, self.patterns.len() )?;
        let mut scores = Vec::with_capacity( context_models.len() );
        for model in &context_models {
            scores.push( cosine_similarity( &target, model )? );
        }
        top_k( &scores, k )
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::data::Paper;
    use rustc_hash::FxHashMap;

    fn sample_store() -> TransactionStore {
        // the fifth paper keeps pattern supports unbalanced, so matched
        // and complementary transaction sets score differently
        let papers = vec!(
            Paper::new( vec!( 1, 2 ), vec!( 5, 6 ) ),
            Paper::new( vec!( 1, 2 ), vec!( 5, 7 ) ),
            Paper::new( vec!( 3 ), vec!( 6, 7 ) ),
            Paper::new( vec!( 3, 4 ), vec!( 8 ) ),
            Paper::new( vec!( 5 ), vec!( 9 ) ),
        );
        TransactionStore::with_papers( papers, FxHashMap::default(), FxHashMap::default() )
    }

    fn fixture() -> (TransactionStore, Vec<Itemvec>, RelationMatrix) {
        let store = sample_store();
        let patterns = vec!( vec!( 1 ), vec!( 2 ), vec!( 3 ), vec!( 4 ));
        let mut matrix = RelationMatrix::new( PatternType::AuthorAuthor );
        matrix.compute( &store, &patterns, None ).unwrap();
        (store, patterns, matrix)
    }

    #[test]
    fn test_strongest_indicators_rank_co_occurring_patterns_first() {
        let (store, patterns, matrix) = fixture();
        let annotator = Annotator::new( &store, &matrix, &patterns );

        // authors 1 and 2 always publish together, 4 never with 1
        let indicators = annotator.strongest_context_indicators( 0, patterns.len() ).unwrap();
        assert_eq!( indicators.len(), patterns.len() );
        let rank_of = |target: usize| indicators.iter().position( |index| *index == target ).unwrap();
        assert!( rank_of( 1 ) < rank_of( 3 ));
    }

    #[test]
    fn test_similar_patterns_put_the_target_first() {
        let (store, patterns, matrix) = fixture();
        let annotator = Annotator::new( &store, &matrix, &patterns );

        let similar = annotator.semantically_similar_patterns( 0, 2 ).unwrap();
        assert_eq!( similar.len(), 2 );
        // patterns 0 and 1 match identical transaction sets, so both
        // share the maximal similarity of 1; ties resolve by index
        assert_eq!( similar, vec!( 0, 1 ));
    }

    #[test]
    fn test_representative_transactions_prefer_matching_papers() {
        let (store, patterns, matrix) = fixture();
        let annotator = Annotator::new( &store, &matrix, &patterns );

        let representatives = annotator.representative_transactions( 0, store.len() ).unwrap();
        assert_eq!( representatives.len(), store.len() );
        let rank_of = |paper: usize| representatives.iter().position( |index| *index == paper ).unwrap();
        // papers written by author 1 outrank the paper by authors 3 and 4
        assert!( rank_of( 0 ) < rank_of( 3 ));
        assert!( rank_of( 1 ) < rank_of( 3 ));
    }

    #[test]
    fn test_representative_transactions_reject_cross_type_matrices() {
        let store = sample_store();
        let authors = vec!( vec!( 1 ), vec!( 3 ));
        let titles = vec!( vec!( 5 ), vec!( 6, 7 ));
        let mut matrix = RelationMatrix::new( PatternType::AuthorTitle );
        matrix.compute( &store, &authors, Some( &titles )).unwrap();

        let annotator = Annotator::new( &store, &matrix, &authors );
        let result = annotator.representative_transactions( 0, 1 );
        assert!( matches!( result, Err( MineError::CrossTypeContext( _ ))));
    }
}
