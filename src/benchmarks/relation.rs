
use std::time::*;

use rand::prelude::*;
use rustc_hash::FxHashMap;
use statrs::distribution::DiscreteUniform;
use tracing::{info, debug};

use papermine::*;

fn main() -> Result<()> {
    prepare_logging();

    let store = generate_corpus( 500, 200, 50 );
    store.log( "synthetic corpus ready", tracing::Level::INFO );
    let patterns = generate_patterns( 150, 200, 4 );

    benchmark_matrix_build( &store, &patterns );
    benchmark_reduction( &patterns );

    Ok( () )
}

fn benchmark_matrix_build( store: &TransactionStore, patterns: &[Itemvec] ) {
    info!( "Start benchmark: author matrix over {} patterns", patterns.len() );
    let mut matrix = RelationMatrix::new( PatternType::AuthorAuthor );

    let start = Instant::now();
    matrix.compute( store, patterns, None ).expect( "same-type computation takes no secondary list" );
    let build_time = Instant::now().duration_since( start );
    info!( "Result: built {} pairs in {}ms", matrix.len(), build_time.as_millis() );

    let start = Instant::now();
    let mut checksum = 0.0;
    for i in 0 .. patterns.len() {
        let vector = matrix.mi_vector( i, patterns.len() ).expect( "every pair is cached" );
        checksum += vector.iter().sum::<f64>();
    }
    let query_time = Instant::now().duration_since( start );
    debug!( "vector checksum {checksum:.3}" );
    info!( "Result: {} vector reads took {}ms", patterns.len(), query_time.as_millis() );
}

fn benchmark_reduction( patterns: &[Itemvec] ) {
    info!( "Start benchmark: reduction over {} patterns", patterns.len() );

    let start = Instant::now();
    let one_pass = OnePassReducer::new( 0.4 ).reduce( patterns );
    let one_pass_time = Instant::now().duration_since( start );
    info!( "Result: one-pass kept {} representatives in {}ms", one_pass.len(), one_pass_time.as_millis() );

    let start = Instant::now();
    let hierarchical = AgglomerativeReducer::new( 0.4 ).reduce( patterns );
    let hierarchical_time = Instant::now().duration_since( start );
    info!( "Result: hierarchical kept {} representatives in {}ms", hierarchical.len(), hierarchical_time.as_millis() );
}

/// Draws a corpus of papers with uniformly random author sets and titles
fn generate_corpus( num_papers: usize, num_authors: usize, num_terms: usize ) -> TransactionStore {
    let mut gen = thread_rng();
    let author_dist = DiscreteUniform::new( 0, num_authors as i64 - 1 ).unwrap();
    let term_dist = DiscreteUniform::new( 0, num_terms as i64 - 1 ).unwrap();

    let papers = (0 .. num_papers).map( |_| {
        let authors: Vec<Item> = (0 .. 3).map( |_| author_dist.sample( &mut gen ) as Item ).collect();
        let title: Itemvec = (0 .. 8).map( |_| term_dist.sample( &mut gen ) as Item ).collect();
        Paper::new( authors, title )
    }).collect();

    TransactionStore::with_papers( papers, FxHashMap::default(), FxHashMap::default() )
}

/// Draws random patterns over the author universe
fn generate_patterns( num_patterns: usize, num_authors: usize, max_length: usize ) -> Vec<Itemvec> {
    let mut gen = thread_rng();
    let author_dist = DiscreteUniform::new( 0, num_authors as i64 - 1 ).unwrap();
    let length_dist = DiscreteUniform::new( 1, max_length as i64 ).unwrap();

    (0 .. num_patterns).map( |_| {
        let length = length_dist.sample( &mut gen ) as usize;
        let mut pattern: Itemvec = (0 .. length).map( |_| author_dist.sample( &mut gen ) as Item ).collect();
        pattern.sort();
        pattern.dedup();
        pattern
    }).collect()
}

fn prepare_logging() {
    let tracer = tracing_subscriber::fmt::fmt()
        .with_max_level( tracing_subscriber::filter::LevelFilter::INFO )
        .finish();
    tracing::subscriber::set_global_default( tracer ).unwrap();
}
