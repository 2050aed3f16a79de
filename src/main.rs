
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::*;

use papermine::*;
use papermine::reduce::ReductionReport;

#[derive( Parser )]
#[command( name = "annotator", about = "Annotates mined co-author and title-term patterns against a paper corpus" )]
struct Cli {
    /// paper corpus, one comma separated author list plus title per line
    #[arg( long, default_value = "data/data.csv" )]
    papers: PathBuf,

    /// author id mapping file
    #[arg( long, default_value = "data/author_id_mappings.txt" )]
    author_mapping: PathBuf,

    /// title term id mapping file
    #[arg( long, default_value = "data/title_term_id_mappings.txt" )]
    title_mapping: PathBuf,

    /// mined pattern file to annotate or reduce
    #[arg( long )]
    patterns: PathBuf,

    /// treat the patterns as title term sequences instead of author sets
    #[arg( long )]
    titles: bool,

    /// read at most this many corpus lines
    #[arg( long )]
    limit: Option<usize>,

    #[command( subcommand )]
    command: Command,
}

#[derive( Subcommand )]
enum Command {
    /// Rank the patterns with the highest mutual information to a target
    Indicators {
        /// index of the target pattern
        target: usize,
        /// number of results
        k: usize,
        /// persisted matrix file, loaded when present and written otherwise
        #[arg( long )]
        matrix_file: Option<PathBuf>,
    },
    /// Rank the patterns most semantically similar to a target
    Similar {
        target: usize,
        k: usize,
        #[arg( long )]
        matrix_file: Option<PathBuf>,
    },
    /// Rank the papers most representative of a target pattern
    Transactions {
        target: usize,
        k: usize,
        #[arg( long )]
        matrix_file: Option<PathBuf>,
    },
    /// Collapse near-duplicate patterns into representatives
    Reduce {
        /// Jaccard distance threshold for clustering
        #[arg( long, default_value_t = 0.3 )]
        threshold: f64,
        /// use hierarchical instead of one-pass clustering
        #[arg( long )]
        hierarchical: bool,
        /// file to write the representative patterns to
        #[arg( long )]
        output: Option<PathBuf>,
        /// file to write a JSON reduction report to
        #[arg( long )]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    prepare_logging();
    let cli = Cli::parse();

    let store = match cli.limit {
        Some( limit ) => TransactionStore::load_first( &cli.papers, &cli.author_mapping, &cli.title_mapping, limit )?,
        None => TransactionStore::load( &cli.papers, &cli.author_mapping, &cli.title_mapping )?,
    };
    store.log( "corpus ready", Level::INFO );

    let patterns = io::parse_patterns( &cli.patterns )?;
    let pattern_type = if cli.titles { PatternType::TitleTitle } else { PatternType::AuthorAuthor };

    match cli.command {
        Command::Indicators { target, k, matrix_file } => {
            let matrix = obtain_matrix( &store, &patterns, pattern_type, matrix_file.as_deref() )?;
            let annotator = Annotator::new( &store, &matrix, &patterns );
            let top = annotator.strongest_context_indicators( target, k )?;
            print_pattern( &store, &patterns[ target ], pattern_type, "Input pattern" );
            for index in top {
                print_pattern( &store, &patterns[ index ], pattern_type, "Pattern" );
            }
        },
        Command::Similar { target, k, matrix_file } => {
            let matrix = obtain_matrix( &store, &patterns, pattern_type, matrix_file.as_deref() )?;
            let annotator = Annotator::new( &store, &matrix, &patterns );
            let top = annotator.semantically_similar_patterns( target, k )?;
            print_pattern( &store, &patterns[ target ], pattern_type, "Input pattern" );
            for index in top {
                print_pattern( &store, &patterns[ index ], pattern_type, "Pattern" );
            }
        },
        Command::Transactions { target, k, matrix_file } => {
            let matrix = obtain_matrix( &store, &patterns, pattern_type, matrix_file.as_deref() )?;
            let annotator = Annotator::new( &store, &matrix, &patterns );
            let top = annotator.representative_transactions( target, k )?;
            print_pattern( &store, &patterns[ target ], pattern_type, "Input pattern" );
            for paper in top {
                print_paper( &store, paper );
            }
        },
        Command::Reduce { threshold, hierarchical, output, report } => {
            let report_data = if hierarchical {
                ReductionReport::new( &AgglomerativeReducer::new( threshold ), threshold, &patterns )
            } else {
                ReductionReport::new( &OnePassReducer::new( threshold ), threshold, &patterns )
            };
            info!( "reduced {} patterns to {} representatives", report_data.pattern_count, report_data.representatives.len() );

            for pattern in &report_data.representatives {
                print_pattern( &store, pattern, pattern_type, "Representative" );
            }
            if let Some( path ) = output {
                io::write_patterns( &path, &report_data.representatives )?;
            }
            if let Some( path ) = report {
                io::write_json( &path, &report_data )?;
            }
        },
    }

    Ok( () )
}

/// Loads the matrix from the given file when it exists, computes and
/// optionally persists it otherwise.
fn obtain_matrix( store: &TransactionStore, patterns: &[Itemvec], pattern_type: PatternType, matrix_file: Option<&std::path::Path> ) -> Result<RelationMatrix> {
    let mut matrix = RelationMatrix::new( pattern_type );
    match matrix_file {
        Some( path ) if path.exists() => {
            matrix.read_from_file( path )?;
        },
        _ => {
            matrix.compute( store, patterns, None )?;
            if let Some( path ) = matrix_file {
                matrix.write_to_file( path )?;
            }
        },
    }
    matrix.log( "matrix ready", Level::INFO );
    Ok( matrix )
}

fn print_pattern( store: &TransactionStore, pattern: &[Item], pattern_type: PatternType, label: &str ) {
    let words: Vec<String> = pattern.iter()
        .map( |id| render_id( store, *id, pattern_type ))
        .collect();
    println!( "{}: {}", label, words.join( " " ));
}

fn print_paper( store: &TransactionStore, paper: usize ) {
    let authors: Vec<String> = store.paper_authors( paper ).iter()
        .map( |id| store.author_name( id ).map_or_else( || id.to_string(), |name| name.to_string() ))
        .collect();
    let title: Vec<String> = store.paper_title( paper ).iter()
        .map( |id| store.title_term( *id ).map_or_else( || id.to_string(), |term| term.to_string() ))
        .collect();
    println!( "Paper {}: {} ({})", paper, title.join( " " ), authors.join( ", " ));
}

fn render_id( store: &TransactionStore, id: Item, pattern_type: PatternType ) -> String {
    let name = match pattern_type {
        PatternType::TitleTitle => store.title_term( id ),
        _ => store.author_name( id ),
    };
    name.map_or_else( || id.to_string(), |word| word.to_string() )
}

fn prepare_logging() {
    let tracer = tracing_subscriber::fmt::fmt()
        .with_max_level( tracing_subscriber::filter::LevelFilter::INFO )
        .finish();
    tracing::subscriber::set_global_default( tracer ).expect( "no other subscriber is installed" );
}
