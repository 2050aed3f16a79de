
use std::fs::File;
use std::io::{BufReader, BufRead};
use std::path::Path;

use bit_set::BitSet;
use rustc_hash::FxHashMap;
use tracing::*;

use crate::Loggable;
use crate::error::{MineError, Result};
use crate::io::parse_mapping;
use crate::relation;

/// Identifier of an author or a title term
pub type Item = usize;
/// Number of transactions
pub type Count = u64;
/// Pattern contents as parsed from a mined-pattern file
pub type Itemvec = Vec<Item>;

/// A single paper. Authors form a set, the title is an ordered term
/// sequence. Immutable once loaded.
#[derive( Debug, Clone )]
pub struct Paper {
    authors: BitSet,
    title: Itemvec,
}

impl Paper {

    pub fn new <A> ( authors: A, title: Itemvec ) -> Paper where A: IntoIterator<Item = Item> {
        Paper {
            authors: authors.into_iter().collect(),
            title,
        }
    }

    pub fn authors( &self ) -> &BitSet {
        &self.authors
    }

    pub fn title( &self ) -> &[Item] {
        &self.title
    }
}

/// The two pattern interpretations. A pattern carries no tag of its own;
/// the kind chosen by the caller decides which matching rule applies.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum PatternKind {
    /// unordered author itemset, matched by set inclusion
    Author,
    /// ordered title term sequence, matched as a subsequence
    Title,
}

impl PatternKind {

    /// Ids of all transactions the pattern matches under this kind's rule
    pub fn matching_transactions( &self, store: &TransactionStore, pattern: &[Item] ) -> BitSet {
        match self {
            PatternKind::Author => store.author_pattern_transactions( pattern ),
            PatternKind::Title => store.title_pattern_transactions( pattern ),
        }
    }

    /// Pattern contents with order and multiplicity dropped
    pub fn element_set( &self, pattern: &[Item] ) -> BitSet {
        pattern.iter().copied().collect()
    }
}

/// Stores the paper corpus together with its id mappings and answers
/// pattern membership queries against it. Loaded once, read only after.
pub struct TransactionStore {
    papers: Vec<Paper>,
    author_ids: FxHashMap<String, Item>,
    author_names: FxHashMap<Item, String>,
    title_term_ids: FxHashMap<String, Item>,
    title_term_names: FxHashMap<Item, String>,
}

impl TransactionStore {

    /// Parses the two id mappings and the paper corpus.
    /// Fails on unreadable files, duplicate mapping names and corpus names
    /// absent from their mapping.
    pub fn load <P: AsRef<Path>> ( papers_path: P, author_mapping_path: P, title_mapping_path: P ) -> Result<TransactionStore> {
        Self::load_first( papers_path, author_mapping_path, title_mapping_path, usize::MAX )
    }

    /// Like load, but reads at most max_papers corpus lines
    pub fn load_first <P: AsRef<Path>> ( papers_path: P, author_mapping_path: P, title_mapping_path: P, max_papers: usize ) -> Result<TransactionStore> {
        let author_ids = parse_mapping( &author_mapping_path )?;
        let title_term_ids = parse_mapping( &title_mapping_path )?;

        let path = papers_path.as_ref();
        let file = File::open( path ).map_err( |e| MineError::from_io( path, e ))?;
        let reader = BufReader::new( file );

        let mut papers = Vec::new();
        for line in reader.lines() {
            if papers.len() >= max_papers {
                break;
            }
            let line = line.map_err( |e| MineError::from_io( path, e ))?;
            if line.trim().is_empty() {
                continue;
            }
            papers.push( parse_paper( &line, &author_ids, &title_term_ids )? );
        }
        info!( "loaded {} papers from {}", papers.len(), path.display() );

        Ok( Self::with_papers( papers, author_ids, title_term_ids ))
    }

    /// Assembles a store from already parsed parts
    pub fn with_papers( papers: Vec<Paper>, author_ids: FxHashMap<String, Item>, title_term_ids: FxHashMap<String, Item> ) -> TransactionStore {
        let author_names = author_ids.iter().map( |(name, id)| (*id, name.clone()) ).collect();
        let title_term_names = title_term_ids.iter().map( |(name, id)| (*id, name.clone()) ).collect();
        TransactionStore {
            papers,
            author_ids,
            author_names,
            title_term_ids,
            title_term_names,
        }
    }

    /// Number of transactions in the corpus
    pub fn len( &self ) -> usize {
        self.papers.len()
    }

    pub fn is_empty( &self ) -> bool {
        self.papers.is_empty()
    }

    pub fn author_id( &self, name: &str ) -> Option<Item> {
        self.author_ids.get( name ).copied()
    }

    pub fn author_name( &self, id: Item ) -> Option<&str> {
        self.author_names.get( &id ).map( |name| name.as_str() )
    }

    pub fn title_term_id( &self, term: &str ) -> Option<Item> {
        self.title_term_ids.get( term ).copied()
    }

    pub fn title_term( &self, id: Item ) -> Option<&str> {
        self.title_term_names.get( &id ).map( |term| term.as_str() )
    }

    pub fn paper_authors( &self, paper: usize ) -> &BitSet {
        self.papers[ paper ].authors()
    }

    pub fn paper_title( &self, paper: usize ) -> &[Item] {
        self.papers[ paper ].title()
    }

    /// Ids of papers whose author set contains every id in the pattern.
    /// The pattern must be contained in the paper, never the reverse.
    pub fn author_pattern_transactions( &self, pattern: &[Item] ) -> BitSet {
        let mut matched = BitSet::with_capacity( self.papers.len() );
        for (index, paper) in self.papers.iter().enumerate() {
            if pattern.iter().all( |author| paper.authors.contains( *author )) {
                matched.insert( index );
            }
        }
        matched
    }

    /// Number of papers matched under the author subset rule
    pub fn author_support( &self, pattern: &[Item] ) -> Count {
        self.author_pattern_transactions( pattern ).len() as Count
    }

    /// Ids of papers whose title contains the pattern as an ordered, not
    /// necessarily contiguous subsequence.
    pub fn title_pattern_transactions( &self, pattern: &[Item] ) -> BitSet {
        let mut matched = BitSet::with_capacity( self.papers.len() );
        for (index, paper) in self.papers.iter().enumerate() {
            if is_subsequence( pattern, &paper.title ) {
                matched.insert( index );
            }
        }
        matched
    }

    /// Number of papers matched under the title subsequence rule
    pub fn title_support( &self, pattern: &[Item] ) -> Count {
        self.title_pattern_transactions( pattern ).len() as Count
    }

    /// One context model per paper: entry j relates pattern j to the
    /// pseudo pattern formed by the paper's own author set.
    pub fn author_context_models( &self, patterns: &[Itemvec] ) -> Vec<Vec<f64>> {
        let span = info_span!( "author_context_models" );
        let _entered = span.enter();
        self.context_models( patterns, PatternKind::Author )
    }

    /// One context model per paper: entry j relates pattern j to the
    /// pseudo pattern formed by the paper's own title sequence.
    pub fn title_context_models( &self, patterns: &[Itemvec] ) -> Vec<Vec<f64>> {
        let span = info_span!( "title_context_models" );
        let _entered = span.enter();
        self.context_models( patterns, PatternKind::Title )
    }

    fn context_models( &self, patterns: &[Itemvec], kind: PatternKind ) -> Vec<Vec<f64>> {
        let pattern_transactions: Vec<BitSet> = patterns.iter()
            .map( |pattern| kind.matching_transactions( self, pattern ))
            .collect();
        let n = self.len() as Count;

        self.papers.iter().map( |paper| {
            let own: Itemvec = match kind {
                PatternKind::Author => paper.authors.iter().collect(),
                PatternKind::Title => paper.title.clone(),
            };
            let own_transactions = kind.matching_transactions( self, &own );
            pattern_transactions.iter()
                .map( |matched| relation::mutual_information( matched, &own_transactions, n ))
                .collect()
        }).collect()
    }
}

impl Loggable for TransactionStore {
    fn log( &self, message: &str, level: tracing::Level ) {
        let authors = self.author_ids.len();
        let terms = self.title_term_ids.len();
        let papers = self.papers.len();
        if level == Level::DEBUG {
            debug!( "{message}: {papers} papers, {authors} authors, {terms} title terms" );
        } else {
            info!( "{message}: {papers} papers, {authors} authors, {terms} title terms" );
        }
    }
}

/// Splits a corpus line into author names and a title. Every field but the
/// last names an author, the last is the whitespace-separated title.
fn parse_paper( line: &str, author_ids: &FxHashMap<String, Item>, title_term_ids: &FxHashMap<String, Item> ) -> Result<Paper> {
    let fields: Vec<&str> = line.split( ',' ).collect();
    let (title, author_fields) = fields.split_last().expect( "split yields at least one field" );

    let mut authors = BitSet::new();
    for author in author_fields {
        let id = author_ids.get( *author )
            .ok_or_else( || MineError::UnmappedName { name: author.to_string() } )?;
        authors.insert( *id );
    }

    let mut term_ids = Itemvec::new();
    for term in title.split_whitespace() {
        let id = title_term_ids.get( term )
            .ok_or_else( || MineError::UnmappedName { name: term.to_string() } )?;
        term_ids.push( *id );
    }

    Ok( Paper { authors, title: term_ids } )
}

/// True iff pattern occurs in sequence in the same relative order,
/// allowing gaps. A single cursor pass per sequence.
fn is_subsequence( pattern: &[Item], sequence: &[Item] ) -> bool {
    let mut remaining = pattern.iter();
    let mut wanted = remaining.next();
    for element in sequence {
        match wanted {
            Some( next ) if next == element => wanted = remaining.next(),
            Some( _ ) => (),
            None => break,
        }
    }
    wanted.is_none()
}

#[cfg(test)]
mod test {

    use super::*;

    fn two_paper_store() -> TransactionStore {
        let papers = vec!(
            Paper::new( vec!( 1, 2 ), vec!( 5, 6 ) ),
            Paper::new( vec!( 2, 3 ), vec!( 6, 7 ) ),
        );
        TransactionStore::with_papers( papers, FxHashMap::default(), FxHashMap::default() )
    }

    #[test]
    fn test_author_support_subset_rule() {
        let store = two_paper_store();

        // pattern contained in both papers
        assert_eq!( store.author_support( &vec!( 2 ) ), 2 );
        // pattern contained in the first paper only
        assert_eq!( store.author_support( &vec!( 1, 2 ) ), 1 );
        // pattern contained in no paper
        assert_eq!( store.author_support( &vec!( 1, 3 ) ), 0 );
        // the empty pattern is contained everywhere
        assert_eq!( store.author_support( &vec!() ), 2 );
    }

    #[test]
    fn test_author_transaction_ids() {
        let store = two_paper_store();

        let matched = store.author_pattern_transactions( &vec!( 1, 2 ) );
        let matched: Vec<usize> = matched.iter().collect();
        assert_eq!( matched, vec!( 0 ));
    }

    #[test]
    fn test_title_subsequence_rule() {
        assert!( is_subsequence( &[6], &[5, 6, 7] ));
        assert!( is_subsequence( &[5, 7], &[5, 6, 7] ));
        assert!( is_subsequence( &[], &[5, 6, 7] ));
        // order violated
        assert!( !is_subsequence( &[6, 5], &[5, 6, 7] ));
        // longer than the title
        assert!( !is_subsequence( &[5, 6, 7, 8], &[5, 6, 7] ));
        // gaps are allowed but repeats must recur
        assert!( !is_subsequence( &[6, 6], &[5, 6, 7] ));
    }

    #[test]
    fn test_title_support() {
        let store = two_paper_store();

        assert_eq!( store.title_support( &vec!( 6 ) ), 2 );
        assert_eq!( store.title_support( &vec!( 5, 6 ) ), 1 );
        assert_eq!( store.title_support( &vec!( 6, 5 ) ), 0 );
        assert_eq!( store.title_support( &vec!( 5, 6, 7, 8 ) ), 0 );
    }

    #[test]
    fn test_pattern_kind_capabilities() {
        let store = two_paper_store();

        let by_authors = PatternKind::Author.matching_transactions( &store, &[2] );
        assert_eq!( by_authors.len(), 2 );
        let by_title = PatternKind::Title.matching_transactions( &store, &[5, 6] );
        let by_title: Vec<usize> = by_title.iter().collect();
        assert_eq!( by_title, vec!( 0 ));

        let elements = PatternKind::Title.element_set( &[6, 5, 6] );
        let elements: Vec<usize> = elements.iter().collect();
        assert_eq!( elements, vec!( 5, 6 ));
    }

    #[test]
    fn test_context_model_dimensions() {
        let papers = vec!(
            Paper::new( vec!( 1, 2 ), vec!( 5, 6 ) ),
            Paper::new( vec!( 2, 3 ), vec!( 6, 7 ) ),
            Paper::new( vec!( 4 ), vec!( 8 ) ),
        );
        let store = TransactionStore::with_papers( papers, FxHashMap::default(), FxHashMap::default() );
        let patterns = vec!( vec!( 1 ), vec!( 2 ), vec!( 4 ) );

        let models = store.author_context_models( &patterns );
        assert_eq!( models.len(), store.len() );
        assert!( models.iter().all( |model| model.len() == patterns.len() ));
        // a paper relates more strongly to its own rare authors than to
        // rare authors it avoids
        assert!( models[0][0] > models[0][2] );
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let papers_path = dir.path().join( "data.csv" );
        let authors_path = dir.path().join( "authors.txt" );
        let titles_path = dir.path().join( "titles.txt" );

        std::fs::write( &papers_path, "Ada_Lovelace,Alan_Turing,pattern mining basics\nAlan_Turing,mining sequences\n" ).unwrap();
        std::fs::write( &authors_path, "0 Ada_Lovelace\n1 Alan_Turing\n" ).unwrap();
        std::fs::write( &titles_path, "0 pattern\n1 mining\n2 basics\n3 sequences\n" ).unwrap();

        let store = TransactionStore::load( &papers_path, &authors_path, &titles_path ).unwrap();
        assert_eq!( store.len(), 2 );
        assert_eq!( store.author_id( "Alan_Turing" ), Some( 1 ));
        assert_eq!( store.author_name( 0 ), Some( "Ada_Lovelace" ));
        assert_eq!( store.title_term_id( "mining" ), Some( 1 ));
        assert_eq!( store.title_term( 3 ), Some( "sequences" ));
        assert_eq!( store.paper_title( 0 ), &[0, 1, 2] );
        assert!( store.paper_authors( 1 ).contains( 1 ));
        assert_eq!( store.author_support( &vec!( 1 ) ), 2 );
        assert_eq!( store.title_support( &vec!( 1 ) ), 2 );
    }

    #[test]
    fn test_load_limited() {
        let dir = tempfile::tempdir().unwrap();
        let papers_path = dir.path().join( "data.csv" );
        let authors_path = dir.path().join( "authors.txt" );
        let titles_path = dir.path().join( "titles.txt" );

        std::fs::write( &papers_path, "A,x\nB,y\nA,x y\n" ).unwrap();
        std::fs::write( &authors_path, "0 A\n1 B\n" ).unwrap();
        std::fs::write( &titles_path, "0 x\n1 y\n" ).unwrap();

        let store = TransactionStore::load_first( &papers_path, &authors_path, &titles_path, 2 ).unwrap();
        assert_eq!( store.len(), 2 );
    }

    #[test]
    fn test_load_rejects_unmapped_name() {
        let dir = tempfile::tempdir().unwrap();
        let papers_path = dir.path().join( "data.csv" );
        let authors_path = dir.path().join( "authors.txt" );
        let titles_path = dir.path().join( "titles.txt" );

        std::fs::write( &papers_path, "Nobody,some title\n" ).unwrap();
        std::fs::write( &authors_path, "0 Somebody\n" ).unwrap();
        std::fs::write( &titles_path, "0 some\n1 title\n" ).unwrap();

        let result = TransactionStore::load( &papers_path, &authors_path, &titles_path );
        assert!( matches!( result, Err( MineError::UnmappedName { .. } )));
    }
}
