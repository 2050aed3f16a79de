
use std::fs::File;
use std::io::{BufReader, BufRead, BufWriter, Write};
use std::path::Path;

use bit_set::BitSet;
use rustc_hash::FxHashMap;
use tracing::*;

use crate::Loggable;
use crate::data::{Count, Itemvec, PatternKind, TransactionStore};
use crate::error::{MineError, Result};

/// Additive smoothing constant for the contingency probabilities.
/// Keeps every log argument positive and stops zero-support patterns from
/// dominating the scores. Tunable; 0.01 follows the reference runs.
pub const SMOOTHING_EPSILON: f64 = 0.01;

/// Fixes which matching rule applies to each side of a pattern pair
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum PatternType {
    AuthorAuthor,
    AuthorTitle,
    TitleAuthor,
    TitleTitle,
}

impl PatternType {

    /// Integer code used in the persistence header
    pub fn code( &self ) -> usize {
        match self {
            PatternType::AuthorAuthor => 0,
            PatternType::AuthorTitle => 1,
            PatternType::TitleAuthor => 2,
            PatternType::TitleTitle => 3,
        }
    }

    pub fn from_code( code: usize ) -> Result<PatternType> {
        match code {
            0 => Ok( PatternType::AuthorAuthor ),
            1 => Ok( PatternType::AuthorTitle ),
            2 => Ok( PatternType::TitleAuthor ),
            3 => Ok( PatternType::TitleTitle ),
            _ => Err( MineError::UnknownTypeCode( code )),
        }
    }

    /// Matching rules for the primary and the secondary side of a pair
    pub fn sides( &self ) -> (PatternKind, PatternKind) {
        match self {
            PatternType::AuthorAuthor => (PatternKind::Author, PatternKind::Author),
            PatternType::AuthorTitle => (PatternKind::Author, PatternKind::Title),
            PatternType::TitleAuthor => (PatternKind::Title, PatternKind::Author),
            PatternType::TitleTitle => (PatternKind::Title, PatternKind::Title),
        }
    }

    /// Same-type pairs live in a single pattern list, so only the upper
    /// triangle is stored and lookups canonicalize the index order.
    pub fn is_symmetric( &self ) -> bool {
        matches!( self, PatternType::AuthorAuthor | PatternType::TitleTitle )
    }
}

/// Pairwise mutual information over one or two pattern lists.
/// Built once (or reloaded from a file), then queried read only.
pub struct RelationMatrix {
    pattern_type: PatternType,
    values: FxHashMap<(usize, usize), f64>,
}

impl RelationMatrix {

    pub fn new( pattern_type: PatternType ) -> RelationMatrix {
        RelationMatrix {
            pattern_type,
            values: FxHashMap::default(),
        }
    }

    pub fn pattern_type( &self ) -> PatternType {
        self.pattern_type
    }

    /// Number of cached pattern pairs
    pub fn len( &self ) -> usize {
        self.values.len()
    }

    pub fn is_empty( &self ) -> bool {
        self.values.is_empty()
    }

    /// Computes mutual information for every pattern pair.
    ///
    /// Same-type matrices iterate all pairs `i <= j` within `patterns` and
    /// reject a secondary list. Cross-type matrices require `secondary`
    /// and fill every `(i, j)` across the two lists, since the axes index
    /// different pattern universes. For `TitleAuthor` the stored key is
    /// `(author index, title index)` even though the type name reads
    /// title first; that asymmetry is part of the file format.
    pub fn compute( &mut self, store: &TransactionStore, patterns: &[Itemvec], secondary: Option<&[Itemvec]> ) -> Result<()> {
        match (self.pattern_type.is_symmetric(), &secondary) {
            (true, Some( _ )) => return Err( MineError::UnexpectedSecondary( self.pattern_type )),
            (false, None) => return Err( MineError::MissingSecondary( self.pattern_type )),
            _ => (),
        }

        let span = info_span!( "mutual_information", pattern_type = ?self.pattern_type );
        let _entered = span.enter();

        let n = store.len() as Count;
        let (primary_kind, secondary_kind) = self.pattern_type.sides();
        let primary_transactions: Vec<BitSet> = patterns.iter()
            .map( |pattern| primary_kind.matching_transactions( store, pattern ))
            .collect();

        self.values.clear();
        if let Some( secondary ) = secondary {
            let secondary_transactions: Vec<BitSet> = secondary.iter()
                .map( |pattern| secondary_kind.matching_transactions( store, pattern ))
                .collect();
            for i in 0 .. patterns.len() {
                for j in 0 .. secondary.len() {
                    let value = mutual_information( &primary_transactions[i], &secondary_transactions[j], n );
                    self.values.insert( self.cross_key( i, j ), value );
                }
            }
        } else {
            for i in 0 .. patterns.len() {
                for j in i .. patterns.len() {
                    let value = mutual_information( &primary_transactions[i], &primary_transactions[j], n );
                    self.values.insert( (i, j), value );
                }
            }
        }
        debug!( "computed {} pattern pairs", self.values.len() );
        Ok( () )
    }

    /// Cached value for a pair. Same-type lookups canonicalize to
    /// `(min, max)` first; cross-type lookups take the author index first
    /// for both `AuthorTitle` and `TitleAuthor`, as stored.
    pub fn get( &self, i: usize, j: usize ) -> Result<f64> {
        let key = if self.pattern_type.is_symmetric() {
            (i.min( j ), i.max( j ))
        } else {
            (i, j)
        };
        self.values.get( &key )
            .copied()
            .ok_or( MineError::UnknownPair { i: key.0, j: key.1 } )
    }

    /// Full relationship vector of one pattern, usable as its context
    /// model. For `TitleAuthor` the index addresses a title pattern and
    /// the vector runs over the author axis, reading the stored column.
    pub fn mi_vector( &self, index: usize, dimension: usize ) -> Result<Vec<f64>> {
        (0 .. dimension)
            .map( |other| match self.pattern_type {
                PatternType::TitleAuthor => self.get( other, index ),
                _ => self.get( index, other ),
            })
            .collect()
    }

    /// Key under which the pair (primary index, secondary index) is stored
    fn cross_key( &self, primary: usize, secondary: usize ) -> (usize, usize) {
        match self.pattern_type {
            PatternType::TitleAuthor => (secondary, primary),
            _ => (primary, secondary),
        }
    }

    /// Writes the pattern type code on the first line, then one
    /// `i j value` triple per cached entry. Values use the shortest
    /// round-trip float formatting, so a reload reproduces them exactly.
    pub fn write_to_file <P: AsRef<Path>> ( &self, path: P ) -> Result<()> {
        let path = path.as_ref();
        let file = File::create( path ).map_err( |e| MineError::from_io( path, e ))?;
        let mut writer = BufWriter::new( file );

        writeln!( writer, "{}", self.pattern_type.code() ).map_err( |e| MineError::from_io( path, e ))?;
        let mut entries: Vec<(&(usize, usize), &f64)> = self.values.iter().collect();
        entries.sort_by_key( |(pair, _)| **pair );
        for ((i, j), value) in entries {
            writeln!( writer, "{} {} {}", i, j, value ).map_err( |e| MineError::from_io( path, e ))?;
        }
        info!( "wrote {} pattern pairs to {}", self.values.len(), path.display() );
        Ok( () )
    }

    /// Repopulates the cache from a persisted matrix. Refuses files whose
    /// header does not name this matrix's pattern type, and re-asserts the
    /// canonical `i <= j` order for symmetric types.
    pub fn read_from_file <P: AsRef<Path>> ( &mut self, path: P ) -> Result<()> {
        let path = path.as_ref();
        let file = File::open( path ).map_err( |e| MineError::from_io( path, e ))?;
        let reader = BufReader::new( file );
        let mut lines = reader.lines();

        let header = lines.next()
            .ok_or_else( || parse_error( path, 1, "missing pattern type header" ))?
            .map_err( |e| MineError::from_io( path, e ))?;
        let code: usize = header.trim().parse()
            .map_err( |_| parse_error( path, 1, "header is not a pattern type code" ))?;
        let found = PatternType::from_code( code )?;
        if found != self.pattern_type {
            return Err( MineError::TypeMismatch { expected: self.pattern_type, found } );
        }

        self.values.clear();
        for (index, line) in lines.enumerate() {
            let line = line.map_err( |e| MineError::from_io( path, e ))?;
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 {
                return Err( parse_error( path, index + 2, "expected '<i> <j> <value>'" ));
            }
            let i: usize = fields[0].parse()
                .map_err( |_| parse_error( path, index + 2, "index is not a non-negative integer" ))?;
            let j: usize = fields[1].parse()
                .map_err( |_| parse_error( path, index + 2, "index is not a non-negative integer" ))?;
            let value: f64 = fields[2].parse()
                .map_err( |_| parse_error( path, index + 2, "value is not a float" ))?;

            if self.pattern_type.is_symmetric() && i > j {
                return Err( parse_error( path, index + 2, "pair stored out of canonical order" ));
            }
            self.values.insert( (i, j), value );
        }
        info!( "loaded {} pattern pairs from {}", self.values.len(), path.display() );
        Ok( () )
    }
}

impl Loggable for RelationMatrix {
    fn log( &self, message: &str, level: tracing::Level ) {
        let pattern_type = self.pattern_type;
        let pairs = self.values.len();
        if level == Level::DEBUG {
            debug!( "{message}: {pattern_type:?} matrix holding {pairs} pairs" );
        } else {
            info!( "{message}: {pattern_type:?} matrix holding {pairs} pairs" );
        }
    }
}

/// Smoothed mutual information between the transaction sets matched by two
/// patterns, over a corpus of n transactions. Sums pointwise mutual
/// information across the four cells of the presence indicator table.
pub fn mutual_information( matched_x: &BitSet, matched_y: &BitSet, n: Count ) -> f64 {
    let x_support = matched_x.len() as Count;
    let y_support = matched_y.len() as Count;
    let both = matched_x.intersection( matched_y ).count() as Count;
    let either = x_support + y_support - both;

    let p_x1_y1 = smoothed_prob( both, n );
    let p_x1_y0 = smoothed_prob( x_support - both, n );
    let p_x0_y1 = smoothed_prob( y_support - both, n );
    let p_x0_y0 = smoothed_prob( n - either, n );

    // marginals as sums of smoothed cells, so the table stays consistent
    let p_x1 = p_x1_y1 + p_x1_y0;
    let p_x0 = p_x0_y1 + p_x0_y0;
    let p_y1 = p_x1_y1 + p_x0_y1;
    let p_y0 = p_x1_y0 + p_x0_y0;

    pointwise_term( p_x1_y1, p_x1, p_y1 )
        + pointwise_term( p_x1_y0, p_x1, p_y0 )
        + pointwise_term( p_x0_y1, p_x0, p_y1 )
        + pointwise_term( p_x0_y0, p_x0, p_y0 )
}

/// Pure additive smoothing rule: (count + epsilon) / (total + 4 epsilon)
pub fn calc_smoothed_prob( count: Count, total: Count, epsilon: f64 ) -> f64 {
    (count as f64 + epsilon) / (total as f64 + 4.0 * epsilon)
}

fn smoothed_prob( count: Count, n: Count ) -> f64 {
    calc_smoothed_prob( count, n, SMOOTHING_EPSILON )
}

fn pointwise_term( joint: f64, p_left: f64, p_right: f64 ) -> f64 {
    joint * f64::log2( joint / (p_left * p_right) )
}

fn parse_error( path: &Path, line: usize, reason: &str ) -> MineError {
    MineError::Parse {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}
