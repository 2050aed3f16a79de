
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::relation::PatternType;

/// Failures surfaced by corpus loading, matrix computation and queries.
/// All of them are unrecoverable for the current run.
#[derive( Debug, Error )]
pub enum MineError {
    #[error( "failed to access {path:?}: {source}" )]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error( "malformed line {line} in {path:?}: {reason}" )]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error( "duplicate name '{name}' in mapping file {path:?}" )]
    DuplicateName { path: PathBuf, name: String },

    #[error( "name '{name}' is missing from its mapping" )]
    UnmappedName { name: String },

    #[error( "no mutual information recorded for pattern pair ({i}, {j})" )]
    UnknownPair { i: usize, j: usize },

    #[error( "matrix file declares pattern type {found:?}, expected {expected:?}" )]
    TypeMismatch {
        expected: PatternType,
        found: PatternType,
    },

    #[error( "unknown pattern type code {0}" )]
    UnknownTypeCode( usize ),

    #[error( "secondary pattern list required for {0:?}" )]
    MissingSecondary( PatternType ),

    #[error( "secondary pattern list not accepted for {0:?}" )]
    UnexpectedSecondary( PatternType ),

    #[error( "context models require a same-type matrix, got {0:?}" )]
    CrossTypeContext( PatternType ),

    #[error( "cannot select top {k} of {n} candidates" )]
    KOutOfRange { k: usize, n: usize },

    #[error( "vector lengths differ: {left} vs {right}" )]
    LengthMismatch { left: usize, right: usize },

    #[error( "cosine similarity is undefined for a zero-norm vector" )]
    DegenerateVector,
}

pub type Result<T> = std::result::Result<T, MineError>;

impl MineError {
    /// Attaches the offending path to an io error
    pub fn from_io( path: &std::path::Path, source: io::Error ) -> MineError {
        MineError::Io { path: path.to_path_buf(), source }
    }
}
