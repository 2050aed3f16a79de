
pub mod annotate;
pub mod data;
pub mod error;
pub mod io;
pub mod rank;
pub mod reduce;
pub mod relation;

pub use data::{Item, Count, Itemvec, Paper, PatternKind, TransactionStore};
pub use error::{MineError, Result};
pub use rank::{top_k, cosine_similarity};
pub use reduce::{jaccard_distance, Reduce, OnePassReducer, AgglomerativeReducer};
pub use relation::{PatternType, RelationMatrix};
pub use annotate::Annotator;

/// Objects that can be recorded in the log
pub trait Loggable {
    fn log( &self, message: &str, level: tracing::Level );
}
