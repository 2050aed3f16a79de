use std::path::Path;
use std::fs::File;
use std::io::{BufReader, BufRead, BufWriter, Write};

use rustc_hash::FxHashMap;
use tracing::*;

use crate::data::{Item, Itemvec};
use crate::error::{MineError, Result};

/// Converts a structure into a string
pub trait PrettyFormatter<T> {
    fn format_pretty( &self, object: &T ) -> String;
}

/// Parses an `<id> <name>` mapping file into a name-to-id map.
/// Every line holds exactly two fields and names may not repeat.
pub fn parse_mapping <P: AsRef<Path>> ( path: P ) -> Result<FxHashMap<String, Item>> {
    let path = path.as_ref();
    let file = File::open( path ).map_err( |e| MineError::from_io( path, e ))?;
    let reader = BufReader::new( file );

    let mut mapping = FxHashMap::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err( |e| MineError::from_io( path, e ))?;
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let id = fields.next();
        let name = fields.next();
        let (id, name) = match (id, name, fields.next()) {
            (Some( id ), Some( name ), None) => (id, name),
            _ => return Err( parse_error( path, index, "expected '<id> <name>'" )),
        };
        let id: Item = id.parse()
            .map_err( |_| parse_error( path, index, "id is not a non-negative integer" ))?;

        if mapping.insert( name.to_string(), id ).is_some() {
            return Err( MineError::DuplicateName { path: path.to_path_buf(), name: name.to_string() } );
        }
    }
    debug!( "parsed {} names from {}", mapping.len(), path.display() );
    Ok( mapping )
}

/// Parses a mined-pattern file: one pattern of space-separated integer ids
/// per line. Everything from the last '#' onward is a support comment and
/// is stripped; lines without one are taken whole, so reduced pattern
/// files written by write_patterns parse back in.
pub fn parse_patterns <P: AsRef<Path>> ( path: P ) -> Result<Vec<Itemvec>> {
    let path = path.as_ref();
    let file = File::open( path ).map_err( |e| MineError::from_io( path, e ))?;
    let reader = BufReader::new( file );

    let mut patterns = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err( |e| MineError::from_io( path, e ))?;
        let cut = line.rfind( '#' ).unwrap_or( line.len() );
        let content = line[ .. cut ].trim();
        if content.is_empty() {
            continue;
        }

        let mut pattern = Itemvec::new();
        for chunk in content.split_whitespace() {
            let item: Item = chunk.parse()
                .map_err( |_| parse_error( path, index, "pattern item is not a non-negative integer" ))?;
            pattern.push( item );
        }
        patterns.push( pattern );
    }
    info!( "parsed {} patterns from {}", patterns.len(), path.display() );
    Ok( patterns )
}

/// Writes one space-separated pattern per line
pub fn write_patterns <P: AsRef<Path>> ( path: P, patterns: &[Itemvec] ) -> Result<()> {
    let path = path.as_ref();
    let file = File::create( path ).map_err( |e| MineError::from_io( path, e ))?;
    let mut writer = BufWriter::new( file );
    for pattern in patterns {
        let line = produce_line( pattern.iter().copied(), " " );
        writeln!( writer, "{}", line ).map_err( |e| MineError::from_io( path, e ))?;
    }
    Ok( () )
}

/// Creates a single line from an iterator over items
pub fn produce_line <I: Iterator<Item = Item>> ( items: I, separator: &str ) -> String {
    let pieces: Vec<String> = items.map( |item| item.to_string() ).collect();
    pieces.join( separator )
}

/// Writes a serializable report to a file as JSON
pub fn write_json <P: AsRef<Path>, M: serde::Serialize> ( path: P, report: &M ) -> Result<()> {
    let path = path.as_ref();
    let report_string = serde_json::to_string( report )
        .map_err( |e| MineError::from_io( path, e.into() ))?;
    let mut file = File::create( path ).map_err( |e| MineError::from_io( path, e ))?;
    write!( file, "{}", report_string ).map_err( |e| MineError::from_io( path, e ))
}

fn parse_error( path: &Path, line_index: usize, reason: &str ) -> MineError {
    MineError::Parse {
        path: path.to_path_buf(),
        line: line_index + 1,
        reason: reason.to_string(),
    }
}
