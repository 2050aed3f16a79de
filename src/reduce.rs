
use bit_set::BitSet;
use serde::Serialize;
use tracing::*;

use crate::data::{Item, Itemvec};

/// Jaccard distance between two patterns with order and multiplicity
/// ignored. Title sequences are flattened to sets here on purpose; the
/// subsequence rule only governs support, not redundancy.
pub fn jaccard_distance( left: &[Item], right: &[Item] ) -> f64 {
    let left_set: BitSet = left.iter().copied().collect();
    let right_set: BitSet = right.iter().copied().collect();
    let intersection = left_set.intersection( &right_set ).count();
    let union = left_set.union( &right_set ).count();
    if union == 0 {
        // two empty patterns are identical
        return 0.0;
    }
    1.0 - intersection as f64 / union as f64
}

/// A group of pattern indices, identified by its creation order.
/// Clusters partition the pattern index range at all times.
#[derive( Debug, Clone, Serialize )]
pub struct Cluster {
    members: Vec<usize>,
}

impl Cluster {

    fn singleton( index: usize ) -> Cluster {
        Cluster { members: vec!( index ) }
    }

    pub fn members( &self ) -> &[usize] {
        &self.members
    }

    pub fn len( &self ) -> usize {
        self.members.len()
    }

    pub fn is_empty( &self ) -> bool {
        self.members.is_empty()
    }
}

/// Collapses a raw pattern list into clusters of near duplicates under a
/// Jaccard distance threshold, then picks one representative per cluster.
pub trait Reduce {

    /// Groups all pattern indices into clusters. Every index lands in
    /// exactly one cluster.
    fn cluster( &self, patterns: &[Itemvec] ) -> Vec<Cluster>;

    /// Returns the medoid pattern of every cluster in creation order
    fn reduce( &self, patterns: &[Itemvec] ) -> Vec<Itemvec> {
        self.cluster( patterns ).iter()
            .map( |cluster| patterns[ select_medoid( cluster, patterns ) ].clone() )
            .collect()
    }
}

/// Single-pass microclustering. Each pattern joins the existing cluster
/// with the smallest complete-linkage distance when that distance stays
/// below the threshold, and opens a new cluster otherwise.
pub struct OnePassReducer {
    threshold: f64,
}

impl OnePassReducer {

    pub fn new( threshold: f64 ) -> OnePassReducer {
        OnePassReducer { threshold }
    }
}

impl Reduce for OnePassReducer {

    fn cluster( &self, patterns: &[Itemvec] ) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = Vec::new();
        for (index, pattern) in patterns.iter().enumerate() {
            let closest = clusters.iter()
                .enumerate()
                .map( |(cluster_index, cluster)| (cluster_index, linkage_to_pattern( pattern, cluster, patterns )))
                .min_by( |(_, left), (_, right)| left.total_cmp( right ));

            match closest {
                Some( (cluster_index, distance) ) if distance < self.threshold => {
                    clusters[ cluster_index ].members.push( index );
                },
                _ => clusters.push( Cluster::singleton( index )),
            }
        }
        debug!( "one-pass pass over {} patterns yielded {} clusters", patterns.len(), clusters.len() );
        clusters
    }
}

/// Agglomerative complete-linkage microclustering. Starts from singleton
/// clusters and keeps merging the closest pair while its linkage stays
/// below the threshold. The surviving cluster keeps the earlier creation
/// id, so representatives still come out in creation order.
pub struct AgglomerativeReducer {
    threshold: f64,
}

impl AgglomerativeReducer {

    pub fn new( threshold: f64 ) -> AgglomerativeReducer {
        AgglomerativeReducer { threshold }
    }
}

impl Reduce for AgglomerativeReducer {

    fn cluster( &self, patterns: &[Itemvec] ) -> Vec<Cluster> {
        let distances = pairwise_distances( patterns );
        let mut clusters: Vec<Cluster> = (0 .. patterns.len())
            .map( Cluster::singleton )
            .collect();

        while clusters.len() > 1 {
            let mut best: Option<(usize, usize, f64)> = None;
            for i in 0 .. clusters.len() {
                for j in i + 1 .. clusters.len() {
                    let linkage = complete_linkage( &clusters[i], &clusters[j], &distances );
                    let better = match best {
                        None => true,
                        Some( (_, _, current) ) => linkage < current,
                    };
                    if better {
                        best = Some( (i, j, linkage) );
                    }
                }
            }

            match best {
                Some( (i, j, linkage) ) if linkage < self.threshold => {
                    let absorbed = clusters.remove( j );
                    clusters[i].members.extend( absorbed.members );
                    debug!( "merged cluster {j} into {i} at linkage {linkage:.3}" );
                },
                _ => break,
            }
        }
        clusters
    }
}

/// Complete-linkage distance from a single pattern to a cluster: the
/// maximum Jaccard distance to any member.
fn linkage_to_pattern( pattern: &[Item], cluster: &Cluster, patterns: &[Itemvec] ) -> f64 {
    cluster.members.iter()
        .map( |member| jaccard_distance( pattern, &patterns[ *member ] ))
        .fold( 0.0, f64::max )
}

/// Complete-linkage distance between two clusters: the maximum pairwise
/// distance over all cross-cluster member pairs.
fn complete_linkage( left: &Cluster, right: &Cluster, distances: &[Vec<f64>] ) -> f64 {
    let mut linkage = 0.0;
    for a in &left.members {
        for b in &right.members {
            linkage = f64::max( linkage, distances[ *a ][ *b ] );
        }
    }
    linkage
}

fn pairwise_distances( patterns: &[Itemvec] ) -> Vec<Vec<f64>> {
    let mut distances = vec!( vec!( 0.0; patterns.len() ); patterns.len() );
    for i in 0 .. patterns.len() {
        for j in i + 1 .. patterns.len() {
            let distance = jaccard_distance( &patterns[i], &patterns[j] );
            distances[i][j] = distance;
            distances[j][i] = distance;
        }
    }
    distances
}

/// Cluster member with the smallest average Jaccard distance to the other
/// members. Ties go to the lowest pattern index. The cluster must not be
/// empty.
pub fn select_medoid( cluster: &Cluster, patterns: &[Itemvec] ) -> usize {
    let average_distance = |member: usize| {
        if cluster.members.len() < 2 {
            return 0.0;
        }
        let total: f64 = cluster.members.iter()
            .filter( |other| **other != member )
            .map( |other| jaccard_distance( &patterns[ member ], &patterns[ *other ] ))
            .sum();
        total / (cluster.members.len() - 1) as f64
    };

    let mut best_member = usize::MAX;
    let mut best_average = f64::INFINITY;
    for member in &cluster.members {
        let average = average_distance( *member );
        if average < best_average || (average == best_average && *member < best_member) {
            best_average = average;
            best_member = *member;
        }
    }
    best_member
}

/// Outcome of one reduction run, serializable for reporting
#[derive( Debug, Serialize )]
pub struct ReductionReport {
    pub threshold: f64,
    pub pattern_count: usize,
    pub clusters: Vec<Cluster>,
    pub representatives: Vec<Itemvec>,
}

impl ReductionReport {

    pub fn new <R: Reduce> ( reducer: &R, threshold: f64, patterns: &[Itemvec] ) -> ReductionReport {
        let clusters = reducer.cluster( patterns );
        let representatives = clusters.iter()
            .map( |cluster| patterns[ select_medoid( cluster, patterns ) ].clone() )
            .collect();
        ReductionReport {
            threshold,
            pattern_count: patterns.len(),
            clusters,
            representatives,
        }
    }
}
