use std::collections::{BTreeMap, VecDeque};

use crate::config::ClusterSettings;
use crate::graph::{similarity_edges, Edge};
use crate::normalize::canonical_text;
use crate::shingle::shingle;
use crate::{ClusterId, Record};

/// Connected components of an undirected graph over `node_count` nodes.
///
/// Ids are handed out from 0 in the order components are discovered while
/// walking node indices `0..node_count`; isolated nodes become singletons.
pub fn connected_components(node_count: usize, edges: &[Edge]) -> Vec<ClusterId> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(a, b) in edges {
        adjacency[a].push(b);
        adjacency[b].push(a);
    }

    let mut assigned: Vec<Option<ClusterId>> = vec![None; node_count];
    let mut next_id: ClusterId = 0;
    let mut queue = VecDeque::new();
    for start in 0..node_count {
        if assigned[start].is_some() {
            continue;
        }
        assigned[start] = Some(next_id);
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            for &neighbour in &adjacency[node] {
                if assigned[neighbour].is_none() {
                    assigned[neighbour] = Some(next_id);
                    queue.push_back(neighbour);
                }
            }
        }
        next_id += 1;
    }

    assigned
        .into_iter()
        .map(|id| id.unwrap_or_default())
        .collect()
}

/// Outcome of one clustering pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterReport {
    pub records: usize,
    pub edges: usize,
    pub clusters: usize,
    pub singletons: usize,
    /// Records whose canonical text produced no shingles.
    pub without_text: usize,
    pub largest: usize,
}

/// Fills `canonical_text` on every record without clustering.
pub fn normalize_records(records: &mut [Record]) {
    for record in records.iter_mut() {
        record.clear_derived();
        record.canonical_text = canonical_text(record).map(str::to_owned);
    }
}

/// Runs normalize -> shingle -> similarity graph -> components over the whole
/// record set and writes the derived values back onto the records.
pub fn cluster_records(records: &mut [Record], settings: &ClusterSettings) -> ClusterReport {
    normalize_records(records);
    for record in records.iter_mut() {
        record.shingles = shingle(record.canonical_text.as_deref(), settings.shingle_size);
    }

    let shingles: Vec<_> = records.iter_mut().map(|r| r.shingles.take()).collect();
    let edges = similarity_edges(&shingles, settings.threshold);
    let ids = connected_components(records.len(), &edges);

    for ((record, set), id) in records.iter_mut().zip(shingles).zip(&ids) {
        record.shingles = set;
        record.cluster_id = Some(*id);
    }

    summarize(records, &ids, edges.len())
}

fn summarize(records: &[Record], ids: &[ClusterId], edges: usize) -> ClusterReport {
    let mut sizes: BTreeMap<ClusterId, usize> = BTreeMap::new();
    for id in ids {
        *sizes.entry(*id).or_default() += 1;
    }
    ClusterReport {
        records: records.len(),
        edges,
        clusters: sizes.len(),
        singletons: sizes.values().filter(|size| **size == 1).count(),
        without_text: records.iter().filter(|r| r.shingles.is_none()).count(),
        largest: sizes.values().copied().max().unwrap_or(0),
    }
}

/// Cluster sizes in descending order, ties broken by cluster id.
pub fn cluster_sizes(records: &[Record]) -> Vec<(ClusterId, usize)> {
    let mut sizes: BTreeMap<ClusterId, usize> = BTreeMap::new();
    for id in records.iter().filter_map(|r| r.cluster_id) {
        *sizes.entry(id).or_default() += 1;
    }
    let mut sizes: Vec<_> = sizes.into_iter().collect();
    sizes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    sizes
}
