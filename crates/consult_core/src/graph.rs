use rayon::prelude::*;

use crate::config::Threshold;
use crate::similarity::jaccard;
use crate::ShingleSet;

/// Undirected edge between two record indices, always stored as `(i, j)` with `i < j`.
pub type Edge = (usize, usize);

/// Every unordered pair whose similarity is defined and reaches `threshold`.
///
/// The scan is quadratic in the number of records. Rows are scored in parallel,
/// and the collected edges keep `(i, j)` lexicographic order, so the output is
/// identical across runs.
pub fn similarity_edges(shingles: &[Option<ShingleSet>], threshold: Threshold) -> Vec<Edge> {
    let n = shingles.len();
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let left = shingles[i].as_ref();
            (i + 1..n).filter_map(move |j| {
                jaccard(left, shingles[j].as_ref())
                    .filter(|similarity| threshold.passes(*similarity))
                    .map(|_| (i, j))
            })
        })
        .collect()
}
