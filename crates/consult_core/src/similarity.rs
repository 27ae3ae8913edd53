use crate::ShingleSet;

/// Jaccard similarity of two shingle sets.
///
/// `None` means "no comparison possible" (a side is missing or empty) and is
/// distinct from `Some(0.0)`, which means "comparable, no overlap".
pub fn jaccard(a: Option<&ShingleSet>, b: Option<&ShingleSet>) -> Option<f64> {
    let (a, b) = (a?, b?);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    // Iterate the smaller set; union size follows from inclusion-exclusion.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|s| large.contains(*s)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return None;
    }
    Some(intersection as f64 / union as f64)
}
