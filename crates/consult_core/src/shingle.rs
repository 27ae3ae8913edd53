use std::collections::HashSet;
use std::num::NonZeroUsize;

/// Contiguous run of `n` whitespace-separated tokens.
pub type Shingle = Vec<String>;
pub type ShingleSet = HashSet<Shingle>;

/// All token n-grams of `text` (window stride 1).
///
/// Returns `None` when there is no signal: absent or empty text, or fewer than
/// `n` tokens.
pub fn shingle(text: Option<&str>, n: NonZeroUsize) -> Option<ShingleSet> {
    let tokens: Vec<&str> = text?.split_whitespace().collect();
    let n = n.get();
    if tokens.len() < n {
        return None;
    }
    let set: ShingleSet = tokens
        .windows(n)
        .map(|window| window.iter().map(|t| (*t).to_string()).collect())
        .collect();
    Some(set)
}
