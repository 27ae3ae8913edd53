use std::num::NonZeroUsize;

use consult_core::{
    cluster_records, cluster_sizes, jaccard, shingle, similarity_edges, ClusterSettings,
    CrawlState, Record, Threshold,
};
use pretty_assertions::assert_eq;

const DOC_A: &str = "the quick brown fox jumps";
const DOC_B: &str = "the quick brown fox leaps";

fn bigrams(text: &str) -> Option<consult_core::ShingleSet> {
    shingle(Some(text), NonZeroUsize::new(2).unwrap())
}

fn records(texts: &[&str]) -> Vec<Record> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| Record::new(format!("https://site/r/{i}")).with_inline_text(*text))
        .collect()
}

fn cluster_ids(records: &[Record]) -> Vec<Option<usize>> {
    records.iter().map(|r| r.cluster_id).collect()
}

#[test]
fn quick_brown_fox_scores_three_fifths() {
    let a = bigrams(DOC_A).unwrap();
    let b = bigrams(DOC_B).unwrap();
    assert_eq!(a.len(), 4);
    assert_eq!(b.len(), 4);
    let similarity = jaccard(Some(&a), Some(&b)).unwrap();
    assert!((similarity - 0.6).abs() < 1e-12);
}

#[test]
fn quick_brown_fox_clusters_depend_on_threshold() {
    let mut low = records(&[DOC_A, DOC_B]);
    cluster_records(&mut low, &ClusterSettings::new(2, 0.3).unwrap());
    assert_eq!(cluster_ids(&low), vec![Some(0), Some(0)]);

    let mut high = records(&[DOC_A, DOC_B]);
    let report = cluster_records(&mut high, &ClusterSettings::new(2, 0.7).unwrap());
    assert_eq!(cluster_ids(&high), vec![Some(0), Some(1)]);
    assert_eq!(report.singletons, 2);
    assert_eq!(report.edges, 0);
}

#[test]
fn record_without_text_is_always_a_singleton() {
    let mut set = records(&[DOC_A, "", DOC_A]);
    let report = cluster_records(&mut set, &ClusterSettings::new(2, 0.0).unwrap());

    assert_eq!(set[1].canonical_text, None);
    assert_eq!(set[1].shingles, None);
    assert_eq!(cluster_ids(&set), vec![Some(0), Some(1), Some(0)]);
    assert_eq!(report.without_text, 1);
    assert_eq!(report.clusters, 2);
    assert_eq!(jaccard(None, set[0].shingles.as_ref()), None);
}

#[test]
fn attachment_text_drives_similarity() {
    let mut set = vec![
        Record::new("a")
            .with_inline_text("see attachment")
            .with_attachment_text(DOC_A),
        Record::new("b").with_inline_text(DOC_A),
    ];
    cluster_records(&mut set, &ClusterSettings::new(2, 0.9).unwrap());
    assert_eq!(set[0].canonical_text.as_deref(), Some(DOC_A));
    assert_eq!(set[0].cluster_id, set[1].cluster_id);
}

#[test]
fn chained_similarity_merges_into_one_cluster() {
    // a~b and b~c pass the threshold, a~c does not.
    let texts = [
        "one two three four five six",
        "one two three four five seven",
        "nine two three four five seven",
    ];
    let mut set = records(&texts);
    let settings = ClusterSettings::new(2, 0.5).unwrap();
    let shingles: Vec<_> = texts.iter().map(|t| bigrams(t)).collect();
    assert_eq!(
        similarity_edges(&shingles, settings.threshold),
        vec![(0, 1), (1, 2)]
    );

    cluster_records(&mut set, &settings);
    assert_eq!(cluster_ids(&set), vec![Some(0), Some(0), Some(0)]);
}

#[test]
fn rerun_reproduces_assignment() {
    let texts = [DOC_A, "something else entirely here", DOC_B, "", DOC_A];
    let settings = ClusterSettings::new(2, 0.3).unwrap();
    let mut first = records(&texts);
    cluster_records(&mut first, &settings);
    let mut second = first.clone();
    cluster_records(&mut second, &settings);
    assert_eq!(cluster_ids(&first), cluster_ids(&second));
    assert_eq!(cluster_ids(&first), vec![Some(0), Some(1), Some(0), Some(2), Some(0)]);
}

#[test]
fn recluster_replaces_previous_assignment() {
    let mut state = CrawlState::from_records(records(&[DOC_A, DOC_B])).unwrap();
    state.recluster(&ClusterSettings::new(2, 0.3).unwrap());
    assert_eq!(cluster_ids(state.records()), vec![Some(0), Some(0)]);

    let report = state.recluster(&ClusterSettings::new(2, 0.7).unwrap());
    assert_eq!(cluster_ids(state.records()), vec![Some(0), Some(1)]);
    assert_eq!(report.clusters, 2);
}

#[test]
fn cluster_sizes_are_sorted_largest_first() {
    let mut set = records(&[DOC_A, "lonely text with words", DOC_A, DOC_A]);
    cluster_records(&mut set, &ClusterSettings::new(2, 0.3).unwrap());
    assert_eq!(cluster_sizes(&set), vec![(0, 3), (1, 1)]);
}

#[test]
fn inclusive_threshold_keeps_exact_matches() {
    let shingles = vec![bigrams(DOC_A), bigrams(DOC_B)];
    let edges = similarity_edges(&shingles, Threshold::new(0.6).unwrap());
    assert_eq!(edges, vec![(0, 1)]);
}
