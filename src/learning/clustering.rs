//! Single-pass greedy clustering.
//!
//! Records are visited in input order and each joins the cluster with the best
//! average similarity to its current members, or opens a new one. Clusters are
//! never merged and singletons are dropped at the end, so the result depends on
//! input order.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::similarity::{Fingerprint, tokenize};
use super::types::{FailureCluster, FailureRecord};
use crate::config::ClusteringConfig;

const MIN_SHARED_OCCURRENCES: usize = 2;

pub fn cluster_failures(
    failures: &[FailureRecord],
    min_similarity: f64,
    config: &ClusteringConfig,
) -> Vec<FailureCluster> {
    let fingerprints: Vec<Fingerprint> = failures.iter().map(Fingerprint::of).collect();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (index, fingerprint) in fingerprints.iter().enumerate() {
        let mut best: Option<(usize, f64)> = None;
        for (group_index, members) in groups.iter().enumerate() {
            let total: f64 = members
                .iter()
                .map(|&m| fingerprint.similarity(&fingerprints[m], config))
                .sum();
            let average = total / members.len() as f64;
            // Strict comparison keeps the earliest cluster on ties
            if best.is_none_or(|(_, score)| average > score) {
                best = Some((group_index, average));
            }
        }

        match best {
            Some((group_index, score)) if score >= min_similarity => {
                groups[group_index].push(index);
            }
            _ => groups.push(vec![index]),
        }
    }

    let clusters: Vec<FailureCluster> = groups
        .into_iter()
        .filter(|members| members.len() >= 2)
        .map(|members| build_cluster(failures, &fingerprints, &members, config))
        .collect();

    debug!(
        failures = failures.len(),
        clusters = clusters.len(),
        min_similarity,
        "Clustered failures"
    );
    clusters
}

fn build_cluster(
    failures: &[FailureRecord],
    fingerprints: &[Fingerprint],
    members: &[usize],
    config: &ClusteringConfig,
) -> FailureCluster {
    let records: Vec<FailureRecord> = members.iter().map(|&i| failures[i].clone()).collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (offset, &a) in members.iter().enumerate() {
        for &b in &members[offset + 1..] {
            total += fingerprints[a].similarity(&fingerprints[b], config);
            pairs += 1;
        }
    }
    let similarity = if pairs == 0 { 1.0 } else { total / pairs as f64 };

    FailureCluster {
        common_error_terms: common_terms(&records, config.max_common_terms),
        common_files: common_files(&records),
        similarity,
        failures: records,
    }
}

/// Terms present in at least `max(2, ceil(n/2))` members, counted once per
/// member, most frequent first. Ties keep first-seen order.
pub fn common_terms(failures: &[FailureRecord], limit: usize) -> Vec<String> {
    let threshold = MIN_SHARED_OCCURRENCES.max(failures.len().div_ceil(2));
    let counted = count_first_seen(failures.iter().flat_map(|f| tokenize(&f.error_text)));

    let mut shared: Vec<(String, usize)> = counted
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .collect();
    shared.sort_by(|a, b| b.1.cmp(&a.1));
    shared.into_iter().take(limit).map(|(term, _)| term).collect()
}

/// File paths touched by at least two members, most frequent first.
pub fn common_files(failures: &[FailureRecord]) -> Vec<String> {
    let counted = count_first_seen(failures.iter().flat_map(|f| {
        let mut seen = HashSet::new();
        f.files
            .iter()
            .filter(move |file| seen.insert(*file))
            .cloned()
    }));

    let mut shared: Vec<(String, usize)> = counted
        .into_iter()
        .filter(|(_, count)| *count >= MIN_SHARED_OCCURRENCES)
        .collect();
    shared.sort_by(|a, b| b.1.cmp(&a.1));
    shared.into_iter().map(|(file, _)| file).collect()
}

fn count_first_seen(items: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for item in items {
        match index.get(&item) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }
    counts
}
