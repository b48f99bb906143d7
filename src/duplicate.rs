//! Duplicate Detection Module
//!
//! Partitions fingerprinted images into groups of near-duplicates.
//!
//! The default [`ClusterStrategy::Star`] is a single greedy pass: the first
//! unclaimed record seeds a group and every later unclaimed record whose
//! similarity *to the seed* reaches the threshold joins it. Members are never
//! compared with each other, so A~B and A~C group {A, B, C} even when B and C
//! are far apart, and a chain A~B~C whose seed is A does not pull C in through B.
//! [`ClusterStrategy::Transitive`] instead takes connected components.

use crate::config::{ClusterStrategy, DedupConfig, SimilarityWeights, DEFAULT_THRESHOLD};
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One image as seen by the clusterer. `metadata` belongs to the caller and is never inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord<M = ()> {
    pub id: String,
    pub fingerprint: Fingerprint,
    pub metadata: M,
}

impl ImageRecord<()> {
    pub fn new(id: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self::with_metadata(id, fingerprint, ())
    }
}

impl<M> ImageRecord<M> {
    pub fn with_metadata(id: impl Into<String>, fingerprint: Fingerprint, metadata: M) -> Self {
        Self {
            id: id.into(),
            fingerprint,
            metadata,
        }
    }

    /// Source pixel count (width * height).
    pub fn resolution(&self) -> u64 {
        u64::from(self.fingerprint.width) * u64::from(self.fingerprint.height)
    }
}

/// Two or more records judged to be duplicates. The first member is the group's seed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup<M = ()> {
    members: Vec<ImageRecord<M>>,
}

impl<M> DuplicateGroup<M> {
    /// Returns `None` for fewer than two members.
    fn new(members: Vec<ImageRecord<M>>) -> Option<Self> {
        (members.len() > 1).then_some(Self { members })
    }

    pub fn seed(&self) -> &ImageRecord<M> {
        &self.members[0]
    }

    pub fn members(&self) -> &[ImageRecord<M>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept alongside `len`.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord<M>> {
        self.members.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.members.iter().map(|r| r.id.as_str()).collect()
    }

    /// The highest-resolution member; the earliest one wins ties.
    pub fn best_by_resolution(&self) -> &ImageRecord<M> {
        self.members
            .iter()
            .rev()
            .max_by_key(|r| r.resolution())
            .unwrap_or(&self.members[0])
    }

    pub fn into_records(self) -> Vec<ImageRecord<M>> {
        self.members
    }
}

impl<'a, M> IntoIterator for &'a DuplicateGroup<M> {
    type Item = &'a ImageRecord<M>;
    type IntoIter = std::slice::Iter<'a, ImageRecord<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

/// Groups records under a threshold, weights and strategy.
#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    threshold: f64,
    weights: SimilarityWeights,
    strategy: ClusterStrategy,
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl DuplicateFinder {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            weights: SimilarityWeights::default(),
            strategy: ClusterStrategy::default(),
        }
    }

    pub fn from_config(config: &DedupConfig) -> Self {
        Self {
            threshold: config.threshold,
            weights: config.weights,
            strategy: config.strategy,
        }
    }

    pub fn with_strategy(mut self, strategy: ClusterStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_weights(mut self, weights: SimilarityWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Partition `records` into duplicate groups.
    ///
    /// Output is deterministic for a given input order. Fails on the first
    /// comparison between fingerprints of different grid sizes.
    pub fn find<M: Clone>(&self, records: &[ImageRecord<M>]) -> Result<Vec<DuplicateGroup<M>>> {
        log::debug!(
            "Clustering {} records (threshold {}, {:?})",
            records.len(),
            self.threshold,
            self.strategy
        );
        let score = |a: &ImageRecord<M>, b: &ImageRecord<M>| {
            self.weights.score(&a.fingerprint, &b.fingerprint)
        };
        let groups = match self.strategy {
            ClusterStrategy::Star => star_groups(records, self.threshold, score)?,
            ClusterStrategy::Transitive => transitive_groups(records, self.threshold, score)?,
        };
        log::debug!("Found {} duplicate groups", groups.len());
        Ok(groups)
    }
}

/// Group `records` with the default weights and the star strategy.
pub fn find_duplicate_groups<M: Clone>(
    records: &[ImageRecord<M>],
    threshold: f64,
) -> Result<Vec<DuplicateGroup<M>>> {
    DuplicateFinder::new(threshold).find(records)
}

fn star_groups<M, F>(
    records: &[ImageRecord<M>],
    threshold: f64,
    score: F,
) -> Result<Vec<DuplicateGroup<M>>>
where
    M: Clone,
    F: Fn(&ImageRecord<M>, &ImageRecord<M>) -> Result<f64>,
{
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut groups = Vec::new();

    for (i, seed) in records.iter().enumerate() {
        if !claimed.insert(seed.id.as_str()) {
            continue;
        }

        let mut members = vec![seed.clone()];
        for candidate in &records[i + 1..] {
            if claimed.contains(candidate.id.as_str()) {
                continue;
            }
            if score(seed, candidate)? >= threshold {
                claimed.insert(candidate.id.as_str());
                members.push(candidate.clone());
            }
        }

        if let Some(group) = DuplicateGroup::new(members) {
            log::debug!("Group seeded by {} with {} members", seed.id, group.len());
            groups.push(group);
        }
    }

    Ok(groups)
}

fn transitive_groups<M, F>(
    records: &[ImageRecord<M>],
    threshold: f64,
    score: F,
) -> Result<Vec<DuplicateGroup<M>>>
where
    M: Clone,
    F: Fn(&ImageRecord<M>, &ImageRecord<M>) -> Result<f64>,
{
    // A repeated identifier keeps only its first occurrence, as in the star pass.
    let mut seen: HashSet<&str> = HashSet::new();
    let unique: Vec<&ImageRecord<M>> = records
        .iter()
        .filter(|r| seen.insert(r.id.as_str()))
        .collect();

    let n = unique.len();
    let mut parent: Vec<usize> = (0..n).collect();
    let mut rank: Vec<usize> = vec![0; n];

    // Find with path compression
    fn find(parent: &mut [usize], i: usize) -> usize {
        if parent[i] != i {
            parent[i] = find(parent, parent[i]);
        }
        parent[i]
    }

    // Union by rank
    fn union(parent: &mut [usize], rank: &mut [usize], i: usize, j: usize) {
        let pi = find(parent, i);
        let pj = find(parent, j);
        if pi != pj {
            if rank[pi] < rank[pj] {
                parent[pi] = pj;
            } else if rank[pi] > rank[pj] {
                parent[pj] = pi;
            } else {
                parent[pj] = pi;
                rank[pi] += 1;
            }
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if score(unique[i], unique[j])? >= threshold {
                union(&mut parent, &mut rank, i, j);
            }
        }
    }

    // Components in order of their first member, members in input order.
    let mut order: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<ImageRecord<M>>> = vec![Vec::new(); n];
    for (i, record) in unique.iter().enumerate() {
        let root = find(&mut parent, i);
        if components[root].is_empty() {
            order.push(root);
        }
        components[root].push((*record).clone());
    }

    Ok(order
        .into_iter()
        .filter_map(|root| DuplicateGroup::new(std::mem::take(&mut components[root])))
        .collect())
}
