//! Partitioned transition relations and the relational product with early
//! quantification.

use crate::bdd::BddManager;

use biodivine_lib_bdd::{Bdd, BddVariable};

use std::collections::HashSet;

/// How the transition relation is represented.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PartitionMethod {
    /// A single conjoined relation.
    Monolithic,
    /// Factors conjoined greedily until a cluster exceeds the node bound.
    Threshold(usize),
    /// Factors ordered by their quantification schedule before clustering,
    /// so variables drop out of the product as early as possible.
    Iwls95(usize),
}

impl Default for PartitionMethod {
    fn default() -> Self {
        PartitionMethod::Threshold(1000)
    }
}

/// A conjunctively partitioned transition relation.
#[derive(Clone, Debug)]
pub struct TransPartition {
    clusters: Vec<Bdd>,
    method: PartitionMethod,
}

impl TransPartition {
    /// Cluster the given relation factors.
    pub fn new(manager: &BddManager, factors: Vec<Bdd>, method: PartitionMethod) -> TransPartition {
        let factors: Vec<Bdd> = factors
            .into_iter()
            .filter(|factor| !factor.is_true())
            .collect();
        let clusters = match method {
            PartitionMethod::Monolithic => {
                let mut relation = manager.mk_true();
                for factor in &factors {
                    relation = relation.and(factor);
                }
                vec![relation]
            }
            PartitionMethod::Threshold(bound) => cluster_by_threshold(manager, factors, bound),
            PartitionMethod::Iwls95(bound) => {
                let mut ordered = factors;
                // schedule: factors whose support peaks early come first
                ordered.sort_by_key(|factor| {
                    factor
                        .support_set()
                        .iter()
                        .map(|var| var.to_index())
                        .max()
                        .unwrap_or(0)
                });
                cluster_by_threshold(manager, ordered, bound)
            }
        };
        let clusters = if clusters.is_empty() {
            vec![manager.mk_true()]
        } else {
            clusters
        };
        TransPartition { clusters, method }
    }

    pub fn method(&self) -> PartitionMethod {
        self.method
    }

    pub fn clusters(&self) -> &[Bdd] {
        &self.clusters
    }

    /// The conjunction of all clusters (used by reporting, not by images).
    pub fn monolithic(&self, manager: &BddManager) -> Bdd {
        let mut relation = manager.mk_true();
        for cluster in &self.clusters {
            relation = relation.and(cluster);
        }
        relation
    }

    /// Conjoin `set` with all clusters, existentially quantifying each
    /// variable of `quantify` as soon as no later cluster mentions it.
    pub fn relational_product(&self, set: &Bdd, quantify: &[BddVariable]) -> Bdd {
        let quantify: HashSet<BddVariable> = quantify.iter().copied().collect();
        // last cluster that mentions each quantified variable
        let mut last_use: Vec<(BddVariable, usize)> = Vec::new();
        for &var in &quantify {
            let mut last = 0;
            for (index, cluster) in self.clusters.iter().enumerate() {
                if cluster.support_set().contains(&var) {
                    last = index;
                }
            }
            last_use.push((var, last));
        }

        let mut product = set.clone();
        for (index, cluster) in self.clusters.iter().enumerate() {
            product = product.and(cluster);
            let ready: Vec<BddVariable> = last_use
                .iter()
                .filter(|&&(_, last)| last == index)
                .map(|&(var, _)| var)
                .collect();
            if !ready.is_empty() {
                product = product.exists(&ready);
            }
        }
        product
    }

    /// Merge another partition behind this one (synchronous composition).
    pub fn extend(&mut self, other: &TransPartition) {
        self.clusters.extend(other.clusters.iter().cloned());
    }
}

fn cluster_by_threshold(manager: &BddManager, factors: Vec<Bdd>, bound: usize) -> Vec<Bdd> {
    let mut clusters: Vec<Bdd> = Vec::new();
    let mut current = manager.mk_true();
    for factor in factors {
        let merged = current.and(&factor);
        if merged.size() > bound && !current.is_true() {
            clusters.push(current);
            current = factor;
        } else {
            current = merged;
        }
    }
    if !current.is_true() || clusters.is_empty() {
        clusters.push(current);
    }
    clusters
}
