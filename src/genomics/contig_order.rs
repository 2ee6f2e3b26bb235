//! Contig rank tables and the compatibility check run before matching.
//!
//! Pileup files follow the contig order of the alignment they came from,
//! which is neither lexicographic nor numeric. Each file's order is therefore
//! discovered from the file itself, and two files may only be merge-joined
//! when their orders agree on the contigs they share.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::genomics::Locus;

/// Two contig orders disagree on their shared contigs.
#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "contig order mismatch between {left_name} [{}] and {right_name} [{}]",
    .left.join(", "),
    .right.join(", ")
)]
pub struct ContigOrderMismatch {
    /// Name of the first source.
    pub left_name: String,
    /// Full contig sequence of the first source.
    pub left: Vec<String>,
    /// Name of the second source.
    pub right_name: String,
    /// Full contig sequence of the second source.
    pub right: Vec<String>,
}

/// Ordered list of distinct contig names with O(1) rank lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContigOrder {
    names: Vec<Arc<str>>,
    ranks: HashMap<Arc<str>, usize>,
}

impl ContigOrder {
    /// Create an empty order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an order from names in sequence; repeats keep their first rank.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let mut order = Self::new();
        for name in names {
            order.push(name);
        }
        order
    }

    /// Append a contig if unseen. Returns `true` when it was new.
    pub fn push(&mut self, name: impl Into<Arc<str>>) -> bool {
        let name = name.into();
        if self.ranks.contains_key(&name) {
            return false;
        }
        self.ranks.insert(Arc::clone(&name), self.names.len());
        self.names.push(name);
        true
    }

    /// Rank of a contig, if present.
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.ranks.get(name).copied()
    }

    /// Whether the contig is present.
    pub fn contains(&self, name: &str) -> bool {
        self.ranks.contains_key(name)
    }

    /// Most recently appended contig.
    pub fn last(&self) -> Option<&str> {
        self.names.last().map(|name| name.as_ref())
    }

    /// Contig names in rank order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|name| name.as_ref())
    }

    /// Number of contigs.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no contig has been seen.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Compare two loci by contig rank, then position.
    ///
    /// Returns `None` when either contig is absent from the table.
    pub fn compare(&self, left: &Locus, right: &Locus) -> Option<Ordering> {
        let left_rank = self.rank(&left.contig)?;
        let right_rank = self.rank(&right.contig)?;
        Some(
            left_rank
                .cmp(&right_rank)
                .then(left.position.cmp(&right.position)),
        )
    }

    fn restricted_to(&self, other: &ContigOrder) -> Vec<&str> {
        self.names().filter(|name| other.contains(name)).collect()
    }

    fn to_strings(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }
}

/// Check that two discovered orders are compatible and merge them.
///
/// The orders are compatible when identical, or when the contigs they share
/// appear in the same relative order. The returned table ranks every contig of
/// both inputs and agrees with each of them.
pub fn validate_contig_orders(
    left_name: &str,
    left: &ContigOrder,
    right_name: &str,
    right: &ContigOrder,
) -> Result<ContigOrder, ContigOrderMismatch> {
    if left == right {
        return Ok(left.clone());
    }

    let mismatch = || ContigOrderMismatch {
        left_name: left_name.to_string(),
        left: left.to_strings(),
        right_name: right_name.to_string(),
        right: right.to_strings(),
    };
    if left.restricted_to(right) != right.restricted_to(left) {
        return Err(mismatch());
    }

    let shared: HashSet<&str> = left.names().filter(|name| right.contains(name)).collect();
    let mut merged = ContigOrder::new();
    let mut left_names = left.names().peekable();
    let mut right_names = right.names().peekable();

    loop {
        match (left_names.peek().copied(), right_names.peek().copied()) {
            (Some(l), Some(r)) if l == r => {
                merged.push(l);
                left_names.next();
                right_names.next();
            }
            (Some(l), _) if !shared.contains(l) => {
                merged.push(l);
                left_names.next();
            }
            (_, Some(r)) if !shared.contains(r) => {
                merged.push(r);
                right_names.next();
            }
            (None, None) => break,
            _ => return Err(mismatch()),
        }
    }

    Ok(merged)
}
