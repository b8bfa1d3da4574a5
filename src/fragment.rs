use crate::hit_record::{AlignmentHit, Strand};
use crate::normalize::normalize_hit;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Composite ordering key shared by fragments and blocks
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentKey {
    pub seq_name: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
}

/// A cleaned, oriented local hit between the mtDNA and one assembly sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumtFragment {
    pub seq_name: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub bit_score: f64,
    pub expect: f64,
    pub length: u64,
    pub identity: u64,
    /// Position on the single-copy mtDNA; greater than `mt_end` when spanning the origin
    pub mt_start: i64,
    pub mt_end: i64,
}

impl NumtFragment {
    pub fn key(&self) -> FragmentKey {
        FragmentKey {
            seq_name: self.seq_name.clone(),
            start: self.start,
            end: self.end,
            strand: self.strand,
        }
    }

    /// Genomic length of the fragment
    pub fn span(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn spans_origin(&self) -> bool {
        self.mt_start > self.mt_end
    }
}

/// Normalise filtered hits and return the fragment set sorted by
/// (sequence name, start, end, strand). A duplicate key keeps the later hit.
pub fn build_fragment_table(hits: &[AlignmentHit], mt_len: i64, circle: bool) -> Vec<NumtFragment> {
    let mut table: BTreeMap<FragmentKey, NumtFragment> = BTreeMap::new();
    for hit in hits {
        let fragment = normalize_hit(hit, mt_len, circle);
        if let Some(previous) = table.insert(fragment.key(), fragment) {
            warn!(
                "Duplicate fragment {}:{}-{} ({}) replaced by later hit",
                previous.seq_name, previous.start, previous.end, previous.strand
            );
        }
    }
    debug!("Built {} NUMT fragments from {} hits", table.len(), hits.len());
    table.into_values().collect()
}
